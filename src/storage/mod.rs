//! オブジェクトストレージ
//!
//! 画像バイト列をキー付きで保存し、公開URLを返す。
//! - `SupabaseStore`: Supabase Storage（HTTP）
//! - `LocalStore`: ローカルディレクトリ（ドライラン・テスト用）

mod local;
mod supabase;

pub use local::LocalStore;
pub use supabase::{parse_base_url, SupabaseStore};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("ストレージ通信エラー: {0}")]
    Network(String),

    #[error("ストレージ認証エラー: {0}")]
    Auth(String),

    #[error("ストレージがアップロードを拒否しました ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("ストレージIOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// HTTPステータスから分類
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => StorageError::Auth(body),
            _ => StorageError::Rejected { status, body },
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 保存して公開URLを返す。同じキーは上書き
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<String, StorageError>;
}

/// 拡張子からContent-Type
pub fn content_type_for(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("JPG"), "image/jpeg");
        assert_eq!(content_type_for("webp"), "image/webp");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(StorageError::from_status(401, String::new()), StorageError::Auth(_)));
        assert!(matches!(StorageError::from_status(403, String::new()), StorageError::Auth(_)));
        assert!(matches!(
            StorageError::from_status(409, "Duplicate".into()),
            StorageError::Rejected { status: 409, .. }
        ));
    }
}
