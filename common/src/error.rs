//! エラー型定義

use thiserror::Error;

/// 共通エラー型
///
/// 照合コアが返すエラーは設定ミス（`Config`）のみ。
/// 「該当なし」はエラーではなく `MatchResult` の値として返す。
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
