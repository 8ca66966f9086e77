use thiserror::Error;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("環境変数 {0} が設定されていません。.env または環境変数で指定してください")]
    MissingSecret(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("画像処理エラー: {0}")]
    Image(#[from] image::ImageError),

    #[error("レコード取得エラー: {0}")]
    Records(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("再試行の上限に達しました: {0}")]
    RetryExhausted(String),

    #[error("{0} は既に存在します")]
    FileExists(String),

    #[error("対応表のバージョンが異なります: {found} (期待値 {expected})")]
    MappingVersion { found: u32, expected: u32 },

    #[error("状態遷移エラー: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Match(#[from] event_curator_common::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("入力エラー: {0}")]
    Prompt(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
