use crate::error::{CuratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// ストレージのAPIキー（環境変数のみ）
pub const SUPABASE_KEY_VAR: &str = "SUPABASE_KEY";
/// ストレージURLの上書き
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
/// 画像生成APIキー（環境変数のみ）
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// ツール設定
///
/// APIキーなどの秘密情報はここに保存しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_url: Option<String>,
    pub bucket: String,
    pub records_table: String,
    /// 指定時はREST APIではなくローカルJSONからレコードを読む
    pub record_file: Option<PathBuf>,

    pub auto_threshold: u8,    // 無人照合（rename events）
    pub confirm_threshold: u8, // 確認付き照合（link）
    pub process_threshold: u8, // マッピング処理（process）

    pub compression_quality: u8,
    pub max_image_size: u32,

    pub image_model: String,
    pub image_size: String,
    pub requests_per_minute: usize,
    pub retry_delays: Vec<u64>,
    pub batch_size: usize,
    pub batch_pause_seconds: u64,

    pub validation_threshold: u8,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_url: None,
            bucket: "evenements-image".into(),
            records_table: "evenements".into(),
            record_file: None,
            auto_threshold: 60,
            confirm_threshold: 20,
            process_threshold: 50,
            compression_quality: 85,
            max_image_size: 1200,
            image_model: "dall-e-3".into(),
            image_size: "1024x1024".into(),
            requests_per_minute: 5,
            retry_delays: vec![1, 2, 4, 8, 16],
            batch_size: 25,
            batch_pause_seconds: 30,
            validation_threshold: 70,
            timeout_seconds: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから読み込み（存在しなければ既定値）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CuratorError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("event-curator").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("auto_threshold", self.auto_threshold),
            ("confirm_threshold", self.confirm_threshold),
            ("process_threshold", self.process_threshold),
            ("validation_threshold", self.validation_threshold),
        ] {
            if value > 100 {
                return Err(CuratorError::Config(format!("{}は0-100で指定してください: {}", name, value)));
            }
        }
        if !(1..=100).contains(&self.compression_quality) {
            return Err(CuratorError::Config(format!(
                "compression_qualityは1-100で指定してください: {}",
                self.compression_quality
            )));
        }
        if self.max_image_size == 0 || self.batch_size == 0 || self.requests_per_minute == 0 {
            return Err(CuratorError::Config(
                "max_image_size / batch_size / requests_per_minute は1以上で指定してください".into(),
            ));
        }
        Ok(())
    }

    /// ストレージURL（環境変数を優先）
    pub fn storage_url(&self) -> Result<String> {
        if let Ok(url) = std::env::var(SUPABASE_URL_VAR) {
            if !url.trim().is_empty() {
                return Ok(url.trim_end_matches('/').to_string());
            }
        }

        self.storage_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                CuratorError::Config(
                    "ストレージURLが未設定です。`event-curator config --set-storage-url URL` で設定してください".into(),
                )
            })
    }

    pub fn supabase_key(&self) -> Result<String> {
        secret(SUPABASE_KEY_VAR)
    }

    pub fn openai_key(&self) -> Result<String> {
        secret(OPENAI_KEY_VAR)
    }
}

/// 環境変数から秘密情報を取得
pub fn secret(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CuratorError::MissingSecret(name.to_string()))
}
