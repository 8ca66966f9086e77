//! 画像とイベントの対応表
//!
//! 画像フォルダ内の `.image-event-mapping.json` に保存する。
//! 各エントリは `pending → renamed → uploaded → completed` の順にだけ進む。

use crate::error::{CuratorError, Result};
use crate::records::write_atomic;
use chrono::{DateTime, Utc};
use event_curator_common::EventRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MAPPING_FILE_NAME: &str = ".image-event-mapping.json";

/// 処理状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Pending,
    Renamed,
    Uploaded,
    Completed,
}

impl MappingStatus {
    /// 次の状態（completedはNone）
    pub fn next(self) -> Option<Self> {
        match self {
            MappingStatus::Pending => Some(MappingStatus::Renamed),
            MappingStatus::Renamed => Some(MappingStatus::Uploaded),
            MappingStatus::Uploaded => Some(MappingStatus::Completed),
            MappingStatus::Completed => None,
        }
    }

    /// 1段階だけ進める。それ以外の遷移はエラー
    pub fn advance(self, to: Self) -> Result<Self> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(CuratorError::InvalidTransition(format!("{} → {}", self, to)))
        }
    }
}

impl std::fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MappingStatus::Pending => "pending",
            MappingStatus::Renamed => "renamed",
            MappingStatus::Uploaded => "uploaded",
            MappingStatus::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// 検出時のファイル名
    pub original_name: String,
    /// 現在のファイル名
    pub current_name: String,
    /// リネーム後のファイル名
    pub target_name: String,
    pub event_id: String,
    pub event_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    pub score: u8,
    pub status: MappingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MappingEntry {
    pub fn new(original_name: &str, target_name: String, record: &EventRecord, score: u8) -> Self {
        let now = Utc::now();
        Self {
            original_name: original_name.to_string(),
            current_name: original_name.to_string(),
            target_name,
            event_id: record.id.clone(),
            event_title: record.title.clone(),
            event_date: record.date.clone(),
            score,
            status: MappingStatus::Pending,
            image_url: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn advance(&mut self, to: MappingStatus) -> Result<()> {
        self.status = self.status.advance(to)?;
        self.last_error = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 失敗を記録（状態はそのまま）
    pub fn record_error(&mut self, error: impl ToString) {
        self.last_error = Some(error.to_string());
        self.updated_at = Utc::now();
    }
}

/// 対応表ファイル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingFile {
    /// バージョン（互換性チェック用）
    version: u32,
    pub entries: Vec<MappingEntry>,
}

impl Default for MappingFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: Vec::new(),
        }
    }
}

impl MappingFile {
    const CURRENT_VERSION: u32 = 1;

    pub fn path(folder: &Path) -> PathBuf {
        folder.join(MAPPING_FILE_NAME)
    }

    /// 読み込み（なければ空）
    ///
    /// 進捗を失わないよう、壊れたファイルやバージョン違いは作り直さずエラーにする。
    pub fn load(folder: &Path) -> Result<Self> {
        let path = Self::path(folder);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let mapping: MappingFile = serde_json::from_str(&content)?;
        if mapping.version != Self::CURRENT_VERSION {
            return Err(CuratorError::MappingVersion {
                found: mapping.version,
                expected: Self::CURRENT_VERSION,
            });
        }
        Ok(mapping)
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&Self::path(folder), json.as_bytes())
    }

    /// 元のファイル名・現在のファイル名のどちらかで登録済みか
    pub fn contains_file(&self, file_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.original_name == file_name || e.current_name == file_name)
    }

    pub fn insert(&mut self, entry: MappingEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 状態ごとの件数（pending, renamed, uploaded, completed）
    pub fn counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for entry in &self.entries {
            counts[entry.status as usize] += 1;
        }
        counts
    }
}
