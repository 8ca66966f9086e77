//! イベントレコードの取得・更新
//!
//! - `JsonFileSource`: ローカルJSON（レコード配列）
//! - `RestSource`: PostgREST形式のテーブルAPI

mod json_file;
mod rest;

pub use json_file::JsonFileSource;
pub(crate) use json_file::write_atomic;
pub use rest::RestSource;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use event_curator_common::EventRecord;
use std::time::Duration;

/// イラスト未設定を表すプレースホルダ
pub const PENDING_PLACEHOLDER: &str = "attente";

/// 候補の絞り込み条件
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordFilter {
    /// イラスト未設定のレコードのみ
    pub pending_illustration_only: bool,
    /// キーワードを持つレコードのみ
    pub require_keywords: bool,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pending() -> Self {
        Self {
            pending_illustration_only: true,
            require_keywords: false,
        }
    }

    pub fn with_keywords(mut self) -> Self {
        self.require_keywords = true;
        self
    }

    pub fn accepts(&self, record: &EventRecord) -> bool {
        if self.pending_illustration_only && !is_pending_illustration(record) {
            return false;
        }
        if self.require_keywords && record.all_keywords().all(|k| k.trim().is_empty()) {
            return false;
        }
        true
    }

    pub fn apply(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        records.into_iter().filter(|r| self.accepts(r)).collect()
    }
}

/// イラストURLが未設定・空・プレースホルダのいずれか
pub fn is_pending_illustration(record: &EventRecord) -> bool {
    match record.illustration_url.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(url) => url.eq_ignore_ascii_case(PENDING_PLACEHOLDER),
    }
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list_candidates(&self, filter: &RecordFilter) -> Result<Vec<EventRecord>>;

    async fn set_illustration_url(&self, id: &str, url: &str) -> Result<()>;
}

/// 設定に応じたレコードソースを開く
///
/// `record_file` があればローカルJSON、なければREST API（要 SUPABASE_KEY）。
pub fn open_source(config: &Config) -> Result<Box<dyn RecordSource>> {
    if let Some(path) = &config.record_file {
        tracing::debug!(path = %path.display(), "ローカルJSONからレコードを読み込み");
        return Ok(Box::new(JsonFileSource::new(path)));
    }

    let source = RestSource::new(
        &config.storage_url()?,
        &config.records_table,
        config.supabase_key()?,
        Duration::from_secs(config.timeout_seconds),
    )?;
    Ok(Box::new(source))
}
