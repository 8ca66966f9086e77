use super::{RecordFilter, RecordSource};
use crate::error::{CuratorError, Result};
use async_trait::async_trait;
use event_curator_common::EventRecord;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// ローカルJSONファイル（レコードの配列）
///
/// 更新時は未知のカラムも保持したまま書き戻す。
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 全レコードを読み込み
    pub fn load(&self) -> Result<Vec<EventRecord>> {
        let content = self.read()?;
        Ok(serde_json::from_str(&content)?)
    }

    fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(CuratorError::FileNotFound(self.path.display().to_string()));
        }
        Ok(std::fs::read_to_string(&self.path)?)
    }

    fn update_url(&self, id: &str, url: &str) -> Result<()> {
        let mut rows: Vec<Value> = serde_json::from_str(&self.read()?)?;

        let row = rows
            .iter_mut()
            .find(|row| row.get("id").map(|v| id_matches(v, id)).unwrap_or(false))
            .ok_or_else(|| CuratorError::Records(format!("IDが見つかりません: {}", id)))?;

        if let Value::Object(map) = row {
            map.insert("illustration_url".into(), Value::String(url.to_string()));
        }

        write_atomic(&self.path, serde_json::to_string_pretty(&rows)?.as_bytes())
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn list_candidates(&self, filter: &RecordFilter) -> Result<Vec<EventRecord>> {
        Ok(filter.apply(self.load()?))
    }

    async fn set_illustration_url(&self, id: &str, url: &str) -> Result<()> {
        self.update_url(id, url)
    }
}

fn id_matches(value: &Value, id: &str) -> bool {
    match value {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}

/// 一時ファイルに書いてからリネーム（途中終了で壊れない）
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "records.json".into());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ROWS: &str = r#"[
        {"id": 1, "titre": "Bataille d'Hastings", "mots_cles": ["Hastings"], "illustration_url": "attente", "source": "manuel"},
        {"id": "b2", "titre": "Prise de la Bastille", "illustration_url": "https://cdn/bastille.jpg"}
    ]"#;

    #[tokio::test]
    async fn test_list_candidates_with_filter() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(&path, ROWS).unwrap();
        let source = JsonFileSource::new(&path);

        let all = source.list_candidates(&RecordFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "1");
        assert_eq!(all[0].title, "Bataille d'Hastings");

        let pending = source.list_candidates(&RecordFilter::pending()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "1");
    }

    #[tokio::test]
    async fn test_set_illustration_url_preserves_columns() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(&path, ROWS).unwrap();
        let source = JsonFileSource::new(&path);

        source.set_illustration_url("1", "https://cdn/hastings.jpg").await.unwrap();

        let rows: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rows[0]["illustration_url"], "https://cdn/hastings.jpg");
        assert_eq!(rows[0]["source"], "manuel");
        assert_eq!(rows[0]["titre"], "Bataille d'Hastings");
        assert!(!dir.path().join(".events.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_set_illustration_url_unknown_id() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("events.json");
        std::fs::write(&path, ROWS).unwrap();

        let result = JsonFileSource::new(&path).set_illustration_url("zzz", "u").await;
        assert!(matches!(result, Err(CuratorError::Records(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = JsonFileSource::new("/nonexistent/events.json").load();
        assert!(matches!(result, Err(CuratorError::FileNotFound(_))));
    }
}
