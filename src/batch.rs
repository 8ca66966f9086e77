//! 画像生成用のバッチファイル作成
//!
//! レコードを年順に並べ、N件ずつ `batch_XX.json` に書き出す。

use crate::error::{CuratorError, Result};
use event_curator_common::{parse_year, EventRecord};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

lazy_static! {
    static ref BATCH_FILE_RE: Regex = Regex::new(r"^batch_(\d+)\.json$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    pub batch_number: u32,
    pub events: Vec<EventRecord>,
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CuratorError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub fn batch_file_name(batch_number: u32) -> String {
    format!("batch_{:02}.json", batch_number)
}

/// 年の昇順に並べる（年が読めないものは先頭、同じ年は元の順）
pub fn sort_by_year(records: &mut [EventRecord]) {
    records.sort_by_key(|r| r.date.as_deref().and_then(parse_year).unwrap_or(i32::MIN));
}

/// batch_sizeずつに分割（番号は1から）
pub fn split_batches(records: Vec<EventRecord>, batch_size: usize) -> Vec<BatchFile> {
    let batch_size = batch_size.max(1);
    records
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| BatchFile {
            batch_number: i as u32 + 1,
            events: chunk.to_vec(),
        })
        .collect()
}

/// 並べ替え・分割して出力し、書き出したファイルを返す
pub fn write_batches(mut records: Vec<EventRecord>, batch_size: usize, output_dir: &Path) -> Result<Vec<PathBuf>> {
    sort_by_year(&mut records);
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    for batch in split_batches(records, batch_size) {
        let path = output_dir.join(batch_file_name(batch.batch_number));
        std::fs::write(&path, serde_json::to_string_pretty(&batch)?)?;
        tracing::debug!(path = %path.display(), events = batch.events.len(), "バッチ出力");
        written.push(path);
    }
    Ok(written)
}

/// `batch_XX.json` を番号順に列挙
pub fn list_batch_files(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    if !dir.is_dir() {
        return Err(CuratorError::FolderNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(caps) = BATCH_FILE_RE.captures(&name) else {
            continue;
        };
        if let Ok(number) = caps[1].parse::<u32>() {
            files.push((number, entry.path()));
        }
    }
    files.sort_by_key(|(n, _)| *n);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(id: &str, date: Option<&str>) -> EventRecord {
        EventRecord {
            date: date.map(String::from),
            ..EventRecord::new(id, format!("event {}", id))
        }
    }

    #[test]
    fn test_sort_by_year() {
        let mut records = vec![
            dated("a", Some("1789-07-14")),
            dated("b", Some("-0044-03-15")),
            dated("c", None),
            dated("d", Some("1066")),
            dated("e", Some("inconnue")),
        ];
        sort_by_year(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "e", "b", "d", "a"]);
    }

    #[test]
    fn test_split_batches() {
        let records: Vec<EventRecord> = (0..7).map(|i| dated(&i.to_string(), None)).collect();
        let batches = split_batches(records, 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].batch_number, 1);
        assert_eq!(batches[2].events.len(), 1);
    }

    #[test]
    fn test_batch_file_name() {
        assert_eq!(batch_file_name(3), "batch_03.json");
        assert_eq!(batch_file_name(120), "batch_120.json");
    }
}
