//! ファイル名の整理
//!
//! - clean: `<正規化した名前>_<内容ID8桁>.<拡張子>`（再実行しても同じ名前）
//! - events: 照合したイベントの `<日付>_<タイトル>.<拡張子>`

use crate::error::Result;
use crate::export::ReportRow;
use crate::scanner::{self, ImageInfo};
use event_curator_common::{canonicalize, normalize_query, EventMatcher, EventRecord, MatchResult};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// ファイル名の最大長（拡張子込み）
pub const MAX_FILE_NAME_LEN: usize = 100;

const CONTENT_ID_LEN: usize = 8;

/// リネーム1件
#[derive(Debug, Clone, PartialEq)]
pub struct RenameEntry {
    pub from: String,
    pub to: String,
}

/// リネーム結果の集計
#[derive(Debug, Default)]
pub struct RenameSummary {
    pub renamed: Vec<RenameEntry>,
    pub skipped: Vec<String>,
    pub errors: Vec<(String, String)>,
    /// 照合を伴う場合のレポート行
    pub rows: Vec<ReportRow>,
}

impl RenameSummary {
    pub fn print(&self, dry_run: bool) {
        let verb = if dry_run { "変更予定" } else { "変更" };
        for entry in &self.renamed {
            println!("  {} → {}", entry.from, entry.to);
        }
        for (file, reason) in &self.errors {
            println!("  ✗ {}: {}", file, reason);
        }
        println!(
            "✔ {}: {}件 / スキップ: {}件 / エラー: {}件",
            verb,
            self.renamed.len(),
            self.skipped.len(),
            self.errors.len()
        );
    }
}

/// ファイル内容のSHA-256先頭8桁
pub fn content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..CONTENT_ID_LEN].to_string()
}

/// 拡張子（小文字、ドット付き）
fn dotted_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// 整理後のファイル名
pub fn clean_file_name(file_name: &str, content_id: &str) -> String {
    let ext = dotted_extension(file_name);
    let normalized = normalize_query(file_name);
    let suffix = format!("_{}", content_id);
    let mut stem = normalized
        .strip_suffix(&suffix)
        .unwrap_or(&normalized)
        .to_string();
    if stem.is_empty() {
        stem = "image".into();
    }

    let max_stem = MAX_FILE_NAME_LEN.saturating_sub(suffix.len() + ext.len());
    stem.truncate(max_stem);
    let stem = stem.trim_end_matches('_');

    format!("{}{}{}", stem, suffix, ext)
}

/// イベントに基づくファイル名
pub fn event_file_name(record: &EventRecord, ext: &str) -> String {
    let date: String = match record.date.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => d
            .chars()
            .map(|c| if c.is_ascii_digit() || c == '-' { c } else { '_' })
            .collect(),
        _ => "undated".into(),
    };
    let mut title = canonicalize(&record.title);
    if title.is_empty() {
        title = format!("event_{}", canonicalize(&record.id));
    }

    let ext = ext.trim_start_matches('.').to_lowercase();
    let max_title = MAX_FILE_NAME_LEN.saturating_sub(date.len() + ext.len() + 2);
    title.truncate(max_title);

    format!("{}_{}.{}", date, title.trim_end_matches('_'), ext)
}

/// 既存ファイルや同じ実行で予定済みの名前を上書きしないリネーム
fn rename_in_folder(
    folder: &Path,
    from: &str,
    to: &str,
    dry_run: bool,
    planned: &mut HashSet<String>,
) -> std::result::Result<(), String> {
    if planned.contains(to) || folder.join(to).exists() {
        return Err(format!("{} は既に存在します", to));
    }
    planned.insert(to.to_string());
    if !dry_run {
        std::fs::rename(folder.join(from), folder.join(to)).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// フォルダ内の画像名を整理
pub fn clean_folder(folder: &Path, dry_run: bool) -> Result<RenameSummary> {
    let images = scanner::scan_folder(folder)?;
    let mut summary = RenameSummary::default();
    let mut planned = HashSet::new();

    for image in images {
        let bytes = match std::fs::read(&image.path) {
            Ok(b) => b,
            Err(e) => {
                summary.errors.push((image.file_name, e.to_string()));
                continue;
            }
        };
        let new_name = clean_file_name(&image.file_name, &content_id(&bytes));
        apply_rename(folder, image.file_name, new_name, dry_run, &mut planned, &mut summary);
    }

    Ok(summary)
}

fn apply_rename(
    folder: &Path,
    from: String,
    to: String,
    dry_run: bool,
    planned: &mut HashSet<String>,
    summary: &mut RenameSummary,
) {
    if from == to {
        planned.insert(to);
        summary.skipped.push(from);
        return;
    }
    match rename_in_folder(folder, &from, &to, dry_run, planned) {
        Ok(()) => {
            tracing::debug!(from = %from, to = %to, dry_run, "リネーム");
            summary.renamed.push(RenameEntry { from, to });
        }
        Err(reason) => summary.errors.push((from, reason)),
    }
}

/// 照合したイベントに基づいて画像名を変更
///
/// 照合は並列、リネームは名前の衝突を検出するため逐次。
pub fn rename_by_events(
    folder: &Path,
    candidates: &[EventRecord],
    matcher: &EventMatcher,
    dry_run: bool,
) -> Result<RenameSummary> {
    let images = scanner::scan_folder(folder)?;
    let matched: Vec<(ImageInfo, MatchResult)> = images
        .into_par_iter()
        .map(|image| {
            let result = matcher.find_best(&image.file_name, candidates);
            (image, result)
        })
        .collect();

    let mut summary = RenameSummary::default();
    let mut planned = HashSet::new();
    for (image, result) in matched {
        let Some(record) = result.matched.as_ref() else {
            tracing::info!(file = %image.file_name, score = result.score, "該当イベントなし");
            summary.rows.push(ReportRow::from_match(&image.file_name, &result, "no-match"));
            summary.skipped.push(image.file_name);
            continue;
        };

        let new_name = event_file_name(record, &image.extension());
        let before = summary.errors.len();
        apply_rename(folder, image.file_name.clone(), new_name, dry_run, &mut planned, &mut summary);
        let status = if summary.errors.len() > before { "error" } else { "renamed" };
        summary.rows.push(ReportRow::from_match(&image.file_name, &result, status));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id() {
        // SHA-256("abc") = ba7816bf...
        assert_eq!(content_id(b"abc"), "ba7816bf");
        assert_eq!(content_id(b"abc").len(), 8);
    }

    #[test]
    fn test_clean_file_name() {
        assert_eq!(
            clean_file_name("DALL·E 2023-05-01 14.22.10 - Bataille d'Hastings.PNG", "1a2b3c4d"),
            "bataille_d_hastings_1a2b3c4d.png"
        );
    }

    #[test]
    fn test_clean_file_name_idempotent() {
        let once = clean_file_name("Prise de la Bastille.webp", "deadbeef");
        assert_eq!(once, "prise_de_la_bastille_deadbeef.webp");
        assert_eq!(clean_file_name(&once, "deadbeef"), once);
    }

    #[test]
    fn test_clean_file_name_length_limit() {
        let long = format!("{}.jpg", "a".repeat(300));
        let cleaned = clean_file_name(&long, "1a2b3c4d");
        assert_eq!(cleaned.len(), MAX_FILE_NAME_LEN);
        assert!(cleaned.ends_with("_1a2b3c4d.jpg"));
    }

    #[test]
    fn test_clean_file_name_empty_stem() {
        assert_eq!(clean_file_name("___.jpg", "1a2b3c4d"), "image_1a2b3c4d.jpg");
    }

    #[test]
    fn test_event_file_name() {
        let record = EventRecord::new("1", "Bataille d'Hastings").with_date("1066-10-14");
        assert_eq!(event_file_name(&record, "WEBP"), "1066-10-14_bataille_d_hastings.webp");

        let undated = EventRecord::new("42", "");
        assert_eq!(event_file_name(&undated, ".jpg"), "undated_event_42.jpg");
    }
}
