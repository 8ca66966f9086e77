//! 照合 → 圧縮 → アップロード → URL登録 の一連の処理
//!
//! - `link`: 画像ごとに照合結果を確認してイベントに紐付ける
//! - `process`: 対応表（`.image-event-mapping.json`）に沿って段階的に処理する

use crate::compress::{self, CompressOptions};
use crate::confirm::{Confirmer, Decision};
use crate::error::{CuratorError, Result};
use crate::export::ReportRow;
use crate::mapping::{MappingEntry, MappingFile, MappingStatus};
use crate::records::{RecordFilter, RecordSource};
use crate::rename::event_file_name;
use crate::scanner;
use crate::storage::{content_type_for, ObjectStore};
use event_curator_common::{EventMatcher, EventRecord, MatchResult};
use std::collections::HashSet;
use std::path::Path;

/// 圧縮・アップロード・URL登録をまとめて行う
pub struct Publisher<'a> {
    pub source: &'a dyn RecordSource,
    pub store: &'a dyn ObjectStore,
    pub options: CompressOptions,
}

impl<'a> Publisher<'a> {
    pub fn new(source: &'a dyn RecordSource, store: &'a dyn ObjectStore, options: CompressOptions) -> Self {
        Self { source, store, options }
    }

    /// 画像バイト列を圧縮してアップロードし、公開URLを返す
    pub async fn upload_bytes(&self, data: &[u8], key: &str) -> Result<String> {
        let compressed = compress::compress_bytes(data, &self.options)?;
        let stats = compressed.stats();
        tracing::debug!(
            key,
            original = stats.original_bytes,
            compressed = stats.compressed_bytes,
            "圧縮完了"
        );
        let url = self
            .store
            .put_object(key, compressed.bytes, content_type_for("jpg"))
            .await?;
        Ok(url)
    }

    pub async fn upload_file(&self, path: &Path, key: &str) -> Result<String> {
        if !path.is_file() {
            return Err(CuratorError::FileNotFound(path.display().to_string()));
        }
        let data = tokio::fs::read(path).await?;
        self.upload_bytes(&data, key).await
    }

    /// アップロードしてレコードにURLを登録
    pub async fn publish(&self, path: &Path, record: &EventRecord) -> Result<String> {
        let url = self.upload_file(path, &event_file_name(record, "jpg")).await?;
        self.source.set_illustration_url(&record.id, &url).await?;
        Ok(url)
    }

    pub async fn publish_bytes(&self, data: &[u8], record: &EventRecord) -> Result<String> {
        let url = self.upload_bytes(data, &event_file_name(record, "jpg")).await?;
        self.source.set_illustration_url(&record.id, &url).await?;
        Ok(url)
    }
}

/// `<name>.jpg` 形式のストレージキー
pub fn jpeg_key(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension("jpg")
        .to_string_lossy()
        .to_string()
}

#[derive(Debug, Default)]
pub struct LinkSummary {
    /// (ファイル名, イベントID, URL)
    pub linked: Vec<(String, String, String)>,
    pub skipped: Vec<String>,
    pub failures: Vec<(String, String)>,
    pub rows: Vec<ReportRow>,
    /// 途中で中断した
    pub quit: bool,
}

/// 画像をイラスト未設定のイベントに紐付ける
///
/// 紐付けたイベントは以降の候補から外す。
pub async fn link(
    folder: &Path,
    matcher: &EventMatcher,
    confirmer: &mut dyn Confirmer,
    publisher: &Publisher<'_>,
) -> Result<LinkSummary> {
    let images = scanner::scan_folder(folder)?;
    if images.is_empty() {
        return Err(CuratorError::NoImagesFound(folder.display().to_string()));
    }

    let mut candidates = publisher
        .source
        .list_candidates(&RecordFilter::pending().with_keywords())
        .await?;
    tracing::info!(images = images.len(), candidates = candidates.len(), "紐付け開始");

    let mut summary = LinkSummary::default();

    'images: for image in images {
        let mut query = image.file_name.clone();
        let (record, result) = loop {
            let result = matcher.find_best(&query, &candidates);
            match confirmer.decide(&image.file_name, &result)? {
                Decision::Accept(record) => break (record, result),
                Decision::Manual(keywords) => {
                    tracing::debug!(file = %image.file_name, keywords = %keywords, "キーワードで再照合");
                    query = keywords;
                }
                Decision::Skip => {
                    summary.rows.push(ReportRow::from_match(&image.file_name, &result, "skipped"));
                    summary.skipped.push(image.file_name);
                    continue 'images;
                }
                Decision::Quit => {
                    summary.quit = true;
                    break 'images;
                }
            }
        };

        let mut row = chosen_row(&image.file_name, &result, &record);
        match publisher.publish(&image.path, &record).await {
            Ok(url) => {
                println!("  ✔ {} → {}", image.file_name, record.display_title());
                candidates.retain(|c| c.id != record.id);
                row.status = "linked".into();
                summary.linked.push((image.file_name, record.id, url));
            }
            Err(e) => {
                tracing::warn!(file = %image.file_name, error = %e, "紐付けに失敗");
                row.status = "error".into();
                summary.failures.push((image.file_name, e.to_string()));
            }
        }
        summary.rows.push(row);
    }

    Ok(summary)
}

/// 確認で選ばれたレコードを反映したレポート行
fn chosen_row(file_name: &str, result: &MatchResult, record: &EventRecord) -> ReportRow {
    let mut row = ReportRow::from_match(file_name, result, "");
    let score = result
        .ranking
        .iter()
        .find(|c| c.record.id == record.id)
        .map(|c| c.score)
        .unwrap_or(result.score);
    if row.matched_id.as_deref() != Some(record.id.as_str()) {
        row.runner_up = result
            .ranking
            .iter()
            .find(|c| c.record.id != record.id)
            .map(|c| format!("{} ({})", c.record.display_title(), c.score));
    }
    row.matched_id = Some(record.id.clone());
    row.title = Some(record.display_title());
    row.score = score;
    row
}

#[derive(Debug, Default)]
pub struct ProcessSummary {
    pub discovered: usize,
    pub unmatched: Vec<String>,
    pub renamed: usize,
    pub uploaded: usize,
    pub completed: usize,
    pub failures: Vec<(String, String)>,
    pub rows: Vec<ReportRow>,
}

/// 未登録の画像を照合して `pending` で登録
///
/// 既に対応表にあるイベントは候補から外す。
pub fn discover(
    folder: &Path,
    mapping: &mut MappingFile,
    candidates: &[EventRecord],
    matcher: &EventMatcher,
    summary: &mut ProcessSummary,
) -> Result<()> {
    let images = scanner::scan_folder(folder)?;
    let mapped_events: HashSet<&str> = mapping.entries.iter().map(|e| e.event_id.as_str()).collect();
    let mut available: Vec<EventRecord> = candidates
        .iter()
        .filter(|c| !mapped_events.contains(c.id.as_str()))
        .cloned()
        .collect();

    let mut new_entries = Vec::new();
    for image in images.into_iter().filter(|i| !mapping.contains_file(&i.file_name)) {
        let result = matcher.find_best(&image.file_name, &available);
        let Some(record) = result.matched.clone() else {
            summary.rows.push(ReportRow::from_match(&image.file_name, &result, "no-match"));
            summary.unmatched.push(image.file_name);
            continue;
        };

        let target = event_file_name(&record, &image.extension());
        tracing::debug!(file = %image.file_name, event = %record.id, score = result.score, "対応付け");
        summary.rows.push(ReportRow::from_match(&image.file_name, &result, "pending"));
        new_entries.push(MappingEntry::new(&image.file_name, target, &record, result.score));
        available.retain(|c| c.id != record.id);
    }

    summary.discovered += new_entries.len();
    for entry in new_entries {
        mapping.insert(entry);
    }
    mapping.save(folder)
}

/// `pending` のエントリをリネーム
pub fn rename_stage(folder: &Path, mapping: &mut MappingFile, summary: &mut ProcessSummary) -> Result<()> {
    for i in 0..mapping.entries.len() {
        if mapping.entries[i].status != MappingStatus::Pending {
            continue;
        }
        let outcome = rename_entry(folder, &mut mapping.entries[i]);
        let entry = &mut mapping.entries[i];
        match outcome {
            Ok(()) => summary.renamed += 1,
            Err(e) => {
                entry.record_error(&e);
                summary.failures.push((entry.current_name.clone(), e.to_string()));
            }
        }
        mapping.save(folder)?;
    }
    Ok(())
}

fn rename_entry(folder: &Path, entry: &mut MappingEntry) -> Result<()> {
    let source = folder.join(&entry.current_name);
    let target = folder.join(&entry.target_name);

    if entry.current_name != entry.target_name {
        match (source.exists(), target.exists()) {
            (true, false) => std::fs::rename(&source, &target)?,
            // 前回リネーム後に対応表を保存できなかった
            (false, true) => {}
            (true, true) => return Err(CuratorError::FileExists(entry.target_name.clone())),
            (false, false) => return Err(CuratorError::FileNotFound(source.display().to_string())),
        }
        entry.current_name = entry.target_name.clone();
    }
    entry.advance(MappingStatus::Renamed)
}

/// `renamed` をアップロード、`uploaded` のURLをレコードに登録
pub async fn upload_stage(
    folder: &Path,
    mapping: &mut MappingFile,
    publisher: &Publisher<'_>,
    summary: &mut ProcessSummary,
) -> Result<()> {
    for i in 0..mapping.entries.len() {
        let entry = &mut mapping.entries[i];

        if entry.status == MappingStatus::Renamed {
            let path = folder.join(&entry.current_name);
            match publisher.upload_file(&path, &jpeg_key(&entry.current_name)).await {
                Ok(url) => {
                    entry.image_url = Some(url);
                    entry.advance(MappingStatus::Uploaded)?;
                    summary.uploaded += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %entry.current_name, error = %e, "アップロードに失敗");
                    entry.record_error(&e);
                    summary.failures.push((entry.current_name.clone(), e.to_string()));
                }
            }
            mapping.save(folder)?;
        }

        let entry = &mut mapping.entries[i];
        if entry.status == MappingStatus::Uploaded {
            let Some(url) = entry.image_url.clone() else {
                continue;
            };
            match publisher.source.set_illustration_url(&entry.event_id, &url).await {
                Ok(()) => {
                    entry.advance(MappingStatus::Completed)?;
                    summary.completed += 1;
                }
                Err(e) => {
                    tracing::warn!(event = %entry.event_id, error = %e, "URL登録に失敗");
                    entry.record_error(&e);
                    summary.failures.push((entry.current_name.clone(), e.to_string()));
                }
            }
            mapping.save(folder)?;
        }
    }
    Ok(())
}

/// 対応表に沿って全段階を実行（何度実行しても同じ結果になる）
pub async fn process(folder: &Path, matcher: &EventMatcher, publisher: &Publisher<'_>) -> Result<ProcessSummary> {
    let mut mapping = MappingFile::load(folder)?;
    let mut summary = ProcessSummary::default();

    println!("[1/3] 画像とイベントを対応付け中...");
    let candidates = publisher.source.list_candidates(&RecordFilter::pending()).await?;
    discover(folder, &mut mapping, &candidates, matcher, &mut summary)?;
    println!(
        "✔ 新規: {}件 / 該当なし: {}件\n",
        summary.discovered,
        summary.unmatched.len()
    );

    println!("[2/3] リネーム中...");
    rename_stage(folder, &mut mapping, &mut summary)?;
    println!("✔ リネーム: {}件\n", summary.renamed);

    println!("[3/3] アップロード中...");
    upload_stage(folder, &mut mapping, publisher, &mut summary).await?;
    println!(
        "✔ アップロード: {}件 / URL登録: {}件\n",
        summary.uploaded, summary.completed
    );

    let [pending, renamed, uploaded, completed] = mapping.counts();
    tracing::info!(pending, renamed, uploaded, completed, "対応表の状態");
    Ok(summary)
}
