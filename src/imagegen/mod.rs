//! イベント画像の生成
//!
//! `batch_XX.json` ごとに 生成 → 圧縮 → アップロード → URL登録 を行い、
//! 結果を `results_batch_XX.json` に保存する。結果ファイルがあるバッチは処理済みとして飛ばす。

pub mod client;
pub mod prompt;
pub mod rate_limit;

pub use client::ImageClient;
pub use prompt::{build_prompt, check_content_policy};
pub use rate_limit::RateLimiter;

use crate::batch::{self, BatchFile};
use crate::error::Result;
use crate::workflow::Publisher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_curator_common::EventRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// プロンプトから画像バイト列を生成
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Error,
}

/// イベント1件の生成結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub event_id: String,
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub prompt: String,
}

/// `results_batch_XX.json` の内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    pub total_images: usize,
    pub successful: usize,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<GenerationResult>,
}

impl BatchResults {
    pub fn new(results: Vec<GenerationResult>) -> Self {
        Self {
            total_images: results.len(),
            successful: results
                .iter()
                .filter(|r| r.status == GenerationStatus::Success)
                .count(),
            timestamp: Utc::now(),
            results,
        }
    }
}

pub fn results_file_name(batch_number: u32) -> String {
    format!("results_batch_{:02}.json", batch_number)
}

/// 生成の進め方
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    /// 1バッチ内で区切る件数
    pub chunk_size: usize,
    /// 区切りごとの休止
    pub chunk_pause: Duration,
    /// バッチファイル間の休止
    pub batch_pause: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            chunk_pause: Duration::from_secs(12),
            batch_pause: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<u32>,
    pub failed: Vec<(u32, String)>,
    pub images: usize,
    pub successful: usize,
}

pub struct BatchRunner<'a> {
    generator: &'a dyn ImageGenerator,
    publisher: &'a Publisher<'a>,
    options: RunOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(generator: &'a dyn ImageGenerator, publisher: &'a Publisher<'a>, options: RunOptions) -> Self {
        Self {
            generator,
            publisher,
            options,
        }
    }

    /// イベント1件を処理。失敗も結果として返す
    pub async fn process_event(&self, record: &EventRecord) -> GenerationResult {
        let prompt = build_prompt(record, &check_content_policy(record));
        match self.generate_and_publish(&prompt, record).await {
            Ok(url) => {
                tracing::info!(event = %record.id, "画像を生成・登録");
                GenerationResult {
                    event_id: record.id.clone(),
                    status: GenerationStatus::Success,
                    public_url: Some(url),
                    error: None,
                    prompt,
                }
            }
            Err(e) => {
                tracing::error!(event = %record.id, error = %e, "画像生成に失敗");
                GenerationResult {
                    event_id: record.id.clone(),
                    status: GenerationStatus::Error,
                    public_url: None,
                    error: Some(e.to_string()),
                    prompt,
                }
            }
        }
    }

    async fn generate_and_publish(&self, prompt: &str, record: &EventRecord) -> Result<String> {
        let image = self.generator.generate(prompt).await?;
        self.publisher.publish_bytes(&image, record).await
    }

    pub async fn process_events(&self, events: &[EventRecord]) -> Vec<GenerationResult> {
        let chunk_size = self.options.chunk_size.max(1);
        let chunk_count = events.len().div_ceil(chunk_size);
        let mut results = Vec::with_capacity(events.len());

        for (i, chunk) in events.chunks(chunk_size).enumerate() {
            tracing::info!(
                "区切り {}/{}（イベント {}-{}）",
                i + 1,
                chunk_count,
                i * chunk_size + 1,
                i * chunk_size + chunk.len()
            );
            for record in chunk {
                results.push(self.process_event(record).await);
            }
            if i + 1 < chunk_count && !self.options.chunk_pause.is_zero() {
                tokio::time::sleep(self.options.chunk_pause).await;
            }
        }
        results
    }

    /// バッチファイルを番号順に処理
    pub async fn run(&self, batches_dir: &Path, results_dir: &Path, start_batch: u32) -> Result<RunSummary> {
        let files: Vec<(u32, PathBuf)> = batch::list_batch_files(batches_dir)?
            .into_iter()
            .filter(|(n, _)| *n >= start_batch)
            .collect();
        std::fs::create_dir_all(results_dir)?;

        let mut summary = RunSummary::default();
        let mut processed_any = false;

        for (number, path) in files {
            let result_path = results_dir.join(results_file_name(number));
            if result_path.exists() {
                println!("  バッチ {} は処理済み、スキップ", number);
                summary.skipped.push(number);
                continue;
            }

            if processed_any && !self.options.batch_pause.is_zero() {
                println!("  次のバッチまで{}秒待機...", self.options.batch_pause.as_secs());
                tokio::time::sleep(self.options.batch_pause).await;
            }
            processed_any = true;

            println!("[バッチ {}] {}", number, path.display());
            match self.run_one(&path, &result_path).await {
                Ok(results) => {
                    println!("✔ {}/{}件成功", results.successful, results.total_images);
                    summary.images += results.total_images;
                    summary.successful += results.successful;
                    summary.processed.push(result_path);
                }
                Err(e) => {
                    tracing::error!(batch = number, error = %e, "バッチ処理に失敗");
                    summary.failed.push((number, e.to_string()));
                }
            }
        }
        Ok(summary)
    }

    async fn run_one(&self, batch_path: &Path, result_path: &Path) -> Result<BatchResults> {
        let batch = BatchFile::load(batch_path)?;
        let results = BatchResults::new(self.process_events(&batch.events).await);
        std::fs::write(result_path, serde_json::to_string_pretty(&results)?)?;
        Ok(results)
    }
}
