//! 画像生成バッチテスト
//!
//! 実際のAPIの代わりに固定画像を返す生成器を使い、
//! バッチ作成 → 生成 → アップロード → 結果ファイル の流れを検証

use async_trait::async_trait;
use event_curator::batch;
use event_curator::compress::CompressOptions;
use event_curator::error::{CuratorError, Result};
use event_curator::imagegen::{
    results_file_name, BatchResults, BatchRunner, GenerationStatus, ImageGenerator, RunOptions,
};
use event_curator::records::{JsonFileSource, RecordFilter, RecordSource};
use event_curator::storage::LocalStore;
use event_curator::workflow::Publisher;
use event_curator_common::EventRecord;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

/// 固定のPNGを返す生成器
#[derive(Default)]
struct FakeGenerator {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    /// このキーワードを含むプロンプトは失敗させる
    fail_on: Option<&'static str>,
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(word) = self.fail_on {
            if prompt.contains(word) {
                return Err(CuratorError::ApiCall("content_policy_violation".into()));
            }
        }

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(96, 48, Rgb([20, 90, 160])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        Ok(buffer.into_inner())
    }
}

const RECORDS: &str = r#"[
    {"id": 10, "titre": "Prise de la Bastille", "date": "1789-07-14"},
    {"id": 11, "titre": "Bataille d'Hastings", "date": "1066-10-14"},
    {"id": 12, "titre": "Couronnement de Charlemagne", "date": "800-12-25"}
]"#;

fn no_pause() -> RunOptions {
    RunOptions {
        chunk_size: 2,
        chunk_pause: Duration::ZERO,
        batch_pause: Duration::ZERO,
    }
}

fn options() -> CompressOptions {
    CompressOptions {
        quality: 80,
        max_size: 32,
    }
}

/// バッチは年順に並び、全件生成されてURLが登録される
#[tokio::test]
async fn test_generate_all_batches() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records_path = dir.path().join("events.json");
    std::fs::write(&records_path, RECORDS).unwrap();
    let source = JsonFileSource::new(&records_path);
    let store = LocalStore::new(dir.path().join("store"));
    let publisher = Publisher::new(&source, &store, options());

    let records = source.list_candidates(&RecordFilter::pending()).await.unwrap();
    let batches_dir = dir.path().join("batches");
    let written = batch::write_batches(records, 2, &batches_dir).unwrap();
    assert_eq!(written.len(), 2);

    let generator = FakeGenerator::default();
    let runner = BatchRunner::new(&generator, &publisher, no_pause());
    let results_dir = dir.path().join("results");
    let summary = runner.run(&batches_dir, &results_dir, 1).await.expect("生成に失敗");

    assert_eq!(summary.processed.len(), 2);
    assert!(summary.skipped.is_empty());
    assert!(summary.failed.is_empty());
    assert_eq!(summary.images, 3);
    assert_eq!(summary.successful, 3);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

    // 最も古いイベントから生成される
    let prompts = generator.prompts.lock().unwrap().clone();
    assert!(prompts[0].contains("Charlemagne"));
    assert!(prompts[2].contains("Bastille"));

    let first: BatchResults =
        serde_json::from_str(&std::fs::read_to_string(results_dir.join(results_file_name(1))).unwrap()).unwrap();
    assert_eq!(first.total_images, 2);
    assert_eq!(first.successful, 2);
    assert_eq!(first.results[0].event_id, "12");

    // 圧縮されたJPEGが保存される
    let stored = image::open(dir.path().join("store").join("1066-10-14_bataille_d_hastings.jpg")).unwrap();
    assert_eq!((stored.width(), stored.height()), (32, 16));

    let pending = source.list_candidates(&RecordFilter::pending()).await.unwrap();
    assert!(pending.is_empty());
}

/// 結果ファイルがあるバッチは処理済みとして飛ばす
#[tokio::test]
async fn test_skip_processed_batch() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records_path = dir.path().join("events.json");
    std::fs::write(&records_path, RECORDS).unwrap();
    let source = JsonFileSource::new(&records_path);
    let store = LocalStore::new(dir.path().join("store"));
    let publisher = Publisher::new(&source, &store, options());

    let records = source.list_candidates(&RecordFilter::all()).await.unwrap();
    let batches_dir = dir.path().join("batches");
    batch::write_batches(records, 2, &batches_dir).unwrap();

    let results_dir = dir.path().join("results");
    std::fs::create_dir_all(&results_dir).unwrap();
    std::fs::write(results_dir.join(results_file_name(1)), "{}").unwrap();

    let generator = FakeGenerator::default();
    let runner = BatchRunner::new(&generator, &publisher, no_pause());
    let summary = runner.run(&batches_dir, &results_dir, 1).await.unwrap();

    assert_eq!(summary.skipped, vec![1]);
    assert_eq!(summary.processed.len(), 1);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    // 既存の結果ファイルは上書きしない
    assert_eq!(std::fs::read_to_string(results_dir.join(results_file_name(1))).unwrap(), "{}");
}

/// 開始番号より前のバッチは対象外
#[tokio::test]
async fn test_start_batch() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records_path = dir.path().join("events.json");
    std::fs::write(&records_path, RECORDS).unwrap();
    let source = JsonFileSource::new(&records_path);
    let store = LocalStore::new(dir.path().join("store"));
    let publisher = Publisher::new(&source, &store, options());

    let records = source.list_candidates(&RecordFilter::all()).await.unwrap();
    let batches_dir = dir.path().join("batches");
    batch::write_batches(records, 1, &batches_dir).unwrap();

    let generator = FakeGenerator::default();
    let runner = BatchRunner::new(&generator, &publisher, no_pause());
    let results_dir = dir.path().join("results");
    let summary = runner.run(&batches_dir, &results_dir, 3).await.unwrap();

    assert_eq!(summary.processed, vec![results_dir.join(results_file_name(3))]);
    assert!(!results_dir.join(results_file_name(1)).exists());
}

/// 生成の失敗は結果に記録して次のイベントへ進む
#[tokio::test]
async fn test_failed_event_is_recorded() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records_path = dir.path().join("events.json");
    std::fs::write(&records_path, RECORDS).unwrap();
    let source = JsonFileSource::new(&records_path);
    let store = LocalStore::new(dir.path().join("store"));
    let publisher = Publisher::new(&source, &store, options());

    let generator = FakeGenerator {
        fail_on: Some("Hastings"),
        ..FakeGenerator::default()
    };
    let runner = BatchRunner::new(&generator, &publisher, no_pause());

    let events = vec![
        EventRecord::new("11", "Bataille d'Hastings").with_date("1066-10-14"),
        EventRecord::new("10", "Prise de la Bastille").with_date("1789-07-14"),
        // レコードに存在しないIDはURL登録で失敗する
        EventRecord::new("99", "Fête de la Fédération").with_date("1790-07-14"),
    ];
    let results = runner.process_events(&events).await;

    let statuses: Vec<GenerationStatus> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![GenerationStatus::Error, GenerationStatus::Success, GenerationStatus::Error]
    );
    assert!(results[0].error.as_deref().unwrap().contains("content_policy_violation"));
    assert!(results[1].public_url.is_some());
    assert!(results[2].error.as_deref().unwrap().contains("99"));
}
