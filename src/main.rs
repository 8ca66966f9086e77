use clap::Parser;
use event_curator::cli::{Cli, Commands, RenameAction, ReportArgs};
use event_curator::compress::{self, CompressOptions};
use event_curator::config::Config;
use event_curator::confirm::{AutoConfirmer, Confirmer, InteractiveConfirmer};
use event_curator::error::Result;
use event_curator::export::{self, ReportRow};
use event_curator::imagegen::{BatchRunner, ImageClient, RunOptions};
use event_curator::records::{self, RecordFilter};
use event_curator::storage::{LocalStore, ObjectStore, SupabaseStore};
use event_curator::validate::{Validator, WikidataClient};
use event_curator::workflow::{self, Publisher};
use event_curator::{batch, rename};
use event_curator_common::{EventMatcher, MatchConfig, MatchMode};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    event_curator::init_tracing(cli.verbose);

    let mut config = Config::load()?;
    if let Some(records) = cli.records {
        config.record_file = Some(records);
    }

    match cli.command {
        Commands::Match { query, mode, threshold, consider_date, top, pending_only } => {
            println!("🔎 event-curator - 照合\n");

            let source = records::open_source(&config)?;
            let filter = if pending_only { RecordFilter::pending() } else { RecordFilter::all() };
            let candidates = source.list_candidates(&filter).await?;
            println!("✔ 候補イベント: {}件\n", candidates.len());

            let matcher = EventMatcher::new(
                MatchConfig::new(mode, threshold.unwrap_or(config.auto_threshold))
                    .with_date(consider_date)
                    .with_top_n(top),
            )?;
            let result = matcher.find_best(&query, &candidates);

            for line in export::ranking_lines(&result) {
                println!("{}", line);
            }

            match &result.matched {
                Some(record) => println!("\n✅ 採用: {} (ID {}, スコア {})", record.display_title(), record.id, result.score),
                None => println!("\n該当なし（最高スコア {}）", result.score),
            }
        }

        Commands::Rename { action: RenameAction::Clean { folder, dry_run } } => {
            println!("🧹 event-curator - ファイル名整理\n");
            let summary = rename::clean_folder(&folder, dry_run)?;
            summary.print(dry_run);
        }

        Commands::Rename { action: RenameAction::Events { folder, threshold, dry_run, report } } => {
            println!("🏷  event-curator - イベント名でリネーム\n");

            println!("[1/2] イベントを取得中...");
            let source = records::open_source(&config)?;
            let candidates = source.list_candidates(&RecordFilter::all()).await?;
            println!("✔ {}件のイベント\n", candidates.len());

            println!("[2/2] 照合・リネーム中...");
            let matcher = EventMatcher::new(MatchConfig::new(
                MatchMode::WholeString,
                threshold.unwrap_or(config.auto_threshold),
            ))?;
            let summary = rename::rename_by_events(&folder, &candidates, &matcher, dry_run)?;
            summary.print(dry_run);
            write_report(&summary.rows, &report, "rename-report")?;
        }

        Commands::Link { folder, threshold, auto, local_store, report } => {
            println!("🔗 event-curator - 画像の紐付け\n");

            let source = records::open_source(&config)?;
            let store = open_store(&config, local_store)?;
            let publisher = Publisher::new(source.as_ref(), store.as_ref(), CompressOptions::from_config(&config));
            let matcher = EventMatcher::new(MatchConfig::new(
                MatchMode::KeywordSet,
                threshold.unwrap_or(config.confirm_threshold),
            ))?;
            let mut confirmer: Box<dyn Confirmer> = if auto {
                Box::new(AutoConfirmer)
            } else {
                Box::new(InteractiveConfirmer)
            };

            let summary = workflow::link(&folder, &matcher, confirmer.as_mut(), &publisher).await?;
            for (file, reason) in &summary.failures {
                println!("  ✗ {}: {}", file, reason);
            }
            println!(
                "\n✔ 紐付け: {}件 / スキップ: {}件 / エラー: {}件{}",
                summary.linked.len(),
                summary.skipped.len(),
                summary.failures.len(),
                if summary.quit { "（中断）" } else { "" }
            );
            write_report(&summary.rows, &report, "link-report")?;
        }

        Commands::Process { folder, threshold, local_store, report } => {
            println!("📦 event-curator - 対応表処理\n");

            let source = records::open_source(&config)?;
            let store = open_store(&config, local_store)?;
            let publisher = Publisher::new(source.as_ref(), store.as_ref(), CompressOptions::from_config(&config));
            let matcher = EventMatcher::new(
                MatchConfig::new(MatchMode::WholeString, threshold.unwrap_or(config.process_threshold)).with_date(true),
            )?;

            let summary = workflow::process(&folder, &matcher, &publisher).await?;
            for (file, reason) in &summary.failures {
                println!("  ✗ {}: {}", file, reason);
            }
            println!("✅ 処理完了（エラー: {}件）", summary.failures.len());
            write_report(&summary.rows, &report, "process-report")?;
        }

        Commands::Compress { input, output, quality, max_size } => {
            println!("🗜  event-curator - 画像圧縮\n");

            let mut options = CompressOptions::from_config(&config);
            if let Some(q) = quality {
                options.quality = q.clamp(1, 100);
            }
            if let Some(size) = max_size {
                options.max_size = size.max(1);
            }

            let result = compress::compress_folder(&input, &output, &options)?;
            for (file, reason) in &result.failures {
                println!("  ✗ {}: {}", file, reason);
            }
            let total = result.total();
            println!(
                "✔ {}枚を圧縮: {:.1}MB → {:.1}MB（{:.1}%削減）",
                result.reports.len(),
                total.original_bytes as f64 / 1_048_576.0,
                total.compressed_bytes as f64 / 1_048_576.0,
                total.reduction_percent()
            );
        }

        Commands::Batches { output, batch_size, pending_only } => {
            println!("🗂  event-curator - バッチ作成\n");

            let source = records::open_source(&config)?;
            let filter = if pending_only { RecordFilter::pending() } else { RecordFilter::all() };
            let records = source.list_candidates(&filter).await?;
            let written = batch::write_batches(records, batch_size.unwrap_or(config.batch_size), &output)?;
            println!("✔ {}個のバッチを作成: {}", written.len(), output.display());
        }

        Commands::Generate { batches, results, start_batch, local_store } => {
            println!("🎨 event-curator - 画像生成\n");

            let generator = ImageClient::new(config.openai_key()?, &config)?;
            let source = records::open_source(&config)?;
            let store = open_store(&config, local_store)?;
            let publisher = Publisher::new(source.as_ref(), store.as_ref(), CompressOptions::from_config(&config));
            let options = RunOptions {
                batch_pause: Duration::from_secs(config.batch_pause_seconds),
                ..RunOptions::default()
            };

            let runner = BatchRunner::new(&generator, &publisher, options);
            let summary = runner.run(&batches, &results, start_batch).await?;
            for (number, reason) in &summary.failed {
                println!("  ✗ バッチ {}: {}", number, reason);
            }
            println!(
                "\n✅ 生成完了: {}/{}件成功（処理 {} / スキップ {} バッチ）",
                summary.successful,
                summary.images,
                summary.processed.len(),
                summary.skipped.len()
            );
        }

        Commands::Validate { output, threshold, limit } => {
            println!("📚 event-curator - Wikidata検証\n");

            let source = records::open_source(&config)?;
            let mut records = source.list_candidates(&RecordFilter::all()).await?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }

            let client = WikidataClient::new(Duration::from_secs(config.timeout_seconds))?;
            let validator = Validator::new(&client, threshold.unwrap_or(config.validation_threshold));
            let report = validator.validate_all(&records).await;
            report.print();

            if let Some(path) = output {
                report.save_json(&path)?;
                println!("✔ レポートを保存: {}", path.display());
            }
        }

        Commands::Config {
            show,
            set_storage_url,
            set_bucket,
            set_table,
            set_record_file,
            set_auto_threshold,
            set_confirm_threshold,
            set_process_threshold,
            set_validation_threshold,
            set_requests_per_minute,
        } => {
            // --records で上書きした値は保存しない
            let mut config = Config::load()?;
            let mut changed = false;

            if let Some(url) = set_storage_url {
                config.storage_url = Some(url);
                changed = true;
            }
            if let Some(bucket) = set_bucket {
                config.bucket = bucket;
                changed = true;
            }
            if let Some(table) = set_table {
                config.records_table = table;
                changed = true;
            }
            if let Some(path) = set_record_file {
                config.record_file = Some(path);
                changed = true;
            }
            for (value, target) in [
                (set_auto_threshold, &mut config.auto_threshold),
                (set_confirm_threshold, &mut config.confirm_threshold),
                (set_process_threshold, &mut config.process_threshold),
                (set_validation_threshold, &mut config.validation_threshold),
            ] {
                if let Some(v) = value {
                    *target = v;
                    changed = true;
                }
            }
            if let Some(rpm) = set_requests_per_minute {
                config.requests_per_minute = rpm;
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                print_config(&config);
            }
        }
    }

    Ok(())
}

fn open_store(config: &Config, local_store: Option<PathBuf>) -> Result<Box<dyn ObjectStore>> {
    if let Some(root) = local_store {
        return Ok(Box::new(LocalStore::new(root)));
    }
    let store = SupabaseStore::new(
        &config.storage_url()?,
        &config.bucket,
        config.supabase_key()?,
        Duration::from_secs(config.timeout_seconds),
    )?;
    Ok(Box::new(store))
}

fn write_report(rows: &[ReportRow], args: &ReportArgs, title: &str) -> Result<()> {
    if let Some(output) = &args.report {
        export::export_report(rows, &args.report_format, output, title)?;
    }
    Ok(())
}

fn print_config(config: &Config) {
    let secret = |name: &str| {
        if event_curator::config::secret(name).is_ok() {
            "設定済み"
        } else {
            "未設定"
        }
    };

    println!("設定:");
    println!("  ストレージURL: {}", config.storage_url().unwrap_or_else(|_| "未設定".into()));
    println!("  バケット: {}", config.bucket);
    println!("  テーブル: {}", config.records_table);
    println!(
        "  レコードファイル: {}",
        config
            .record_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "なし（REST API）".into())
    );
    println!(
        "  閾値: 無人 {} / 確認 {} / 対応表 {} / 検証 {}",
        config.auto_threshold, config.confirm_threshold, config.process_threshold, config.validation_threshold
    );
    println!("  圧縮: 品質 {} / 最大 {}px", config.compression_quality, config.max_image_size);
    println!(
        "  画像生成: {} {} / {}回/分",
        config.image_model, config.image_size, config.requests_per_minute
    );
    println!("  {}: {}", event_curator::config::SUPABASE_KEY_VAR, secret(event_curator::config::SUPABASE_KEY_VAR));
    println!("  {}: {}", event_curator::config::OPENAI_KEY_VAR, secret(event_curator::config::OPENAI_KEY_VAR));
}
