use clap::{Parser, Subcommand};
use event_curator_common::MatchMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "event-curator")]
#[command(about = "歴史イベント画像の照合・整理・生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// レコードをローカルJSONから読む（設定の record_file より優先）
    #[arg(long, global = true)]
    pub records: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 文字列をイベントと照合して候補を表示
    Match {
        /// ファイル名または自由入力
        #[arg(required = true)]
        query: String,

        /// 照合モード (whole-string/keyword-set)
        #[arg(short, long, default_value = "whole-string")]
        mode: MatchMode,

        /// 採用閾値（省略時は設定の auto_threshold）
        #[arg(short, long)]
        threshold: Option<u8>,

        /// 日付の一致もスコアに含める
        #[arg(long)]
        consider_date: bool,

        /// 表示する候補数
        #[arg(long, default_value = "5")]
        top: usize,

        /// イラスト未設定のイベントのみ対象
        #[arg(long)]
        pending_only: bool,
    },

    /// 画像ファイル名の整理
    Rename {
        #[command(subcommand)]
        action: RenameAction,
    },

    /// 画像を確認しながらイラスト未設定のイベントに紐付け
    Link {
        /// 画像フォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 採用閾値（省略時は設定の confirm_threshold）
        #[arg(short, long)]
        threshold: Option<u8>,

        /// 確認せず閾値を超えたものだけ紐付け
        #[arg(long)]
        auto: bool,

        /// アップロード先をローカルフォルダにする
        #[arg(long)]
        local_store: Option<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// 対応表に沿って 照合 → リネーム → アップロード を実行
    Process {
        /// 画像フォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 採用閾値（省略時は設定の process_threshold）
        #[arg(short, long)]
        threshold: Option<u8>,

        /// アップロード先をローカルフォルダにする
        #[arg(long)]
        local_store: Option<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// 画像を縮小・JPEG圧縮
    Compress {
        /// 入力フォルダ
        #[arg(required = true)]
        input: PathBuf,

        /// 出力フォルダ
        #[arg(required = true)]
        output: PathBuf,

        /// JPEG品質 (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// 長辺の最大ピクセル数
        #[arg(long)]
        max_size: Option<u32>,
    },

    /// 画像生成用のバッチファイルを作成
    Batches {
        /// 出力フォルダ
        #[arg(short, long, default_value = "processed_batches")]
        output: PathBuf,

        /// 1バッチの件数（省略時は設定の batch_size）
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// イラスト未設定のイベントのみ対象
        #[arg(long)]
        pending_only: bool,
    },

    /// バッチファイルのイベント画像を生成してアップロード
    Generate {
        /// バッチファイルのフォルダ
        #[arg(long, default_value = "processed_batches")]
        batches: PathBuf,

        /// 結果の出力フォルダ
        #[arg(long, default_value = "results")]
        results: PathBuf,

        /// 開始するバッチ番号
        #[arg(short, long, default_value = "1")]
        start_batch: u32,

        /// アップロード先をローカルフォルダにする
        #[arg(long)]
        local_store: Option<PathBuf>,
    },

    /// イベントをWikidataと照らし合わせて検証
    Validate {
        /// レポートJSONの出力先
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 採用閾値（省略時は設定の validation_threshold）
        #[arg(short, long)]
        threshold: Option<u8>,

        /// 検証する件数の上限
        #[arg(long)]
        limit: Option<usize>,
    },

    /// 設定管理
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// ストレージ・REST APIのURLを設定
        #[arg(long)]
        set_storage_url: Option<String>,

        /// バケット名を設定
        #[arg(long)]
        set_bucket: Option<String>,

        /// レコードのテーブル名を設定
        #[arg(long)]
        set_table: Option<String>,

        /// レコードのローカルJSONを設定
        #[arg(long)]
        set_record_file: Option<PathBuf>,

        /// 無人照合の閾値を設定
        #[arg(long)]
        set_auto_threshold: Option<u8>,

        /// 確認付き照合の閾値を設定
        #[arg(long)]
        set_confirm_threshold: Option<u8>,

        /// マッピング処理の閾値を設定
        #[arg(long)]
        set_process_threshold: Option<u8>,

        /// 検証の閾値を設定
        #[arg(long)]
        set_validation_threshold: Option<u8>,

        /// 1分あたりの画像生成リクエスト数を設定
        #[arg(long)]
        set_requests_per_minute: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum RenameAction {
    /// `<正規化した名前>_<内容ID>.<拡張子>` に整理
    Clean {
        /// 画像フォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 変更せずに結果だけ表示
        #[arg(long)]
        dry_run: bool,
    },

    /// 照合したイベントの `<日付>_<タイトル>.<拡張子>` に変更
    Events {
        /// 画像フォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 採用閾値（省略時は設定の auto_threshold）
        #[arg(short, long)]
        threshold: Option<u8>,

        /// 変更せずに結果だけ表示
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        report: ReportArgs,
    },
}

/// レポート出力の指定
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ReportArgs {
    /// レポートの出力先（ファイルまたはフォルダ）
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// レポート形式 (json/excel/both)
    #[arg(long, default_value = "json")]
    pub report_format: ReportFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ReportFormat {
    #[default]
    Json,
    Excel,
    Both,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "excel" | "xlsx" => Ok(ReportFormat::Excel),
            "both" => Ok(ReportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use json, excel, or both", s)),
        }
    }
}
