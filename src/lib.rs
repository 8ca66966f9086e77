//! event-curator
//!
//! 歴史イベントの画像ライブラリを整理するツール群。
//! 照合そのものは `event_curator_common` にあり、ここではファイル・HTTP・対話などの周辺処理を扱う。

pub mod batch;
pub mod cli;
pub mod compress;
pub mod config;
pub mod confirm;
pub mod error;
pub mod export;
pub mod imagegen;
pub mod mapping;
pub mod records;
pub mod rename;
pub mod scanner;
pub mod storage;
pub mod validate;
pub mod workflow;

use tracing_subscriber::EnvFilter;

/// ログ出力を初期化
///
/// RUST_LOG があればそれに従う。なければ `event_curator=info`（`--verbose` 時は debug）。
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "event_curator=debug"
    } else {
        "event_curator=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
