//! Event Curator Common Library
//!
//! ファイル名・自由入力と歴史イベントのレコードを照合する純粋ロジック。
//! 入出力を持たないので、CLIの各コマンドから同じ照合器を共有する。

pub mod date;
pub mod error;
pub mod keywords;
pub mod matcher;
pub mod normalize;
pub mod scorer;
pub mod similarity;
pub mod types;

pub use date::parse_year;
pub use error::{Error, Result};
pub use keywords::{extract_keywords, lemmatize};
pub use matcher::{match_event, EventMatcher};
pub use normalize::{canonicalize, normalize_query};
pub use scorer::{has_usable_signal, score_candidate, PreparedQuery};
pub use similarity::{FuzzySimilarity, Similarity};
pub use types::{EventRecord, MatchConfig, MatchMode, MatchResult, RankedCandidate, SubScores};
