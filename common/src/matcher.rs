//! イベント照合
//!
//! 全候補を採点し、スコア降順（同点は入力順）で並べて1位を仮採用する。
//! 1位のスコアが閾値を超えた場合のみ採用とする。
//!
//! 状態を持たず入出力もしないので、複数スレッドから同時に呼んでよい。

use crate::error::Result;
use crate::scorer::{score_candidate, PreparedQuery};
use crate::similarity::{FuzzySimilarity, Similarity};
use crate::types::{EventRecord, MatchConfig, MatchResult, RankedCandidate};

/// イベント照合器
#[derive(Debug, Clone)]
pub struct EventMatcher<S = FuzzySimilarity> {
    config: MatchConfig,
    similarity: S,
}

impl EventMatcher<FuzzySimilarity> {
    /// 設定を検証して照合器を作成
    pub fn new(config: MatchConfig) -> Result<Self> {
        Self::with_similarity(config, FuzzySimilarity)
    }
}

impl<S: Similarity> EventMatcher<S> {
    /// 類似度の計算方式を指定して作成
    pub fn with_similarity(config: MatchConfig, similarity: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, similarity })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// 最も一致する候補を探す
    ///
    /// クエリが空（正規化で何も残らない）または候補が空なら
    /// スコア0の「該当なし」を返す。
    pub fn find_best(&self, query: &str, candidates: &[EventRecord]) -> MatchResult {
        let prepared = PreparedQuery::new(query);
        if prepared.is_empty() || candidates.is_empty() {
            return MatchResult::no_match();
        }

        let mut ranking: Vec<RankedCandidate> = candidates
            .iter()
            .enumerate()
            .filter_map(|(position, record)| {
                let breakdown =
                    score_candidate(&self.similarity, &prepared, record, &self.config)?;
                Some(RankedCandidate {
                    position,
                    record: record.clone(),
                    score: breakdown.best(),
                    breakdown,
                })
            })
            .collect();

        // 安定ソートなので同点は入力順のまま
        ranking.sort_by(|a, b| b.score.cmp(&a.score));
        ranking.truncate(self.config.top_n);

        let score = ranking.first().map(|c| c.score).unwrap_or(0);
        let matched = ranking
            .first()
            .filter(|c| c.score > self.config.accept_threshold)
            .map(|c| c.record.clone());

        MatchResult {
            matched,
            score,
            ranking,
        }
    }
}

/// 1回限りの照合
///
/// 設定が不正な場合のみエラー。該当なしは `MatchResult::no_match` 相当の値で返す。
pub fn match_event(query: &str, candidates: &[EventRecord], config: &MatchConfig) -> Result<MatchResult> {
    let matcher = EventMatcher::new(config.clone())?;
    Ok(matcher.find_best(query, candidates))
}
