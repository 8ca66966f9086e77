//! 候補1件のスコア算出
//!
//! クエリは照合1回につき1度だけ前処理（`PreparedQuery`）し、
//! 候補ごとにシグナル別のスコアを `SubScores` として返す。

use crate::keywords::extract_keywords;
use crate::normalize::{canonicalize, normalize_query, tokens};
use crate::similarity::Similarity;
use crate::types::{EventRecord, MatchConfig, MatchMode, SubScores};

/// 日付トークンとみなす数字列の最小桁数
const MIN_DATE_DIGITS: usize = 3;

/// 前処理済みクエリ
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    normalized: String,
    terms: String,
    date_tokens: Vec<String>,
}

impl PreparedQuery {
    pub fn new(raw: &str) -> Self {
        let normalized = normalize_query(raw);
        let terms = extract_keywords(&normalized).join(" ");
        let date_tokens = digit_tokens(&normalized);
        Self {
            normalized,
            terms,
            date_tokens,
        }
    }

    /// 正規形
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// 抽出キーワード（空白区切り）
    pub fn terms(&self) -> &str {
        &self.terms
    }

    /// 有効なシグナルがない（正規化で空になった）
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// タイトル・翻訳タイトル・キーワードのいずれかが空でなければ照合対象
pub fn has_usable_signal(record: &EventRecord) -> bool {
    !canonicalize(&record.title).is_empty()
        || record
            .title_translated
            .as_deref()
            .is_some_and(|t| !canonicalize(t).is_empty())
        || record.all_keywords().any(|k| !canonicalize(k).is_empty())
}

/// 候補1件を採点する。照合対象にならないレコードはNone
pub fn score_candidate<S: Similarity + ?Sized>(
    similarity: &S,
    query: &PreparedQuery,
    record: &EventRecord,
    config: &MatchConfig,
) -> Option<SubScores> {
    if !has_usable_signal(record) {
        return None;
    }

    let mut scores = match config.mode {
        MatchMode::WholeString => score_whole_string(similarity, query, record, config),
        MatchMode::KeywordSet => score_keyword_set(similarity, query, record),
    };

    if config.consider_date {
        scores.date = record
            .date
            .as_deref()
            .and_then(|date| score_date(similarity, query, date));
    }

    Some(scores)
}

fn score_whole_string<S: Similarity + ?Sized>(
    similarity: &S,
    query: &PreparedQuery,
    record: &EventRecord,
    config: &MatchConfig,
) -> SubScores {
    let q = query.normalized();
    let title_score = |title: &str| {
        let title = canonicalize(title);
        if title.is_empty() {
            None
        } else {
            Some(
                similarity
                    .similarity(q, &title)
                    .max(similarity.token_sort_similarity(q, &title)),
            )
        }
    };

    // 短すぎるキーワードはどの文字列にも部分一致しやすいので除外
    let keyword = record
        .all_keywords()
        .map(canonicalize)
        .filter(|k| k.len() >= config.min_keyword_len)
        .map(|k| similarity.partial_similarity(&k, q))
        .max();

    SubScores {
        title: title_score(&record.title),
        title_translated: record.title_translated.as_deref().and_then(title_score),
        keyword,
        date: None,
    }
}

fn score_keyword_set<S: Similarity + ?Sized>(
    similarity: &S,
    query: &PreparedQuery,
    record: &EventRecord,
) -> SubScores {
    let terms_of = |text: &str| extract_keywords(&canonicalize(text)).join(" ");
    let set_score = |text: &str| {
        if canonicalize(text).is_empty() {
            None
        } else {
            Some(similarity.token_set_similarity(query.terms(), &terms_of(text)))
        }
    };

    let keyword_terms: Vec<String> = record
        .all_keywords()
        .map(terms_of)
        .filter(|t| !t.is_empty())
        .collect();
    let keyword = if record.all_keywords().next().is_none() {
        None
    } else {
        Some(similarity.token_set_similarity(query.terms(), &keyword_terms.join(" ")))
    };

    SubScores {
        title: set_score(&record.title),
        title_translated: record.title_translated.as_deref().and_then(set_score),
        keyword,
        date: None,
    }
}

/// クエリに3桁以上の数字列があるときだけ日付を比較する
fn score_date<S: Similarity + ?Sized>(
    similarity: &S,
    query: &PreparedQuery,
    date: &str,
) -> Option<u8> {
    if query.date_tokens.is_empty() {
        return None;
    }
    let date = canonicalize(date);
    if date.is_empty() {
        return None;
    }

    let record_tokens = digit_tokens(&date);
    let best_token = query
        .date_tokens
        .iter()
        .flat_map(|q| record_tokens.iter().map(move |d| similarity.similarity(q, d)))
        .max()
        .unwrap_or(0);

    Some(
        similarity
            .partial_similarity(&date, query.normalized())
            .max(best_token),
    )
}

fn digit_tokens(normalized: &str) -> Vec<String> {
    tokens(normalized)
        .filter(|t| t.len() >= MIN_DATE_DIGITS && t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::FuzzySimilarity;

    fn whole() -> MatchConfig {
        MatchConfig::new(MatchMode::WholeString, 60)
    }

    #[test]
    fn test_prepared_query() {
        let q = PreparedQuery::new("The_Pharaohs_of_Egypt_1922.jpg");
        assert_eq!(q.normalized(), "the_pharaohs_of_egypt_1922");
        assert_eq!(q.terms(), "pharaoh egypt");
        assert!(!q.is_empty());
        assert!(PreparedQuery::new("---.png").is_empty());
    }

    #[test]
    fn test_has_usable_signal() {
        assert!(has_usable_signal(&EventRecord::new("1", "Verdun")));
        assert!(has_usable_signal(&EventRecord::new("2", "").with_keywords(["Verdun"])));
        assert!(!has_usable_signal(&EventRecord::new("3", "  ").with_keywords(["--"])));
    }

    #[test]
    fn test_score_title_word_order() {
        let record = EventRecord::new("1", "Découverte de la tombe de Toutânkhamon");
        let query = PreparedQuery::new("toutankhamon_decouverte_tombe");
        let scores = score_candidate(&FuzzySimilarity, &query, &record, &whole()).unwrap();
        assert_eq!(scores.title, Some(76));
        assert_eq!(scores.keyword, None);
        assert_eq!(scores.best(), 76);
    }

    #[test]
    fn test_score_short_keywords_ignored() {
        let record = EventRecord::new("1", "Verdun").with_keywords(["ww", "1916"]);
        let query = PreparedQuery::new("wwi_1916_trench");
        let scores = score_candidate(&FuzzySimilarity, &query, &record, &whole()).unwrap();
        // "ww" は最小文字数未満なので "1916" のみ評価
        assert_eq!(scores.keyword, Some(100));
    }

    #[test]
    fn test_score_date_only_when_enabled() {
        let record = EventRecord::new("1", "Bataille d'Hastings").with_date("1066-10-14");
        let query = PreparedQuery::new("hastings_1066");

        let off = score_candidate(&FuzzySimilarity, &query, &record, &whole()).unwrap();
        assert_eq!(off.date, None);
        assert_eq!(off.best(), 47);

        let on = score_candidate(&FuzzySimilarity, &query, &record, &whole().with_date(true)).unwrap();
        assert_eq!(on.date, Some(100));
    }

    #[test]
    fn test_score_date_requires_digit_token() {
        let record = EventRecord::new("1", "Bataille d'Hastings").with_date("1066-10-14");
        let query = PreparedQuery::new("battle_of_hastings");
        let scores = score_candidate(&FuzzySimilarity, &query, &record, &whole().with_date(true)).unwrap();
        assert_eq!(scores.date, None);
    }

    #[test]
    fn test_score_keyword_set() {
        let config = MatchConfig::new(MatchMode::KeywordSet, 20);
        let query = PreparedQuery::new("egypt_tomb_pharaoh");
        let record = EventRecord::new("1", "").with_keywords(["egypt", "pharaoh", "gold"]);
        let scores = score_candidate(&FuzzySimilarity, &query, &record, &config).unwrap();
        assert_eq!(scores.title, None);
        assert_eq!(scores.keyword, Some(83));
    }

    #[test]
    fn test_score_ineligible_record() {
        let record = EventRecord::new("1", "");
        let query = PreparedQuery::new("anything");
        assert!(score_candidate(&FuzzySimilarity, &query, &record, &whole()).is_none());
    }
}
