//! 外部知識ベースによるイベントの検証
//!
//! タイトルで候補を検索し、最も近いエンティティの年とレコードの年を比べる。
//! スコアは照合と同じく0-100、シグナルの最大値で集約する。

pub mod wikidata;

pub use wikidata::WikidataClient;

use crate::error::Result;
use async_trait::async_trait;
use event_curator_common::{canonicalize, parse_year, EventRecord, FuzzySimilarity, Similarity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 知識ベースのエンティティ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub label_fr: Option<String>,
    pub label_en: Option<String>,
    pub description_fr: Option<String>,
    pub description_en: Option<String>,
    /// 時点・開始・終了のいずれかの年
    pub year: Option<i32>,
}

impl Entity {
    pub fn label(&self) -> &str {
        self.label_fr
            .as_deref()
            .or(self.label_en.as_deref())
            .unwrap_or(&self.id)
    }
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// タイトルで検索し、エンティティIDを関連度順に返す
    async fn search(&self, title: &str, lang: &str) -> Result<Vec<String>>;

    async fn entity(&self, id: &str) -> Result<Option<Entity>>;

    /// 複数取得（IDの順を保つ）
    async fn entities(&self, ids: &[String]) -> Result<Vec<Entity>> {
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entity) = self.entity(id).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }
}

/// レコードとエンティティの近さ（0-100）
///
/// 原語タイトル↔フランス語ラベル、翻訳タイトル↔英語ラベル、
/// キーワード↔説明文（部分一致）のうち最大値。
pub fn score_entity<S: Similarity + ?Sized>(similarity: &S, record: &EventRecord, entity: &Entity) -> u8 {
    let ratio = |a: &str, b: Option<&str>| {
        b.map(|b| similarity.similarity(&canonicalize(a), &canonicalize(b)))
    };
    let partial = |keywords: &[String], text: Option<&str>| {
        let text = canonicalize(text?);
        keywords
            .iter()
            .map(|k| canonicalize(k))
            .filter(|k| !k.is_empty())
            .map(|k| similarity.partial_similarity(&k, &text))
            .max()
    };

    [
        ratio(record.title.as_str(), entity.label_fr.as_deref()),
        record
            .title_translated
            .as_deref()
            .and_then(|t| ratio(t, entity.label_en.as_deref())),
        partial(record.keywords.as_slice(), entity.description_fr.as_deref()),
        partial(record.keywords_translated.as_slice(), entity.description_en.as_deref()),
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(0)
}

/// 検証結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Validated {
        entity_id: String,
        score: u8,
        year: i32,
    },
    DateMismatch {
        entity_id: String,
        score: u8,
        record_year: Option<i32>,
        knowledge_year: i32,
    },
    NoKnowledgeDate {
        entity_id: String,
        score: u8,
    },
    WeakMatch {
        entity_id: String,
        label: String,
        score: u8,
    },
    NotFound,
    /// 知識ベースの取得に失敗
    Failed {
        error: String,
    },
}

impl ValidationOutcome {
    pub fn is_validated(&self) -> bool {
        matches!(self, ValidationOutcome::Validated { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            ValidationOutcome::Validated { entity_id, year, .. } => format!("一致 ({}, {}年)", entity_id, year),
            ValidationOutcome::DateMismatch {
                entity_id,
                record_year,
                knowledge_year,
                ..
            } => format!(
                "年が不一致: レコード {} / 知識ベース {} ({})",
                record_year.map(|y| y.to_string()).unwrap_or_else(|| "不明".into()),
                knowledge_year,
                entity_id
            ),
            ValidationOutcome::NoKnowledgeDate { entity_id, .. } => {
                format!("知識ベースに日付なし ({})", entity_id)
            }
            ValidationOutcome::WeakMatch { label, score, .. } => {
                format!("最良候補 '{}' (スコア {})", label, score)
            }
            ValidationOutcome::NotFound => "検索結果なし".into(),
            ValidationOutcome::Failed { error } => format!("取得に失敗: {}", error),
        }
    }
}

/// 最良エンティティから結果を判定
pub fn judge(record: &EventRecord, best: Option<(&Entity, u8)>, threshold: u8) -> ValidationOutcome {
    let Some((entity, score)) = best else {
        return ValidationOutcome::NotFound;
    };
    if score < threshold {
        return ValidationOutcome::WeakMatch {
            entity_id: entity.id.clone(),
            label: entity.label().to_string(),
            score,
        };
    }

    let Some(knowledge_year) = entity.year else {
        return ValidationOutcome::NoKnowledgeDate {
            entity_id: entity.id.clone(),
            score,
        };
    };
    let record_year = record.date.as_deref().and_then(parse_year);
    if record_year == Some(knowledge_year) {
        ValidationOutcome::Validated {
            entity_id: entity.id.clone(),
            score,
            year: knowledge_year,
        }
    } else {
        ValidationOutcome::DateMismatch {
            entity_id: entity.id.clone(),
            score,
            record_year,
            knowledge_year,
        }
    }
}

/// 最もスコアの高いエンティティ（同点は先のもの）
pub fn best_entity<'e, S: Similarity + ?Sized>(
    similarity: &S,
    record: &EventRecord,
    entities: &'e [Entity],
) -> Option<(&'e Entity, u8)> {
    entities
        .iter()
        .map(|e| (e, score_entity(similarity, record, e)))
        .fold(None, |best, (e, score)| match best {
            Some((_, s)) if s >= score => best,
            _ => Some((e, score)),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub record_id: String,
    pub title: String,
    pub date: Option<String>,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub entries: Vec<ValidationEntry>,
}

impl ValidationReport {
    pub fn validated(&self) -> impl Iterator<Item = &ValidationEntry> {
        self.entries.iter().filter(|e| e.outcome.is_validated())
    }

    pub fn inconsistent(&self) -> impl Iterator<Item = &ValidationEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_validated())
    }

    pub fn print(&self) {
        println!("\n検証レポート");
        println!("\n一致したイベント:");
        for entry in self.validated() {
            println!("  - {} ({})", entry.title, entry.date.as_deref().unwrap_or("日付なし"));
        }
        println!("\n不整合のあるイベント:");
        for entry in self.inconsistent() {
            println!(
                "  - {} ({}): {}",
                entry.title,
                entry.date.as_deref().unwrap_or("日付なし"),
                entry.outcome.describe()
            );
        }
        println!(
            "\n✔ 一致: {}件 / 不整合: {}件",
            self.validated().count(),
            self.inconsistent().count()
        );
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

pub struct Validator<'a> {
    knowledge_base: &'a dyn KnowledgeBase,
    similarity: FuzzySimilarity,
    threshold: u8,
    /// 採点する検索結果の上限
    max_candidates: usize,
}

impl<'a> Validator<'a> {
    pub fn new(knowledge_base: &'a dyn KnowledgeBase, threshold: u8) -> Self {
        Self {
            knowledge_base,
            similarity: FuzzySimilarity,
            threshold,
            max_candidates: 50,
        }
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    pub async fn validate_record(&self, record: &EventRecord) -> Result<ValidationOutcome> {
        let mut ids = self.knowledge_base.search(&record.title, "fr").await?;
        ids.truncate(self.max_candidates);
        if ids.is_empty() {
            return Ok(ValidationOutcome::NotFound);
        }

        let entities = self.knowledge_base.entities(&ids).await?;
        let best = best_entity(&self.similarity, record, &entities);
        tracing::debug!(
            record = %record.id,
            candidates = entities.len(),
            best = ?best.map(|(e, s)| (e.id.as_str(), s)),
            "検証候補"
        );
        Ok(judge(record, best, self.threshold))
    }

    /// 全レコードを検証。失敗したレコードも `Failed` として残す
    pub async fn validate_all(&self, records: &[EventRecord]) -> ValidationReport {
        let mut report = ValidationReport::default();
        for (i, record) in records.iter().enumerate() {
            println!("[{}/{}] {}", i + 1, records.len(), record.title);
            let outcome = match self.validate_record(record).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(record = %record.id, error = %e, "検証に失敗");
                    ValidationOutcome::Failed { error: e.to_string() }
                }
            };
            report.entries.push(ValidationEntry {
                record_id: record.id.clone(),
                title: record.title.clone(),
                date: record.date.clone(),
                outcome,
            });
        }
        report
    }
}
