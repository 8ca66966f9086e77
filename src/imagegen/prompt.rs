//! 画像生成プロンプト
//!
//! 生成APIのコンテンツポリシーに触れやすい語を含むイベントは、
//! カテゴリごとに表現を和らげる一節を追加する。

use event_curator_common::EventRecord;
use serde::{Deserialize, Serialize};

/// 配慮が必要な語のカテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitiveCategory {
    Violence,
    Politics,
    Controversy,
}

impl SensitiveCategory {
    pub const ALL: [SensitiveCategory; 3] = [
        SensitiveCategory::Violence,
        SensitiveCategory::Politics,
        SensitiveCategory::Controversy,
    ];

    pub fn terms(self) -> &'static [&'static str] {
        match self {
            SensitiveCategory::Violence => &["guerre", "bataille", "mort", "tuer", "assassinat"],
            SensitiveCategory::Politics => &["exécution", "génocide", "dictateur"],
            SensitiveCategory::Controversy => &["terrorisme", "attentat", "massacre"],
        }
    }

    pub fn adaptation(self) -> &'static str {
        match self {
            SensitiveCategory::Violence => "showing the aftermath and historical significance",
            SensitiveCategory::Politics => "focusing on the architectural and cultural context",
            SensitiveCategory::Controversy => "depicting the historical setting and symbolic representation",
        }
    }
}

/// カテゴリと該当した語
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentIssue {
    pub category: SensitiveCategory,
    pub terms: Vec<String>,
}

/// タイトルと説明から配慮が必要な語を探す
pub fn check_content_policy(record: &EventRecord) -> Vec<ContentIssue> {
    let text = format!(
        "{} {}",
        record.title,
        record.description.as_deref().unwrap_or("")
    )
    .to_lowercase();

    SensitiveCategory::ALL
        .iter()
        .filter_map(|&category| {
            let terms: Vec<String> = category
                .terms()
                .iter()
                .filter(|t| text.contains(*t))
                .map(|t| t.to_string())
                .collect();
            (!terms.is_empty()).then_some(ContentIssue { category, terms })
        })
        .collect()
}

pub fn build_prompt(record: &EventRecord, issues: &[ContentIssue]) -> String {
    let subject = record
        .title_translated
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&record.title);

    let mut prompt = format!("Historical scene depicting {}", subject);
    if let Some(era) = record.era.as_deref().filter(|e| !e.trim().is_empty()) {
        prompt.push_str(&format!(" in {} era", era));
    }
    // 主題の一文はここで閉じる
    prompt.push_str(". ");
    if !record.event_types.is_empty() {
        prompt.push_str(&format!("{} scene, ", record.event_types.join(", ")));
    }
    for issue in issues {
        prompt.push_str(issue.category.adaptation());
        prompt.push_str(", ");
    }
    prompt.push_str("Detailed and historically accurate representation. No text in the image.");
    prompt
}
