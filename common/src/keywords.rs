//! キーワード抽出
//!
//! 正規形の文字列から内容語だけを取り出す。
//! ストップワード（英語・フランス語）と数字を含む語を除外し、
//! 複数形を単数形に寄せてから最小文字数未満の語を捨てる。

use crate::normalize::tokens;
use std::collections::HashMap;

/// 抽出するキーワードの最小文字数
pub const MIN_TERM_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    // 英語
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "but", "by", "can", "did", "during", "for", "from", "had", "has", "have", "her",
    "his", "how", "image", "img", "in", "into", "is", "it", "its", "not", "of", "on", "or",
    "our", "over", "photo", "picture", "scene", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "those", "to", "under", "was", "were", "what", "when",
    "where", "which", "while", "who", "will", "with", "would", "your",
    // フランス語
    "au", "aux", "avec", "ce", "ces", "cette", "chez", "comme", "dans", "de", "des", "du",
    "elle", "en", "entre", "est", "et", "il", "la", "le", "les", "leur", "leurs", "lors",
    "mais", "ne", "par", "pas", "plus", "pour", "qui", "que", "sans", "ses", "son", "sont",
    "sous", "sur", "un", "une", "vers",
];

/// ストップワード判定
pub fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(&term)
}

/// 語を基本形に寄せる（複数形の規則的な語尾のみ）
pub fn lemmatize(term: &str) -> String {
    let len = term.chars().count();

    if len > 4 && term.ends_with("ies") {
        return format!("{}y", &term[..term.len() - 3]);
    }
    // chevaux → cheval
    if len > 4 && term.ends_with("aux") {
        return format!("{}al", &term[..term.len() - 3]);
    }
    if len > 4 && ["sses", "shes", "ches", "xes"].iter().any(|s| term.ends_with(s)) {
        return term[..term.len() - 2].to_string();
    }
    if len > 3 && term.ends_with('s') && !["ss", "us", "is"].iter().any(|s| term.ends_with(s)) {
        return term[..term.len() - 1].to_string();
    }

    term.to_string()
}

/// 正規形の文字列からキーワード列を抽出する
///
/// 順序は出現順。元の文字列で同じ語が繰り返されていれば重複も残す。
/// 基本形に寄せた結果だけが重なる場合（tomb / tombs）は最初の1件のみ。
pub fn extract_keywords(normalized: &str) -> Vec<String> {
    // 基本形ごとに、これまでに出た元の綴り
    let mut seen: HashMap<String, Vec<&str>> = HashMap::new();
    let mut keywords = Vec::new();

    for raw in tokens(normalized)
        .filter(|t| t.chars().all(|c| c.is_ascii_alphabetic()))
        .filter(|t| !is_stop_word(t))
    {
        let lemma = lemmatize(raw);
        if lemma.len() < MIN_TERM_LEN {
            continue;
        }
        let spellings = seen.entry(lemma.clone()).or_default();
        if !spellings.is_empty() && !spellings.contains(&raw) {
            continue;
        }
        spellings.push(raw);
        keywords.push(lemma);
    }

    keywords
}
