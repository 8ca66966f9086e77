//! 照合の型定義
//!
//! - EventRecord: レコードソースから読み込むイベント（照合コアは読むだけ）
//! - MatchConfig: 照合モード・閾値などの設定
//! - MatchResult: 1回の照合結果（採用レコード・スコア・候補順位）

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// 歴史イベントのレコード
///
/// 元データベースのフランス語カラム名（`titre`, `mots_cles` など）も
/// エイリアスとして受け付ける。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    #[serde(default, alias = "titre", deserialize_with = "null_as_default")]
    pub title: String, // タイトル（原語）

    #[serde(default, alias = "titre_anglais", skip_serializing_if = "Option::is_none")]
    pub title_translated: Option<String>, // 翻訳タイトル

    #[serde(default, alias = "mots_cles", deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,

    #[serde(default, alias = "keywords_anglais", deserialize_with = "null_as_default")]
    pub keywords_translated: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>, // YYYY-MM-DD / YYYY / 負の年

    #[serde(default, alias = "epoque", skip_serializing_if = "Option::is_none")]
    pub era: Option<String>, // 時代

    #[serde(default, alias = "types_evenement", deserialize_with = "null_as_default")]
    pub event_types: Vec<String>, // イベント種別

    #[serde(default, alias = "pays", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration_url: Option<String>,
}

impl EventRecord {
    /// 最小限のレコードを作成
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// キーワードを設定
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// 日付を設定
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// 翻訳タイトルを設定
    pub fn with_translation(mut self, title: impl Into<String>) -> Self {
        self.title_translated = Some(title.into());
        self
    }

    /// 原語・翻訳のキーワードをまとめて列挙
    pub fn all_keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords
            .iter()
            .chain(self.keywords_translated.iter())
            .map(String::as_str)
    }

    /// 表示用タイトル（翻訳があれば併記）
    pub fn display_title(&self) -> String {
        match self.title_translated.as_deref() {
            Some(t) if !t.trim().is_empty() && t != self.title => format!("{} / {}", self.title, t),
            _ => self.title.clone(),
        }
    }
}

/// 照合モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// 文字列全体の類似度（タイトル・キーワード部分一致・日付）
    #[default]
    WholeString,
    /// 抽出キーワードの集合一致
    KeywordSet,
}

impl std::str::FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whole-string" | "whole" => Ok(MatchMode::WholeString),
            "keyword-set" | "keywords" => Ok(MatchMode::KeywordSet),
            _ => Err(Error::Config(format!(
                "不明な照合モード: {}（whole-string / keyword-set）",
                s
            ))),
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::WholeString => write!(f, "whole-string"),
            MatchMode::KeywordSet => write!(f, "keyword-set"),
        }
    }
}

/// 照合設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    pub mode: MatchMode,

    /// 採用閾値（0-100）。スコアがこれを**超えた**場合のみ採用
    pub accept_threshold: u8,

    /// 日付の一致をスコアに含める
    #[serde(default)]
    pub consider_date: bool,

    /// 返却する候補順位の件数
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// 部分一致に使うキーワードの最小文字数
    #[serde(default = "default_min_keyword_len")]
    pub min_keyword_len: usize,
}

fn default_top_n() -> usize {
    3
}

fn default_min_keyword_len() -> usize {
    3
}

impl MatchConfig {
    pub fn new(mode: MatchMode, accept_threshold: u8) -> Self {
        Self {
            mode,
            accept_threshold,
            consider_date: false,
            top_n: default_top_n(),
            min_keyword_len: default_min_keyword_len(),
        }
    }

    pub fn with_date(mut self, consider_date: bool) -> Self {
        self.consider_date = consider_date;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// 設定値を検証（呼び出し側のプログラミングミスは即エラー）
    pub fn validate(&self) -> Result<()> {
        if self.accept_threshold > 100 {
            return Err(Error::Config(format!(
                "閾値は0-100で指定してください: {}",
                self.accept_threshold
            )));
        }
        if self.top_n == 0 {
            return Err(Error::Config("top_nは1以上で指定してください".into()));
        }
        Ok(())
    }
}

/// シグナル別のスコア内訳
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    pub title: Option<u8>,
    pub title_translated: Option<u8>,
    pub keyword: Option<u8>,
    pub date: Option<u8>,
}

impl SubScores {
    /// 最大値で集約（弱いシグナルで強いシグナルを薄めない）
    pub fn best(&self) -> u8 {
        [self.title, self.title_translated, self.keyword, self.date]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(0)
    }
}

/// 順位付けされた候補
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    /// 入力候補列での位置
    pub position: usize,
    pub record: EventRecord,
    pub score: u8,
    pub breakdown: SubScores,
}

/// 照合結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// 採用されたレコード（閾値を超えなければNone）
    pub matched: Option<EventRecord>,
    /// 1位候補のスコア（不採用でも保持、候補なしは0）
    pub score: u8,
    /// スコア降順の候補（最大top_n件）
    pub ranking: Vec<RankedCandidate>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// IDは文字列・数値どちらでも受け付ける
fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("不正なID: {}", other))),
    }
}

/// nullを既定値として扱う（DBのNULLカラム対策）
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_deserialize_french_columns() {
        let json = r#"{
            "id": 42,
            "titre": "Découverte de la tombe de Toutânkhamon",
            "titre_anglais": "Discovery of Tutankhamun's tomb",
            "mots_cles": ["égypte", "pharaon"],
            "keywords_anglais": null,
            "date": "1922-11-04",
            "epoque": "Contemporaine",
            "types_evenement": ["Archéologie"],
            "pays": "Égypte"
        }"#;
        let record: EventRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.id, "42");
        assert_eq!(record.title, "Découverte de la tombe de Toutânkhamon");
        assert_eq!(record.keywords, vec!["égypte", "pharaon"]);
        assert!(record.keywords_translated.is_empty());
        assert_eq!(record.era.as_deref(), Some("Contemporaine"));
        assert_eq!(record.event_types, vec!["Archéologie"]);
    }

    #[test]
    fn test_event_record_null_title() {
        let json = r#"{"id": "a1", "titre": null, "mots_cles": null}"#;
        let record: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.title, "");
        assert!(record.keywords.is_empty());
    }

    #[test]
    fn test_event_record_invalid_id() {
        let json = r#"{"id": [1, 2], "title": "x"}"#;
        assert!(serde_json::from_str::<EventRecord>(json).is_err());
    }

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("whole-string".parse::<MatchMode>().unwrap(), MatchMode::WholeString);
        assert_eq!("KEYWORD-SET".parse::<MatchMode>().unwrap(), MatchMode::KeywordSet);
        assert!(matches!("fuzzy".parse::<MatchMode>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_match_config_validate() {
        assert!(MatchConfig::new(MatchMode::WholeString, 60).validate().is_ok());
        assert!(MatchConfig::new(MatchMode::WholeString, 100).validate().is_ok());
        assert!(MatchConfig::new(MatchMode::WholeString, 101).validate().is_err());
        assert!(MatchConfig::new(MatchMode::KeywordSet, 20).with_top_n(0).validate().is_err());
    }

    #[test]
    fn test_match_config_deserialize_defaults() {
        let config: MatchConfig =
            serde_json::from_str(r#"{"mode": "keyword-set", "acceptThreshold": 20}"#).unwrap();
        assert_eq!(config.mode, MatchMode::KeywordSet);
        assert!(!config.consider_date);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.min_keyword_len, 3);
    }

    #[test]
    fn test_sub_scores_best() {
        let scores = SubScores {
            title: Some(12),
            title_translated: None,
            keyword: Some(100),
            date: Some(40),
        };
        assert_eq!(scores.best(), 100);
        assert_eq!(SubScores::default().best(), 0);
    }

    #[test]
    fn test_display_title() {
        let record = EventRecord::new("1", "Prise de la Bastille").with_translation("Storming of the Bastille");
        assert_eq!(record.display_title(), "Prise de la Bastille / Storming of the Bastille");
        assert_eq!(EventRecord::new("2", "Verdun").display_title(), "Verdun");
    }
}
