//! Wikidata API（`wbsearchentities` / `wbgetentities`）

use super::{Entity, KnowledgeBase};
use crate::error::{CuratorError, Result};
use crate::storage::parse_base_url;
use async_trait::async_trait;
use event_curator_common::parse_year;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://www.wikidata.org/w/api.php";

const USER_AGENT: &str = concat!("event-curator/", env!("CARGO_PKG_VERSION"));

/// 検索結果の上限
const SEARCH_LIMIT: usize = 50;

/// 年を読むプロパティ（時点・開始時点・終了時点）
const DATE_PROPERTIES: [&str; 3] = ["P585", "P580", "P582"];

pub struct WikidataClient {
    http_client: reqwest::Client,
    api_url: Url,
}

impl WikidataClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_url: parse_base_url(DEFAULT_API_URL)?,
        })
    }

    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        self.api_url = parse_base_url(api_url)?;
        Ok(self)
    }

    pub fn search_url(&self, title: &str, lang: &str) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "wbsearchentities")
            .append_pair("format", "json")
            .append_pair("language", lang)
            .append_pair("type", "item")
            .append_pair("search", title)
            .append_pair("limit", &SEARCH_LIMIT.to_string());
        url
    }

    pub fn entities_url(&self, ids: &[String]) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("action", "wbgetentities")
            .append_pair("format", "json")
            .append_pair("ids", &ids.join("|"))
            .append_pair("languages", "fr|en")
            .append_pair("props", "labels|claims|descriptions");
        url
    }

    async fn get(&self, url: Url) -> Result<String> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CuratorError::ApiCall(format!("Wikidata ({}): {}", status.as_u16(), body)));
        }
        Ok(body)
    }
}

#[async_trait]
impl KnowledgeBase for WikidataClient {
    async fn search(&self, title: &str, lang: &str) -> Result<Vec<String>> {
        if title.trim().is_empty() {
            return Ok(Vec::new());
        }
        let body = self.get(self.search_url(title, lang)).await?;
        parse_search(&body)
    }

    async fn entity(&self, id: &str) -> Result<Option<Entity>> {
        let ids = [id.to_string()];
        Ok(self.entities(&ids).await?.into_iter().next())
    }

    async fn entities(&self, ids: &[String]) -> Result<Vec<Entity>> {
        let mut entities = Vec::with_capacity(ids.len());
        // wbgetentitiesは1回50件まで
        for chunk in ids.chunks(SEARCH_LIMIT) {
            let body = self.get(self.entities_url(chunk)).await?;
            let mut by_id: HashMap<String, Entity> =
                parse_entities(&body)?.into_iter().map(|e| (e.id.clone(), e)).collect();
            entities.extend(chunk.iter().filter_map(|id| by_id.remove(id)));
        }
        Ok(entities)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

pub fn parse_search(body: &str) -> Result<Vec<String>> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| CuratorError::ApiParse(e.to_string()))?;
    Ok(response.search.into_iter().map(|hit| hit.id).collect())
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    id: Option<String>,
    /// 存在しないIDには "missing" が付く
    #[serde(default)]
    missing: Option<serde_json::Value>,
    #[serde(default)]
    labels: HashMap<String, LangValue>,
    #[serde(default)]
    descriptions: HashMap<String, LangValue>,
    #[serde(default)]
    claims: HashMap<String, Vec<Claim>>,
}

#[derive(Debug, Deserialize)]
struct LangValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Claim {
    mainsnak: Snak,
}

#[derive(Debug, Deserialize)]
struct Snak {
    #[serde(default)]
    datavalue: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    value: serde_json::Value,
}

impl RawEntity {
    /// 最初に見つかった時刻クレームの年
    fn claim_year(&self) -> Option<i32> {
        DATE_PROPERTIES.iter().find_map(|prop| {
            self.claims
                .get(*prop)?
                .first()?
                .mainsnak
                .datavalue
                .as_ref()?
                .value
                .get("time")?
                .as_str()
                .and_then(parse_year)
        })
    }

    fn into_entity(mut self, key: String) -> Entity {
        let year = self.claim_year();
        Entity {
            id: self.id.take().unwrap_or(key),
            label_fr: self.labels.remove("fr").map(|v| v.value),
            label_en: self.labels.remove("en").map(|v| v.value),
            description_fr: self.descriptions.remove("fr").map(|v| v.value),
            description_en: self.descriptions.remove("en").map(|v| v.value),
            year,
        }
    }
}

/// 順序はID順。呼び出し側で並べ直す
pub fn parse_entities(body: &str) -> Result<Vec<Entity>> {
    let response: EntitiesResponse =
        serde_json::from_str(body).map_err(|e| CuratorError::ApiParse(e.to_string()))?;
    let mut entities: Vec<Entity> = response
        .entities
        .into_iter()
        .filter(|(_, raw)| raw.missing.is_none())
        .map(|(key, raw)| raw.into_entity(key))
        .collect();
    entities.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITIES: &str = r#"{
        "entities": {
            "Q83224": {
                "id": "Q83224",
                "labels": {
                    "fr": {"language": "fr", "value": "bataille d'Hastings"},
                    "en": {"language": "en", "value": "Battle of Hastings"}
                },
                "descriptions": {
                    "fr": {"language": "fr", "value": "bataille de 1066 en Angleterre"}
                },
                "claims": {
                    "P31": [{"mainsnak": {"snaktype": "value", "datavalue": {"value": {"id": "Q178561"}, "type": "wikibase-entityid"}}}],
                    "P585": [{"mainsnak": {"snaktype": "value", "datavalue": {"value": {"time": "+1066-10-14T00:00:00Z", "precision": 11}, "type": "time"}}}]
                }
            },
            "Q2": {
                "id": "Q2",
                "labels": {"fr": {"language": "fr", "value": "guerre des Gaules"}},
                "claims": {
                    "P585": [{"mainsnak": {"snaktype": "somevalue"}}],
                    "P580": [{"mainsnak": {"snaktype": "value", "datavalue": {"value": {"time": "-0058-00-00T00:00:00Z"}, "type": "time"}}}]
                }
            },
            "Q999999999": {"id": "Q999999999", "missing": ""}
        }
    }"#;

    fn client() -> WikidataClient {
        WikidataClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_search_url() {
        let url = client().search_url("Bataille d'Hastings", "fr");
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/w/api.php");
        assert_eq!(pairs["action"], "wbsearchentities");
        assert_eq!(pairs["search"], "Bataille d'Hastings");
        assert_eq!(pairs["language"], "fr");
        assert_eq!(pairs["limit"], "50");
    }

    #[test]
    fn test_entities_url() {
        let url = client().entities_url(&["Q1".to_string(), "Q2".to_string()]);
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["ids"], "Q1|Q2");
        assert_eq!(pairs["props"], "labels|claims|descriptions");
    }

    #[test]
    fn test_parse_search() {
        let body = r#"{"searchinfo": {"search": "x"}, "search": [{"id": "Q83224", "label": "x"}, {"id": "Q2"}], "success": 1}"#;
        assert_eq!(parse_search(body).unwrap(), vec!["Q83224", "Q2"]);
        assert!(parse_search(r#"{"success": 1}"#).unwrap().is_empty());
        assert!(matches!(parse_search("<html>"), Err(CuratorError::ApiParse(_))));
    }

    #[test]
    fn test_parse_entities() {
        let entities = parse_entities(ENTITIES).unwrap();
        assert_eq!(entities.len(), 2);

        let hastings = entities.iter().find(|e| e.id == "Q83224").unwrap();
        assert_eq!(hastings.label_fr.as_deref(), Some("bataille d'Hastings"));
        assert_eq!(hastings.label_en.as_deref(), Some("Battle of Hastings"));
        assert_eq!(hastings.description_en, None);
        assert_eq!(hastings.year, Some(1066));

        // P585に値がなければP580を読む
        let gaul = entities.iter().find(|e| e.id == "Q2").unwrap();
        assert_eq!(gaul.year, Some(-58));
    }
}
