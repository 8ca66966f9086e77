use super::{RecordFilter, RecordSource};
use crate::error::{CuratorError, Result};
use crate::storage::parse_base_url;
use async_trait::async_trait;
use event_curator_common::EventRecord;
use reqwest::Url;
use std::time::Duration;

/// PostgREST形式のテーブルAPI（`/rest/v1/<table>`）
pub struct RestSource {
    http_client: reqwest::Client,
    base_url: Url,
    table: String,
    api_key: String,
}

impl RestSource {
    pub fn new(base_url: &str, table: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            table: table.to_string(),
            api_key,
        })
    }

    fn table_url(&self) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["rest", "v1", self.table.as_str()]);
        }
        url
    }

    /// 一覧取得 `GET /rest/v1/<table>?select=*`
    pub fn list_url(&self) -> Url {
        let mut url = self.table_url();
        url.query_pairs_mut().append_pair("select", "*");
        url
    }

    /// 更新 `PATCH /rest/v1/<table>?id=eq.<id>`
    pub fn update_url(&self, id: &str) -> Url {
        let mut url = self.table_url();
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }
}

#[async_trait]
impl RecordSource for RestSource {
    async fn list_candidates(&self, filter: &RecordFilter) -> Result<Vec<EventRecord>> {
        let response = self.authorized(self.http_client.get(self.list_url())).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CuratorError::Records(format!("{}: {}", status, body)));
        }

        let records = parse_records(&body)?;
        tracing::debug!(table = %self.table, count = records.len(), "レコード取得");
        Ok(filter.apply(records))
    }

    async fn set_illustration_url(&self, id: &str, url: &str) -> Result<()> {
        let response = self
            .authorized(self.http_client.patch(self.update_url(id)))
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "illustration_url": url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CuratorError::Records(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}

/// レスポンス本文（JSON配列）をレコードに変換
pub fn parse_records(body: &str) -> Result<Vec<EventRecord>> {
    serde_json::from_str(body).map_err(|e| CuratorError::ApiParse(format!("レコード一覧: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> RestSource {
        RestSource::new(
            "https://example.supabase.co",
            "evenements",
            "test-key".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_list_url() {
        assert_eq!(
            source().list_url().as_str(),
            "https://example.supabase.co/rest/v1/evenements?select=*"
        );
    }

    #[test]
    fn test_update_url() {
        assert_eq!(
            source().update_url("42").as_str(),
            "https://example.supabase.co/rest/v1/evenements?id=eq.42"
        );
    }

    #[test]
    fn test_parse_records() {
        let body = r#"[{"id": 7, "titre": "Sacre de Charlemagne", "date": "0800-12-25", "mots_cles": null}]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records[0].id, "7");
        assert_eq!(records[0].date.as_deref(), Some("0800-12-25"));

        assert!(matches!(parse_records("{}"), Err(CuratorError::ApiParse(_))));
    }
}
