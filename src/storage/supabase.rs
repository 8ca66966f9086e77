use super::{ObjectStore, StorageError};
use crate::error::{CuratorError, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

/// Supabase Storage
pub struct SupabaseStore {
    http_client: reqwest::Client,
    base_url: Url,
    bucket: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, bucket: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            bucket: bucket.to_string(),
            api_key,
        })
    }

    /// アップロード先 `/storage/v1/object/<bucket>/<key>`
    pub fn upload_url(&self, key: &str) -> Url {
        self.object_url(&["storage", "v1", "object"], key)
    }

    /// 公開URL `/storage/v1/object/public/<bucket>/<key>`
    pub fn public_url(&self, key: &str) -> Url {
        self.object_url(&["storage", "v1", "object", "public"], key)
    }

    fn object_url(&self, prefix: &[&str], key: &str) -> Url {
        let mut url = self.base_url.clone();
        // parse_base_urlで階層URLであることを確認済み
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(prefix)
                .push(&self.bucket)
                .extend(key.split('/').filter(|s| !s.is_empty()));
        }
        url
    }
}

/// RESTエンドポイントの基底URLを検証
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url.trim_end_matches('/'))
        .map_err(|e| CuratorError::Config(format!("不正なURL: {} ({})", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(CuratorError::Config(format!("不正なURL: {}", base_url)));
    }
    Ok(url)
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> std::result::Result<String, StorageError> {
        let size = bytes.len();
        let response = self
            .http_client
            .post(self.upload_url(key))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_status(status.as_u16(), body));
        }

        tracing::debug!(key, size, "アップロード完了");
        Ok(self.public_url(key).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SupabaseStore {
        SupabaseStore::new(
            "https://example.supabase.co/",
            "evenements-image",
            "test-key".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_upload_url() {
        assert_eq!(
            store().upload_url("1066-10-14_bataille.jpg").as_str(),
            "https://example.supabase.co/storage/v1/object/evenements-image/1066-10-14_bataille.jpg"
        );
    }

    #[test]
    fn test_public_url_encodes_segments() {
        assert_eq!(
            store().public_url("images/prise de la bastille.jpg").as_str(),
            "https://example.supabase.co/storage/v1/object/public/evenements-image/images/prise%20de%20la%20bastille.jpg"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SupabaseStore::new("not a url", "b", "k".into(), Duration::from_secs(5));
        assert!(matches!(result, Err(CuratorError::Config(_))));
    }
}
