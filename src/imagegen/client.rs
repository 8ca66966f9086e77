//! 画像生成APIクライアント（OpenAI互換の `/v1/images/generations`）

use super::rate_limit::RateLimiter;
use super::ImageGenerator;
use crate::config::Config;
use crate::error::{CuratorError, Result};
use crate::storage::parse_base_url;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::RETRY_AFTER;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/images/generations";

/// Retry-Afterがない429の待ち時間（秒）
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 失敗したリクエストの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    /// 再試行できるが回数の上限に達した
    Exhausted,
    /// 再試行しても解決しない
    Fatal,
}

/// ステータス（Noneは通信エラー）と試行回数から次の動作を決める
///
/// 試行回数は `delays` の長さまで。429は Retry-After（なければ60秒）待つ。
pub fn retry_decision(status: Option<u16>, retry_after: Option<&str>, attempt: usize, delays: &[u64]) -> RetryDecision {
    let retryable = match status {
        None => true,
        Some(429) => true,
        Some(s) => (500..600).contains(&s),
    };
    if !retryable {
        return RetryDecision::Fatal;
    }
    if attempt >= delays.len() {
        return RetryDecision::Exhausted;
    }

    let secs = if status == Some(429) {
        retry_after
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    } else {
        delays[attempt]
    };
    RetryDecision::Retry(Duration::from_secs(secs))
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
}

/// `b64_json` 形式のレスポンスから画像バイト列を取り出す
pub fn decode_image_response(body: &str) -> Result<Vec<u8>> {
    let response: GenerationResponse =
        serde_json::from_str(body).map_err(|e| CuratorError::ApiParse(e.to_string()))?;
    let encoded = response
        .data
        .into_iter()
        .find_map(|d| d.b64_json)
        .ok_or_else(|| CuratorError::ApiParse("画像データがありません".into()))?;

    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| CuratorError::ApiParse(format!("base64デコードに失敗: {}", e)))
}

pub struct ImageClient {
    http_client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    size: String,
    retry_delays: Vec<u64>,
    rate_limiter: RateLimiter,
}

impl ImageClient {
    pub fn new(api_key: String, config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: parse_base_url(DEFAULT_ENDPOINT)?,
            api_key,
            model: config.image_model.clone(),
            size: config.image_size.clone(),
            retry_delays: config.retry_delays.clone(),
            rate_limiter: RateLimiter::per_minute(config.requests_per_minute),
        })
    }

    /// 互換APIのエンドポイントを指定
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.endpoint = parse_base_url(endpoint)?;
        Ok(self)
    }

    pub fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": self.size,
            "response_format": "b64_json",
        })
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            self.rate_limiter.acquire().await;

            let (status, retry_after, message) = match self
                .http_client
                .post(self.endpoint.clone())
                .bearer_auth(&self.api_key)
                .json(&self.request_body(prompt))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await?;
                    if attempt > 0 {
                        tracing::debug!(attempt, "再試行後に生成成功");
                    }
                    return decode_image_response(&body);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    let body = response.text().await.unwrap_or_default();
                    (Some(status), retry_after, format!("({}) {}", status, body))
                }
                Err(e) => (None, None, e.to_string()),
            };

            match retry_decision(status, retry_after.as_deref(), attempt, &self.retry_delays) {
                RetryDecision::Retry(wait) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        wait_secs = wait.as_secs(),
                        error = %message,
                        "画像生成に失敗、再試行します"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                RetryDecision::Exhausted => {
                    return Err(CuratorError::RetryExhausted(format!("{}回: {}", attempt + 1, message)))
                }
                RetryDecision::Fatal => return Err(CuratorError::ApiCall(message)),
            }
        }
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        self.generate_with_retry(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAYS: [u64; 5] = [1, 2, 4, 8, 16];

    #[test]
    fn test_retry_server_error_follows_schedule() {
        assert_eq!(retry_decision(Some(503), None, 0, &DELAYS), RetryDecision::Retry(Duration::from_secs(1)));
        assert_eq!(retry_decision(Some(500), None, 3, &DELAYS), RetryDecision::Retry(Duration::from_secs(8)));
        assert_eq!(retry_decision(None, None, 4, &DELAYS), RetryDecision::Retry(Duration::from_secs(16)));
        assert_eq!(retry_decision(Some(502), None, 5, &DELAYS), RetryDecision::Exhausted);
    }

    #[test]
    fn test_retry_rate_limited_uses_retry_after() {
        assert_eq!(retry_decision(Some(429), Some("7"), 0, &DELAYS), RetryDecision::Retry(Duration::from_secs(7)));
        assert_eq!(retry_decision(Some(429), None, 1, &DELAYS), RetryDecision::Retry(Duration::from_secs(60)));
        assert_eq!(
            retry_decision(Some(429), Some("Wed, 21 Oct 2026 07:28:00 GMT"), 1, &DELAYS),
            RetryDecision::Retry(Duration::from_secs(60))
        );
        assert_eq!(retry_decision(Some(429), Some("7"), 5, &DELAYS), RetryDecision::Exhausted);
    }

    #[test]
    fn test_client_errors_are_fatal() {
        assert_eq!(retry_decision(Some(400), None, 0, &DELAYS), RetryDecision::Fatal);
        assert_eq!(retry_decision(Some(401), None, 0, &DELAYS), RetryDecision::Fatal);
    }

    #[test]
    fn test_decode_image_response() {
        let body = r#"{"created": 1, "data": [{"b64_json": "aGVsbG8=", "revised_prompt": "x"}]}"#;
        assert_eq!(decode_image_response(body).unwrap(), b"hello");
    }

    #[test]
    fn test_decode_image_response_errors() {
        assert!(matches!(decode_image_response(r#"{"data": []}"#), Err(CuratorError::ApiParse(_))));
        assert!(matches!(decode_image_response("not json"), Err(CuratorError::ApiParse(_))));
        assert!(matches!(
            decode_image_response(r#"{"data": [{"b64_json": "!!!"}]}"#),
            Err(CuratorError::ApiParse(_))
        ));
    }

    #[test]
    fn test_request_body() {
        let client = ImageClient::new("test-key".into(), &Config::default()).unwrap();
        let body = client.request_body("Historical scene");
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["size"], "1024x1024");
        assert_eq!(body["response_format"], "b64_json");
        assert_eq!(body["n"], 1);
    }
}
