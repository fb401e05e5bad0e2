//! HTTP client for the jobboard server.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The `{code, message, data}` envelope every `/job` route answers with.
#[derive(Debug, serde::Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[allow(dead_code)]
    pub error_code: Option<String>,
}

/// HTTP client for the jobboard API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a route whose `data` must be present.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_optional(path, &[])
            .await?
            .ok_or_else(|| anyhow::anyhow!("API returned success but no data"))
    }

    /// GET a route whose `data` may legitimately be null.
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        Self::unwrap_envelope(resp, &url).await.map(|r| r.data)
    }

    /// POST a JSON body and return the whole envelope.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        Self::unwrap_envelope(resp, &url).await
    }

    /// Perform a raw GET request and return the full JSON value (for the health endpoint).
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Error envelopes carry a non-zero `code` and a readable `message`,
    /// whatever the HTTP status.
    async fn unwrap_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
        url: &str,
    ) -> Result<ApiResponse<T>> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read response from {}", url))?;

        let api_resp: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => anyhow::bail!("API error ({}): {}", status, body),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to parse response from {}", url));
            }
        };

        if api_resp.code != 0 || !status.is_success() {
            anyhow::bail!("API error ({}): {}", api_resp.code, api_resp.message);
        }

        Ok(api_resp)
    }
}
