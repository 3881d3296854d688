use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Endpoint, FetchError, ReadingSource};

pub const DEFAULT_API_BASE: &str = "https://api.data.gov.sg/v1/environment";

/// Client for the NEA environment API: one GET per endpoint, same timeout for each.
#[derive(Debug, Clone)]
pub struct NeaClient {
    base_url: String,
    http: Client,
}

impl NeaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shoresquad/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.as_str())
    }
}

#[async_trait]
impl ReadingSource for NeaClient {
    async fn fetch(&self, endpoint: Endpoint) -> Result<serde_json::Value, FetchError> {
        let classify = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout { endpoint }
            } else {
                FetchError::Network { endpoint, source }
            }
        };

        let res = self.http.get(self.url_for(endpoint)).send().await.map_err(classify)?;

        let status = res.status();
        let body = res.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Malformed { endpoint, source })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
