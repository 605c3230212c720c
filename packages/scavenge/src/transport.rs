//! Production HTTP transport backed by reqwest.

use async_trait::async_trait;

use crate::config::FetchPolicy;
use crate::error::{FetchError, FetchResult, Result, ScavengeError};
use crate::traits::{HttpPage, PageTransport};

/// `PageTransport` over a shared reqwest client.
///
/// Redirects are followed (reqwest's default of up to 10) and the
/// post-redirect URL is reported as `final_url`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client from the fetch policy's timeout and user-agent.
    pub fn new(policy: &FetchPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(policy.request_timeout)
            .user_agent(policy.user_agent.clone())
            .build()
            .map_err(|e| ScavengeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn classify(url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport(Box::new(error))
        }
    }
}

#[async_trait]
impl PageTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> FetchResult<HttpPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Self::classify(url, e))?;

        Ok(HttpPage {
            final_url,
            status,
            body,
        })
    }
}
