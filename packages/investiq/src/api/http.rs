//! HTTP client with per-request timeouts

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::HttpSettings;
use crate::{FeedError, Result};

/// Thin wrapper over reqwest shared by all providers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            timeout: settings.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and fail on any non-success status.
    async fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(FeedError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response)
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let text = self.get_text(url, query).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET and decode a JSON body, treating an empty or malformed body as no data.
    pub async fn get_json_opt<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let text = self.get_text(url, query).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Discarding malformed JSON from {}: {}", url, e);
                Ok(None)
            }
        }
    }

    /// GET the body as text.
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let response = self.send(url, query).await?;
        response.text().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> FeedError {
        if err.is_timeout() {
            FeedError::Timeout(self.timeout)
        } else {
            FeedError::Http(err)
        }
    }
}
