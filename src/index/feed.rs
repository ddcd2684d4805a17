use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;

/// A source of index pages. Each call returns the raw body of one page:
/// newline-delimited JSON records with a timestamp at or after `since`.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable location, used in error messages.
    fn location(&self) -> &str;

    async fn page(&self, since: DateTime<Utc>) -> Result<String, FetchError>;
}

/// The module index served over HTTP.
pub struct HttpFeed {
    client: Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("modsweep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn unavailable(&self, reason: impl ToString) -> FetchError {
        FetchError::FeedUnavailable {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn location(&self) -> &str {
        &self.url
    }

    async fn page(&self, since: DateTime<Utc>) -> Result<String, FetchError> {
        let since = since.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        debug!(url = %self.url, %since, "requesting index page");

        let response = self
            .client
            .get(&self.url)
            .query(&[("since", since.as_str())])
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| self.unavailable(e))
    }
}
