use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one GET.
///
/// Repository and metric kind are not stored here: [`crate::traffic::aggregate`]
/// derives both from `url` with [`RepositoryRef::from_url`] and [`MetricKind::from_url`],
/// so a result can never disagree with the endpoint it came from.
///
/// [`RepositoryRef::from_url`]: crate::repo::RepositoryRef::from_url
/// [`MetricKind::from_url`]: crate::repo::MetricKind::from_url
#[derive(Debug)]
pub struct FetchResult {
    pub url: String,
    pub payload: Result<Value>,
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        self.payload.is_ok()
    }
}

/// Request policy for [`TrafficClient`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum requests in flight at once.
    pub concurrency: usize,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: concat!("traffic-md/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Clone)]
pub struct TrafficClient {
    token: Arc<SecretString>,
    http: Arc<Client>,
    concurrency: usize,
}

impl TrafficClient {
    /// Create a REST client that authenticates every request with `token`.
    pub fn new(token: &SecretString, options: &FetchOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(options.user_agent.as_str());
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Error::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            token: Arc::new(SecretString::from(token.expose_secret().to_owned())),
            http: Arc::new(http),
            concurrency: options.concurrency.max(1),
        })
    }

    /// Single authenticated GET, decoded as JSON. Non-2xx statuses are errors.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Error::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json().await.map_err(|e| Error::MalformedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// GET every URL with at most `concurrency` requests in flight.
    ///
    /// Returns once all requests have finished, in completion order. A failed
    /// request yields an `Err` payload and never holds up the others.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FetchResult> {
        info!(requests = urls.len(), concurrency = self.concurrency, "fetching traffic");

        stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let payload = self.get_json(&url).await;
                debug!(%url, ok = payload.is_ok(), "request finished");
                FetchResult { url, payload }
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
    }
}
