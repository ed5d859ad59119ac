use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::credentials::CredentialPool;
use crate::error::{Error, Result};

/// Custom Search JSON API endpoint.
pub const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
/// The API refuses to page past the 100th result.
pub const MAX_RESULTS: usize = 100;
/// Fixed page size of the API.
pub const RESULTS_PER_PAGE: usize = 10;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "pagode (gzip)";
const LINK_FIELDS: &str = "items(link)";

/// Resolves one dork into the links it turns up.
#[async_trait]
pub trait Search: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    link: String,
}

/// Paginating Custom Search client that rotates through a shared
/// [`CredentialPool`] whenever a key runs out of quota.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    proxy: Option<reqwest::Proxy>,
    pool: Arc<CredentialPool>,
    endpoint: String,
    max_results: usize,
}

impl SearchClient {
    /// Create a client. An unusable proxy URL is reported and ignored.
    pub fn new(pool: Arc<CredentialPool>, proxy: Option<&str>) -> Result<Self> {
        let proxy = match proxy.filter(|p| !p.trim().is_empty()) {
            Some(url) => match reqwest::Proxy::all(url) {
                Ok(proxy) => Some(proxy),
                Err(e) => {
                    warn!("Invalid proxy URL {}: {}", url, e);
                    None
                }
            },
            None => None,
        };

        Ok(SearchClient {
            client: build_client(proxy.clone(), REQUEST_TIMEOUT)?,
            proxy,
            pool,
            endpoint: SEARCH_ENDPOINT.to_string(),
            max_results: MAX_RESULTS,
        })
    }

    /// Replace the per-request timeout (10 seconds by default).
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(self.proxy.clone(), timeout)?;
        Ok(self)
    }

    /// Point the client at a different API root.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Limit links per dork. Zero means the API maximum; larger values are
    /// clamped to it.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = match max_results {
            0 => MAX_RESULTS,
            n => n.min(MAX_RESULTS),
        };
        self
    }

    /// Walk result pages for `query` until the API runs dry or the cap is hit.
    ///
    /// A 403/429 rotates to the next credential and retries the same page. When
    /// no credential is left the links gathered so far are handed back inside
    /// [`Error::CredentialsExhausted`]. Any other failure drops the query's
    /// links entirely.
    pub async fn dork(&self, query: &str) -> Result<Vec<String>> {
        let mut links = Vec::new();
        let mut start = 1;

        while start <= self.max_results {
            let Some((index, credential)) = self.pool.checkout() else {
                return Err(Error::CredentialsExhausted { links });
            };

            debug!("Requesting '{}' from result {} with key #{}", query, start, index);
            let start_param = start.to_string();
            let response = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("key", credential.key.as_str()),
                    ("cx", credential.scope_id.as_str()),
                    ("q", query),
                    ("start", start_param.as_str()),
                    ("fields", LINK_FIELDS),
                ])
                .send()
                .await
                .map_err(Error::Transport)?;

            match response.status() {
                StatusCode::OK => {}
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    drop(response);
                    if !self.pool.rotate_from(index) {
                        return Err(Error::CredentialsExhausted { links });
                    }
                    warn!("API key limit reached, rotating to next key");
                    continue;
                }
                status => return Err(Error::UnexpectedStatus(status)),
            }

            let page: SearchResponse = response.json().await.map_err(Error::from_reqwest)?;
            let items = page.items.unwrap_or_default();
            if items.is_empty() {
                debug!("No more results for '{}'", query);
                break;
            }

            links.extend(
                items
                    .into_iter()
                    .map(|item| item.link)
                    .filter(|link| !link.is_empty()),
            );
            start += RESULTS_PER_PAGE;
        }

        links.truncate(self.max_results);
        Ok(links)
    }
}

fn build_client(proxy: Option<reqwest::Proxy>, timeout: Duration) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .gzip(true);
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(Error::Client)
}

#[async_trait]
impl Search for SearchClient {
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        self.dork(query).await
    }
}
