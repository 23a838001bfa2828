//! HTTP client for the DORA repository search endpoint.
//!
//! Each search is exactly one GET against
//! `<base>/search/json_cit_a/<encoded query>`; the JSON array in the response
//! body is returned as-is.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{DoraError, Result};
use crate::query::{encode_filter, encode_query, QueryBuilder};

/// Default repository base URL (the EMPA collection of DORA).
pub const DEFAULT_BASE_URL: &str = "https://www.dora.lib4ri.ch/empa/islandora";

/// Path under the base URL serving citation-style JSON search results.
pub const SEARCH_PATH: &str = "search/json_cit_a";

/// Timeout applied to every repository request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Publication records in the order the repository returned them.
pub type SearchResult = Vec<Value>;

/// A source of publication search results.
///
/// Implemented by [`RepositoryClient`] for the real repository; the dispatcher
/// only depends on this trait.
#[async_trait]
pub trait PublicationRepository: Send + Sync {
    /// Searches all weighted fields for a free-text term.
    async fn search(&self, term: &str) -> Result<SearchResult>;

    /// Runs a pre-built repository query with optional filters, unweighted.
    async fn search_by_filter(&self, query: &str, filters: &[String]) -> Result<SearchResult>;
}

/// Repository client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    builder: QueryBuilder<'static>,
}

impl RepositoryClient {
    /// Creates a client for the repository at `base_url` with the standard timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DoraError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
            builder: QueryBuilder::default(),
        })
    }

    /// Returns the base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full search URL for an unencoded query and its filters.
    ///
    /// Filters become `f[0]`, `f[1]`, ... in list order, followed by the
    /// fixed `extension=false` parameter.
    pub fn search_url(&self, query: &str, filters: &[String]) -> String {
        let mut params: Vec<String> = filters
            .iter()
            .enumerate()
            .map(|(i, f)| format!("f[{}]={}", i, encode_filter(f)))
            .collect();
        params.push("extension=false".to_string());

        format!(
            "{}/{}/{}?{}",
            self.base_url,
            SEARCH_PATH,
            encode_query(query),
            params.join("&")
        )
    }

    async fn fetch(&self, url: &str) -> Result<SearchResult> {
        debug!(url, "querying repository");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "repository request failed");
            let message = if e.is_timeout() {
                format!("request timed out after {:?}", self.timeout)
            } else {
                e.to_string()
            };
            DoraError::UpstreamUnavailable { message }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "repository returned an error status");
            // The status is the error; an unreadable body only loses the excerpt.
            let body = response.text().await.unwrap_or_default();
            return Err(DoraError::upstream_status(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DoraError::UpstreamUnavailable {
                message: format!("failed to read response body: {}", e),
            })?;

        parse_search_body(&body)
    }
}

#[async_trait]
impl PublicationRepository for RepositoryClient {
    async fn search(&self, term: &str) -> Result<SearchResult> {
        let query = self.builder.build(term)?;
        info!(term = term.trim(), "searching DORA");
        let url = self.search_url(&query, &[]);
        self.fetch(&url).await
    }

    async fn search_by_filter(&self, query: &str, filters: &[String]) -> Result<SearchResult> {
        if query.trim().is_empty() {
            return Err(DoraError::invalid_argument("query must not be empty"));
        }
        info!(query, filters = filters.len(), "searching DORA with filters");
        let url = self.search_url(query, filters);
        self.fetch(&url).await
    }
}

/// Parses a 200 response body, which must be a JSON array.
fn parse_search_body(body: &str) -> Result<SearchResult> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| DoraError::UpstreamProtocolError {
            message: format!("response is not valid JSON: {}", e),
        })?;

    match value {
        Value::Array(records) => Ok(records),
        other => Err(DoraError::UpstreamProtocolError {
            message: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
