//! Web search abstraction
//!
//! Provides a unified interface for search providers:
//! - SerpAPI (Google engine)
//! - Scripted mock for tests and offline runs

use crate::config::SearchConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// One raw search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(alias = "link", default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

impl SearchResult {
    pub fn new(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
        }
    }
}

/// Trait for web search backends
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    /// Run one query, returning at most `result_limit` hits in provider order
    async fn search(&self, query: &str, result_limit: usize) -> Result<Vec<SearchResult>>;
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Option<Vec<SerpApiOrganic>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SerpApiOrganic {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// SerpAPI search client
pub struct SerpApiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine: String,
}

impl SerpApiClient {
    /// Create a new client; refuses to build without an API key
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::NotConfigured {
                component: "Search client".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            engine: config.engine.clone(),
        })
    }

    async fn fetch(&self, query: &str, result_limit: usize) -> Result<Vec<SearchResult>> {
        let num = result_limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("engine", self.engine.as_str()),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Search {
                message: format!("Search request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Search {
                message: format!("Search API error {}: {}", status, text),
            });
        }

        let body: SerpApiResponse = response.json().await.map_err(|e| AppError::Search {
            message: format!("Failed to parse search response: {}", e),
        })?;

        match (body.organic_results, body.error) {
            (Some(results), _) => Ok(results
                .into_iter()
                .take(result_limit)
                .map(|r| SearchResult {
                    url: r.link.unwrap_or_default(),
                    title: r.title.unwrap_or_default(),
                    snippet: r.snippet.unwrap_or_default(),
                })
                .collect()),
            (None, Some(message)) => Err(AppError::Search { message }),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl WebSearchClient for SerpApiClient {
    async fn search(&self, query: &str, result_limit: usize) -> Result<Vec<SearchResult>> {
        let result = self.fetch(query, result_limit).await;
        match &result {
            Ok(results) => metrics::record_search(true, results.len()),
            Err(_) => metrics::record_search(false, 0),
        }
        result
    }
}

/// Scripted search backend for testing
///
/// Answers are looked up by exact query first, then fall back to the
/// default result list (empty unless set).
#[derive(Default)]
pub struct MockSearchClient {
    by_query: HashMap<String, std::result::Result<Vec<SearchResult>, String>>,
    default: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
    limits: Mutex<Vec<usize>>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        self.by_query.insert(query.into(), Ok(results));
        self
    }

    pub fn with_failure(mut self, query: impl Into<String>, message: impl Into<String>) -> Self {
        self.by_query.insert(query.into(), Err(message.into()));
        self
    }

    pub fn with_default(mut self, results: Vec<SearchResult>) -> Self {
        self.default = results;
        self
    }

    /// Queries received so far, in call order
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// `result_limit` of each call, in call order
    pub fn limits(&self) -> Vec<usize> {
        self.limits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl WebSearchClient for MockSearchClient {
    async fn search(&self, query: &str, result_limit: usize) -> Result<Vec<SearchResult>> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.to_string());
        self.limits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(result_limit);

        let results = match self.by_query.get(query) {
            Some(Ok(results)) => results.clone(),
            Some(Err(message)) => {
                return Err(AppError::Search {
                    message: message.clone(),
                })
            }
            None => self.default.clone(),
        };

        Ok(results.into_iter().take(result_limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SearchConfig {
        SearchConfig {
            endpoint: format!("{}/search.json", server.uri()),
            api_key: Some("serp-key".to_string()),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_link_alias_on_input() {
        let result: SearchResult =
            serde_json::from_str(r#"{"link": "https://a.org", "title": "A"}"#).unwrap();
        assert_eq!(result.url, "https://a.org");
        assert_eq!(result.snippet, "");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["url"], "https://a.org");
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let result = SerpApiClient::new(&SearchConfig::default());
        assert!(matches!(result, Err(AppError::NotConfigured { .. })));
    }

    #[tokio::test]
    async fn test_serpapi_maps_organic_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "rollups"))
            .and(query_param("engine", "google"))
            .and(query_param("api_key", "serp-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [
                    {"link": "https://reuters.com/a", "title": "A", "snippet": "first"},
                    {"link": "https://example.com/b", "title": "B"},
                    {"link": "https://example.com/c", "title": "C", "snippet": "third"}
                ]
            })))
            .mount(&server)
            .await;

        let client = SerpApiClient::new(&config_for(&server)).unwrap();
        let results = client.search("rollups", 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://reuters.com/a");
        assert_eq!(results[1].snippet, "");
    }

    #[tokio::test]
    async fn test_serpapi_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "Invalid API key"})),
            )
            .mount(&server)
            .await;

        let client = SerpApiClient::new(&config_for(&server)).unwrap();
        let err = client.search("anything", 10).await.unwrap_err();
        assert!(matches!(err, AppError::Search { .. }));
    }

    #[tokio::test]
    async fn test_mock_lookup_order() {
        let mock = MockSearchClient::new()
            .with_results("a", vec![SearchResult::new("https://a.com", "A", "")])
            .with_failure("b", "provider down")
            .with_default(vec![SearchResult::new("https://d.com", "D", "")]);

        assert_eq!(mock.search("a", 10).await.unwrap()[0].url, "https://a.com");
        assert!(mock.search("b", 10).await.is_err());
        assert_eq!(mock.search("z", 10).await.unwrap()[0].url, "https://d.com");
        assert_eq!(mock.queries(), vec!["a", "b", "z"]);
    }
}
