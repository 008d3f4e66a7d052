//! Retrieval strategies: interchangeable ways of issuing the same search.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::client::{create_http_client, HeaderProfile, Transport};
use super::types::{parse_search_body, Article, SearchQuery};
use crate::error::StrategyError;
use crate::TARGET_WEB_REQUEST;

pub const DEFAULT_SEARCH_URL: &str = "https://gnews.io/api/v4/search";

#[async_trait]
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound for one `attempt`; enforced by the orchestrator.
    fn timeout(&self) -> Duration;

    /// Issue the search. A structurally valid reply with no articles is
    /// `Ok(vec![])`; emptiness is judged by the caller.
    async fn attempt(&self, query: &SearchQuery) -> Result<Vec<Article>, StrategyError>;
}

/// Connection details shared by every HTTP strategy.
#[derive(Debug, Clone)]
pub struct SearchEndpoint {
    pub url: String,
    pub api_key: String,
}

impl SearchEndpoint {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request_url(&self, query: &SearchQuery) -> Result<url::Url, StrategyError> {
        let mut params = query.params(Utc::now());
        params.push(("apikey", self.api_key.clone()));
        url::Url::parse_with_params(&self.url, &params)
            .map_err(|err| StrategyError::Transport(format!("invalid search URL: {}", err)))
    }
}

/// One header profile over one transport.
pub struct HttpStrategy {
    name: String,
    endpoint: SearchEndpoint,
    profile: HeaderProfile,
    transport: Transport,
    timeout: Duration,
    pooled: Option<reqwest::Client>,
}

impl HttpStrategy {
    pub fn new(
        name: &str,
        endpoint: SearchEndpoint,
        profile: HeaderProfile,
        transport: Transport,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let pooled = match transport {
            Transport::Pooled => Some(create_http_client(Transport::Pooled)?),
            Transport::Fresh => None,
        };
        Ok(Self {
            name: name.to_string(),
            endpoint,
            profile,
            transport,
            timeout,
            pooled,
        })
    }

    fn client(&self) -> Result<reqwest::Client, StrategyError> {
        match &self.pooled {
            Some(client) => Ok(client.clone()),
            None => create_http_client(self.transport)
                .map_err(|err| StrategyError::Transport(err.to_string())),
        }
    }
}

#[async_trait]
impl RetrievalStrategy for HttpStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, query: &SearchQuery) -> Result<Vec<Article>, StrategyError> {
        let url = self.endpoint.request_url(query)?;
        let client = self.client()?;

        debug!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Requesting {} with {:?} headers", redact(&url), self.profile);

        let response = self
            .profile
            .apply(client.get(url))
            .send()
            .await
            .map_err(|err| StrategyError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StrategyError::Transport(err.without_url().to_string()))?;

        debug!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Response status {}, first 500 characters: {}", status, body.chars().take(500).collect::<String>());

        if !status.is_success() {
            // Quota and key problems come back as non-200 with an errors list.
            return match parse_search_body(&body) {
                Err(StrategyError::Upstream(messages)) => Err(StrategyError::Upstream(messages)),
                _ => Err(StrategyError::HttpStatus(status.as_u16())),
            };
        }

        parse_search_body(&body)
    }
}

/// Retries an inner strategy with substitute topics, in order, until one of
/// them yields articles.
pub struct AlternateTopicsStrategy {
    name: String,
    inner: HttpStrategy,
    alternates: Vec<String>,
    per_topic_timeout: Duration,
}

impl AlternateTopicsStrategy {
    pub fn new(
        name: &str,
        inner: HttpStrategy,
        alternates: Vec<String>,
        per_topic_timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            inner,
            alternates,
            per_topic_timeout,
        }
    }
}

#[async_trait]
impl RetrievalStrategy for AlternateTopicsStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.per_topic_timeout * self.alternates.len().max(1) as u32
    }

    async fn attempt(&self, query: &SearchQuery) -> Result<Vec<Article>, StrategyError> {
        let mut saw_empty = false;
        let mut last_error = StrategyError::Decode("no alternate topics configured".to_string());

        for alternate in &self.alternates {
            let alt_query = query.with_terms(vec![alternate.clone()]);
            debug!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Trying alternate topic {:?}", alternate);

            match timeout(self.per_topic_timeout, self.inner.attempt(&alt_query)).await {
                Ok(Ok(articles)) if !articles.is_empty() => {
                    info!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Alternate topic {:?} returned {} articles", alternate, articles.len());
                    return Ok(articles);
                }
                Ok(Ok(_)) => {
                    debug!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Alternate topic {:?} returned nothing", alternate);
                    saw_empty = true;
                }
                Ok(Err(err)) => {
                    warn!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Alternate topic {:?} failed: {}", alternate, err);
                    last_error = err;
                }
                Err(_) => {
                    warn!(target: TARGET_WEB_REQUEST, strategy = %self.name, "Alternate topic {:?} timed out", alternate);
                    last_error = StrategyError::Timeout(self.per_topic_timeout);
                }
            }
        }

        if saw_empty {
            Ok(Vec::new())
        } else {
            Err(last_error)
        }
    }
}

/// Per-request parameters the default ladder is built from.
#[derive(Debug, Clone)]
pub struct LadderConfig {
    pub endpoint: SearchEndpoint,
    pub alternates: Vec<String>,
}

/// The default ordered strategy list: cheapest and most-likely-accepted
/// first, each with its own timeout.
pub fn default_ladder(config: &LadderConfig) -> anyhow::Result<Vec<Box<dyn RetrievalStrategy>>> {
    let endpoint = &config.endpoint;
    let mut ladder: Vec<Box<dyn RetrievalStrategy>> = vec![
        Box::new(HttpStrategy::new(
            "browser",
            endpoint.clone(),
            HeaderProfile::Browser,
            Transport::Pooled,
            Duration::from_secs(8),
        )?),
        Box::new(HttpStrategy::new(
            "simple",
            endpoint.clone(),
            HeaderProfile::Simple,
            Transport::Pooled,
            Duration::from_secs(8),
        )?),
        Box::new(HttpStrategy::new(
            "curl",
            endpoint.clone(),
            HeaderProfile::Curl,
            Transport::Fresh,
            Duration::from_secs(10),
        )?),
        Box::new(HttpStrategy::new(
            "fresh-connection",
            endpoint.clone(),
            HeaderProfile::Browser,
            Transport::Fresh,
            Duration::from_secs(10),
        )?),
    ];

    if !config.alternates.is_empty() {
        let inner = HttpStrategy::new(
            "alternate-topics",
            endpoint.clone(),
            HeaderProfile::Postman,
            Transport::Pooled,
            Duration::from_secs(6),
        )?;
        ladder.push(Box::new(AlternateTopicsStrategy::new(
            "alternate-topics",
            inner,
            config.alternates.clone(),
            Duration::from_secs(6),
        )));
    }

    Ok(ladder)
}

/// Strip the credential before a URL goes to the logs.
fn redact(url: &url::Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apikey" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::get;
    use std::collections::HashMap;

    fn endpoint() -> SearchEndpoint {
        SearchEndpoint::new("https://news.example/api/v4/search", "secret-key")
    }

    #[test]
    fn test_request_url_carries_query_and_key() {
        let query = SearchQuery::new(vec!["vietnam government".to_string()]);
        let url = endpoint().request_url(&query).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".to_string(), "\"vietnam government\"".to_string())));
        assert!(pairs.contains(&("lang".to_string(), "en".to_string())));
        assert!(pairs.contains(&("max".to_string(), "8".to_string())));
        assert!(pairs.contains(&("apikey".to_string(), "secret-key".to_string())));
    }

    #[test]
    fn test_redact_hides_key() {
        let query = SearchQuery::new(vec!["x".to_string()]);
        let url = endpoint().request_url(&query).unwrap();
        let redacted = redact(&url);
        assert!(!redacted.contains("secret-key"));
        assert!(redacted.contains("apikey=***") || redacted.contains("apikey=%2A%2A%2A"));
    }

    async fn spawn_search(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/search", addr)
    }

    fn strategy(url: &str, profile: HeaderProfile, transport: Transport) -> HttpStrategy {
        HttpStrategy::new(
            "local",
            SearchEndpoint::new(url, "secret-key"),
            profile,
            transport,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn query() -> SearchQuery {
        SearchQuery::new(vec!["brunei government".to_string()])
    }

    #[tokio::test]
    async fn test_attempt_sends_profile_and_query() {
        let router = axum::Router::new().route(
            "/search",
            get(
                |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                    let agent = headers
                        .get(header::USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    if agent != HeaderProfile::Curl.user_agent()
                        || params.get("apikey").map(String::as_str) != Some("secret-key")
                        || params.get("q").map(String::as_str) != Some("\"brunei government\"")
                    {
                        return (StatusCode::FORBIDDEN, "{}".to_string());
                    }
                    (
                        StatusCode::OK,
                        r#"{"articles":[{"title":"Sultan opens session","url":"https://a.example/1","source":{"name":"BB"}}]}"#
                            .to_string(),
                    )
                },
            ),
        );
        let url = spawn_search(router).await;

        let articles = strategy(&url, HeaderProfile::Curl, Transport::Fresh)
            .attempt(&query())
            .await
            .unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].publisher_name, "BB");

        // Same server, wrong header profile.
        let err = strategy(&url, HeaderProfile::Browser, Transport::Pooled)
            .attempt(&query())
            .await
            .unwrap_err();
        assert_eq!(err, StrategyError::HttpStatus(403));
    }

    #[tokio::test]
    async fn test_error_status_with_error_list_is_upstream() {
        let router = axum::Router::new().route(
            "/search",
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"errors":["You have reached your request limit for today"]}"#,
                )
            }),
        );
        let url = spawn_search(router).await;

        let err = strategy(&url, HeaderProfile::Simple, Transport::Pooled)
            .attempt(&query())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StrategyError::Upstream(vec![
                "You have reached your request limit for today".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_error_status_without_error_list_is_http_status() {
        let router = axum::Router::new().route(
            "/search",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "<html>busy</html>") }),
        );
        let url = spawn_search(router).await;

        let err = strategy(&url, HeaderProfile::Browser, Transport::Fresh)
            .attempt(&query())
            .await
            .unwrap_err();
        assert_eq!(err, StrategyError::HttpStatus(503));
    }

    #[tokio::test]
    async fn test_ok_status_with_error_list_is_upstream() {
        let router = axum::Router::new().route(
            "/search",
            get(|| async { r#"{"errors":{"apikey":"API key is invalid"}}"# }),
        );
        let url = spawn_search(router).await;

        let err = strategy(&url, HeaderProfile::Postman, Transport::Pooled)
            .attempt(&query())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StrategyError::Upstream(vec!["apikey: API key is invalid".to_string()])
        );
    }

    #[test]
    fn test_default_ladder_order_and_timeouts() {
        let config = LadderConfig {
            endpoint: endpoint(),
            alternates: vec!["laos politics".to_string(), "laos news".to_string()],
        };
        let ladder = default_ladder(&config).unwrap();
        let names: Vec<&str> = ladder.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["browser", "simple", "curl", "fresh-connection", "alternate-topics"]
        );
        assert_eq!(ladder[0].timeout(), Duration::from_secs(8));
        assert_eq!(ladder[2].timeout(), Duration::from_secs(10));
        assert_eq!(ladder[4].timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_ladder_without_alternates() {
        let config = LadderConfig {
            endpoint: endpoint(),
            alternates: Vec::new(),
        };
        assert_eq!(default_ladder(&config).unwrap().len(), 4);
    }
}
