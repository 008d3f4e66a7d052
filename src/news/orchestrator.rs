//! Ordered, first-success fetching across retrieval strategies.

use std::time::Instant;
use tokio::time::timeout;
use tracing::{info, warn};

use super::strategy::RetrievalStrategy;
use super::types::{Article, SearchQuery};
use crate::error::{AnalysisError, StrategyError, StrategyFailure};
use crate::TARGET_WEB_REQUEST;

#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorConfig {
    /// Count a structurally valid reply with zero articles as success.
    pub accept_empty: bool,
}

/// Articles from the first accepted strategy plus the causes of every
/// strategy rejected before it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub articles: Vec<Article>,
    pub strategy: String,
    pub prior_failures: Vec<StrategyFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOrchestrator {
    config: OrchestratorConfig,
}

impl FetchOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    /// Try `strategies` strictly in order and stop at the first one whose
    /// reply completes in time, carries no embedded error and holds at least
    /// one article.
    pub async fn fetch(
        &self,
        query: &SearchQuery,
        strategies: &[Box<dyn RetrievalStrategy>],
    ) -> Result<FetchOutcome, AnalysisError> {
        let topic = query.topic();
        let mut failures = Vec::new();

        for strategy in strategies {
            let name = strategy.name().to_string();
            let limit = strategy.timeout();
            let started = Instant::now();
            info!(target: TARGET_WEB_REQUEST, strategy = %name, timeout_ms = limit.as_millis() as u64, "Attempting search for {}", topic);

            let result = match timeout(limit, strategy.attempt(query)).await {
                Ok(Ok(articles)) if articles.is_empty() && !self.config.accept_empty => {
                    Err(StrategyError::Empty)
                }
                Ok(result) => result,
                Err(_) => Err(StrategyError::Timeout(limit)),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(articles) => {
                    info!(target: TARGET_WEB_REQUEST, strategy = %name, elapsed_ms, articles = articles.len(), prior_failures = failures.len(), "Search succeeded for {}", topic);
                    return Ok(FetchOutcome {
                        articles,
                        strategy: name,
                        prior_failures: failures,
                    });
                }
                Err(error) => {
                    warn!(target: TARGET_WEB_REQUEST, strategy = %name, elapsed_ms, kind = error.kind(), "Search failed for {}: {}", topic, error);
                    failures.push(StrategyFailure {
                        strategy: name,
                        error,
                    });
                }
            }
        }

        Err(AnalysisError::AllStrategiesExhausted {
            topic,
            failures,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Scripted strategy for tests.
    pub(crate) struct FakeStrategy {
        pub name: String,
        pub timeout: Duration,
        pub delay: Duration,
        pub reply: Result<Vec<Article>, StrategyError>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeStrategy {
        pub fn new(name: &str, reply: Result<Vec<Article>, StrategyError>) -> Self {
            Self {
                name: name.to_string(),
                timeout: Duration::from_secs(5),
                delay: Duration::ZERO,
                reply,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn slow(mut self, delay: Duration, timeout: Duration) -> Self {
            self.delay = delay;
            self.timeout = timeout;
            self
        }
    }

    #[async_trait]
    impl RetrievalStrategy for FakeStrategy {
        fn name(&self) -> &str {
            &self.name
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn attempt(&self, _query: &SearchQuery) -> Result<Vec<Article>, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone()
        }
    }

    pub(crate) fn articles(n: usize, prefix: &str) -> Vec<Article> {
        (0..n)
            .map(|i| Article {
                title: format!("{} headline {}", prefix, i),
                url: format!("https://news.example/{}/{}", prefix, i),
                publisher_name: "Example Wire".to_string(),
                published_at: None,
            })
            .collect()
    }

    fn query() -> SearchQuery {
        SearchQuery::new(vec!["thailand government".to_string()])
    }

    #[tokio::test]
    async fn test_first_success_after_failures() {
        let s3 = FakeStrategy::new("s3", Ok(articles(3, "s3")));
        let s3_articles = s3.reply.clone().unwrap();
        let strategies: Vec<Box<dyn RetrievalStrategy>> = vec![
            Box::new(FakeStrategy::new(
                "s1",
                Err(StrategyError::Transport("connection reset".to_string())),
            )),
            Box::new(FakeStrategy::new("s2", Ok(Vec::new()))),
            Box::new(s3),
        ];

        let outcome = FetchOrchestrator::default()
            .fetch(&query(), &strategies)
            .await
            .unwrap();

        assert_eq!(outcome.articles, s3_articles);
        assert_eq!(outcome.strategy, "s3");
        assert_eq!(outcome.prior_failures.len(), 2);
        assert_eq!(outcome.prior_failures[0].strategy, "s1");
        assert!(matches!(
            outcome.prior_failures[0].error,
            StrategyError::Transport(_)
        ));
        assert_eq!(outcome.prior_failures[1].error, StrategyError::Empty);
    }

    #[tokio::test]
    async fn test_short_circuits_on_success() {
        let later = FakeStrategy::new("later", Ok(articles(1, "later")));
        let later_calls = later.calls.clone();
        let strategies: Vec<Box<dyn RetrievalStrategy>> = vec![
            Box::new(FakeStrategy::new("first", Ok(articles(2, "first")))),
            Box::new(later),
        ];

        let outcome = FetchOrchestrator::default()
            .fetch(&query(), &strategies)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "first");
        assert!(outcome.prior_failures.is_empty());
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_exhausted_carries_every_cause() {
        let strategies: Vec<Box<dyn RetrievalStrategy>> = vec![
            Box::new(FakeStrategy::new(
                "s1",
                Err(StrategyError::Transport("dns".to_string())),
            )),
            Box::new(FakeStrategy::new("s2", Ok(Vec::new()))),
            Box::new(FakeStrategy::new(
                "s3",
                Err(StrategyError::Upstream(vec!["quota".to_string()])),
            )),
        ];

        let err = FetchOrchestrator::default()
            .fetch(&query(), &strategies)
            .await
            .unwrap_err();

        match err {
            AnalysisError::AllStrategiesExhausted { topic, failures } => {
                assert_eq!(topic, "\"thailand government\"");
                let names: Vec<&str> = failures.iter().map(|f| f.strategy.as_str()).collect();
                assert_eq!(names, vec!["s1", "s2", "s3"]);
                assert_eq!(failures[1].error, StrategyError::Empty);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_strategy_is_cut_at_its_own_timeout() {
        let strategies: Vec<Box<dyn RetrievalStrategy>> = vec![
            Box::new(
                FakeStrategy::new("slow", Ok(articles(1, "slow")))
                    .slow(Duration::from_secs(30), Duration::from_millis(20)),
            ),
            Box::new(FakeStrategy::new("fast", Ok(articles(2, "fast")))),
        ];

        let started = Instant::now();
        let outcome = FetchOrchestrator::default()
            .fetch(&query(), &strategies)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.strategy, "fast");
        assert_eq!(
            outcome.prior_failures[0].error,
            StrategyError::Timeout(Duration::from_millis(20))
        );
    }

    #[tokio::test]
    async fn test_relaxed_predicate_accepts_empty() {
        let strategies: Vec<Box<dyn RetrievalStrategy>> = vec![
            Box::new(FakeStrategy::new("empty", Ok(Vec::new()))),
            Box::new(FakeStrategy::new("full", Ok(articles(1, "full")))),
        ];

        let outcome = FetchOrchestrator::new(OrchestratorConfig { accept_empty: true })
            .fetch(&query(), &strategies)
            .await
            .unwrap();
        assert_eq!(outcome.strategy, "empty");
        assert!(outcome.articles.is_empty());
    }

    #[tokio::test]
    async fn test_no_strategies_is_exhausted() {
        let err = FetchOrchestrator::default()
            .fetch(&query(), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::AllStrategiesExhausted { ref failures, .. } if failures.is_empty()
        ));
    }
}
