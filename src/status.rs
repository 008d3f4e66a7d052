//! Connectivity check for the news search and classifier upstreams.

use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::classifier::{Classifier, ClassifierClient, Prediction};
use crate::environment::AppConfig;
use crate::error::{AnalysisError, ClassifierError};
use crate::news::{
    create_http_client, FetchOrchestrator, FetchOutcome, HeaderProfile, HttpStrategy,
    OrchestratorConfig, RetrievalStrategy, SearchEndpoint, SearchQuery, Transport,
};

const CHECK_SENTENCE: &str = "This is a test sentence for sentiment analysis.";
const CHECK_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    Connected,
    Loading,
    Error,
    NoKey,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub connected: bool,
    pub status: ServiceState,
    pub message: String,
}

impl ServiceStatus {
    fn new(status: ServiceState, message: String) -> Self {
        Self {
            connected: matches!(status, ServiceState::Connected | ServiceState::Loading),
            status,
            message,
        }
    }

    fn no_key() -> Self {
        Self::new(ServiceState::NoKey, "API key not configured".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub news: ServiceStatus,
    pub classifier: ServiceStatus,
}

/// Check both upstreams. Failures are reported in the result, not raised.
pub async fn check_status(config: &AppConfig) -> Result<StatusReport> {
    let news = match &config.gnews_api_key {
        Some(key) => {
            let endpoint = SearchEndpoint::new(&config.search_url, key);
            let strategies: Vec<Box<dyn RetrievalStrategy>> = vec![
                Box::new(HttpStrategy::new(
                    "browser",
                    endpoint.clone(),
                    HeaderProfile::Browser,
                    Transport::Pooled,
                    CHECK_TIMEOUT,
                )?),
                Box::new(HttpStrategy::new(
                    "curl",
                    endpoint,
                    HeaderProfile::Curl,
                    Transport::Fresh,
                    CHECK_TIMEOUT,
                )?),
            ];
            let mut query = SearchQuery::new(vec!["test".to_string()]);
            query.lang = config.lang.clone();
            query.max = 1;

            let orchestrator = FetchOrchestrator::new(OrchestratorConfig { accept_empty: true });
            news_status(orchestrator.fetch(&query, &strategies).await)
        }
        None => ServiceStatus::no_key(),
    };

    let classifier = match &config.huggingface_api_key {
        Some(key) => {
            let client = ClassifierClient::new(
                create_http_client(Transport::Pooled)?,
                &config.classifier_base_url,
                &config.classifier_model,
                key,
            );
            let outcome = client
                .classify(CHECK_SENTENCE, config.classifier_timeout)
                .await;
            classifier_status(client.model(), outcome)
        }
        None => ServiceStatus::no_key(),
    };

    for (name, status) in [("news", &news), ("classifier", &classifier)] {
        if status.connected {
            info!("{} upstream: {}", name, status.message);
        } else {
            warn!("{} upstream: {}", name, status.message);
        }
    }

    Ok(StatusReport { news, classifier })
}

fn news_status(outcome: Result<FetchOutcome, AnalysisError>) -> ServiceStatus {
    match outcome {
        Ok(outcome) => ServiceStatus::new(
            ServiceState::Connected,
            format!(
                "Connected via {} - {} article(s)",
                outcome.strategy,
                outcome.articles.len()
            ),
        ),
        Err(err) => ServiceStatus::new(ServiceState::Error, err.to_string()),
    }
}

fn classifier_status(model: &str, outcome: Result<Prediction, ClassifierError>) -> ServiceStatus {
    match outcome {
        Ok(_) => ServiceStatus::new(ServiceState::Connected, format!("Connected to model {}", model)),
        Err(err @ ClassifierError::ModelWarmingUp { .. }) => {
            ServiceStatus::new(ServiceState::Loading, err.to_string())
        }
        Err(err) => ServiceStatus::new(ServiceState::Error, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StrategyError, StrategyFailure};
    use crate::news::fake_articles;

    #[test]
    fn test_news_status() {
        let connected = news_status(Ok(FetchOutcome {
            articles: fake_articles(1, "status"),
            strategy: "curl".to_string(),
            prior_failures: Vec::new(),
        }));
        assert!(connected.connected);
        assert_eq!(connected.status, ServiceState::Connected);
        assert_eq!(connected.message, "Connected via curl - 1 article(s)");

        let failed = news_status(Err(AnalysisError::AllStrategiesExhausted {
            topic: "\"test\"".to_string(),
            failures: vec![StrategyFailure {
                strategy: "browser".to_string(),
                error: StrategyError::HttpStatus(401),
            }],
        }));
        assert!(!failed.connected);
        assert_eq!(failed.status, ServiceState::Error);
        assert!(failed.message.contains("browser"));
    }

    #[test]
    fn test_classifier_status() {
        let model = "siebert/sentiment-roberta-large-english";
        let ok = classifier_status(
            model,
            Ok(Prediction {
                label: "POSITIVE".to_string(),
                score: 0.99,
            }),
        );
        assert_eq!(ok.status, ServiceState::Connected);

        let loading = classifier_status(
            model,
            Err(ClassifierError::ModelWarmingUp {
                estimated_secs: Some(20.0),
            }),
        );
        assert!(loading.connected);
        assert_eq!(loading.status, ServiceState::Loading);

        let down = classifier_status(
            model,
            Err(ClassifierError::UpstreamUnavailable("HTTP 503".to_string())),
        );
        assert!(!down.connected);
        assert_eq!(down.status, ServiceState::Error);
    }

    #[test]
    fn test_state_serializes_kebab_case() {
        let report = StatusReport {
            news: ServiceStatus::no_key(),
            classifier: ServiceStatus::new(ServiceState::Loading, String::new()),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["news"]["status"], "no-key");
        assert_eq!(json["news"]["connected"], false);
        assert_eq!(json["classifier"]["status"], "loading");
    }

    #[tokio::test]
    async fn test_missing_keys_skip_requests() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let report = check_status(&config).await.unwrap();
        assert_eq!(report.news.status, ServiceState::NoKey);
        assert_eq!(report.classifier.status, ServiceState::NoKey);
    }
}
