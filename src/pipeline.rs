//! End-to-end wiring: country code in, recommendation out.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::analysis::{
    AggregationEngine, CampaignReport, CountryCampaignRunner, CountryResult, EngineConfig,
    RecommendationPolicy,
};
use crate::classifier::ClassifierClient;
use crate::countries;
use crate::environment::AppConfig;
use crate::error::{AnalysisError, StrategyError, StrategyFailure};
use crate::news::{
    create_http_client, default_ladder, FetchOrchestrator, LadderConfig, OrchestratorConfig,
    RetrievalStrategy, SearchEndpoint, SearchQuery, Transport,
};
use crate::sentiment::SentimentMapper;
use crate::TARGET_CAMPAIGN;

/// Builds the retrieval strategies for one country code.
pub type LadderFactory =
    Box<dyn Fn(&str) -> Result<Vec<Box<dyn RetrievalStrategy>>, AnalysisError> + Send + Sync>;

pub struct SentimentPipeline {
    engine: AggregationEngine,
    policy: RecommendationPolicy,
    runner: CountryCampaignRunner,
    /// Search parameters shared by every country; terms are filled per call.
    query: SearchQuery,
    ladder: LadderFactory,
    /// First required credential that was not configured.
    missing_key: Option<&'static str>,
    /// Held for a whole country analysis; callers may be concurrent, the
    /// upstreams are not.
    gate: Mutex<()>,
}

impl SentimentPipeline {
    pub fn new(
        engine: AggregationEngine,
        policy: RecommendationPolicy,
        runner: CountryCampaignRunner,
        query: SearchQuery,
        ladder: LadderFactory,
    ) -> Self {
        Self {
            engine,
            policy,
            runner,
            query,
            ladder,
            missing_key: None,
            gate: Mutex::new(()),
        }
    }

    /// Wire the live search endpoint and classifier from configuration.
    ///
    /// Missing API keys do not fail construction; analysis requests report
    /// them as `MissingConfig` so the status check keeps working.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let missing_key = if config.gnews_api_key.is_none() {
            Some("GNEWS_API_KEY")
        } else if config.huggingface_api_key.is_none() {
            Some("HUGGINGFACE_API_KEY")
        } else {
            None
        };

        let classifier = ClassifierClient::new(
            create_http_client(Transport::Pooled)?,
            &config.classifier_base_url,
            &config.classifier_model,
            config.huggingface_api_key.as_deref().unwrap_or_default(),
        );
        debug!("Classifier endpoint: {}", classifier.endpoint());

        let mapper = SentimentMapper::new().with_pairs(config.sentiment_synonyms.iter());
        let engine = AggregationEngine::new(
            FetchOrchestrator::new(OrchestratorConfig {
                accept_empty: config.accept_empty,
            }),
            Arc::new(classifier),
            mapper,
            EngineConfig {
                pace_delay: config.pace_delay,
                classify_timeout: config.classifier_timeout,
                failure_policy: config.failure_policy,
            },
        );

        let mut query = SearchQuery::new(Vec::new());
        query.lang = config.lang.clone();
        query.country = config.news_country.clone();
        query.max = config.max_articles;
        query.lookback = config.lookback_hours.and_then(chrono::Duration::try_hours);

        let endpoint = SearchEndpoint::new(
            &config.search_url,
            config.gnews_api_key.as_deref().unwrap_or_default(),
        );
        let ladder: LadderFactory = Box::new(move |code: &str| {
            default_ladder(&LadderConfig {
                endpoint: endpoint.clone(),
                alternates: countries::alternate_topics(code),
            })
            .map_err(|err| AnalysisError::AllStrategiesExhausted {
                topic: code.to_string(),
                failures: vec![StrategyFailure {
                    strategy: "setup".to_string(),
                    error: StrategyError::Transport(err.to_string()),
                }],
            })
        });

        let mut pipeline = Self::new(
            engine,
            RecommendationPolicy::default(),
            CountryCampaignRunner::new(config.pace_delay),
            query,
            ladder,
        );
        pipeline.missing_key = missing_key;
        Ok(pipeline)
    }

    /// Fetch, classify, tally and recommend for one country.
    ///
    /// Concurrent calls queue; only one country is analyzed at a time.
    pub async fn analyze_country(&self, code: &str) -> Result<CountryResult, AnalysisError> {
        if let Some(key) = self.missing_key {
            return Err(AnalysisError::MissingConfig(key));
        }

        let _turn = self.gate.lock().await;

        let code = code.trim().to_uppercase();
        let query = self.query.with_terms(countries::topic_terms(&code));
        let strategies = (self.ladder)(&code)?;
        info!(target: TARGET_CAMPAIGN, "Searching news for {}: {}", countries::display_name(&code), query.topic());

        let aggregation = self.engine.run(&query, &strategies).await?;
        let recommendation = self.policy.decide(&aggregation.tally);

        let result = CountryResult {
            country_code: code,
            total_articles: aggregation.articles.len(),
            articles: aggregation.articles,
            tally: aggregation.tally,
            recommendation,
            unclassified: aggregation.unclassified,
            strategy: aggregation.strategy,
        };
        debug_assert!(result.is_consistent());
        Ok(result)
    }

    /// Analyze each country in order, pacing between them.
    pub async fn run_campaign(
        &self,
        codes: &[String],
        cancel: watch::Receiver<bool>,
    ) -> CampaignReport {
        self.runner
            .run_all(codes, cancel, |code| async move {
                self.analyze_country(&code).await
            })
            .await
    }
}
