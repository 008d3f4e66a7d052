//! Drives the classifier over fetched headlines and tallies the results.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::{ClassifiedArticle, FailurePolicy};
use crate::classifier::{Classifier, DEFAULT_CLASSIFIER_TIMEOUT};
use crate::error::AnalysisError;
use crate::news::{Article, FetchOrchestrator, RetrievalStrategy, SearchQuery};
use crate::sentiment::{SentimentMapper, SentimentTally};
use crate::TARGET_CLASSIFIER;

pub const DEFAULT_PACE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Pause after each classification call.
    pub pace_delay: Duration,
    pub classify_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pace_delay: DEFAULT_PACE_DELAY,
            classify_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Classified articles of one run and their tally.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub articles: Vec<ClassifiedArticle>,
    pub tally: SentimentTally,
    pub unclassified: usize,
    pub strategy: String,
}

pub struct AggregationEngine {
    orchestrator: FetchOrchestrator,
    classifier: Arc<dyn Classifier>,
    mapper: SentimentMapper,
    config: EngineConfig,
}

impl AggregationEngine {
    pub fn new(
        orchestrator: FetchOrchestrator,
        classifier: Arc<dyn Classifier>,
        mapper: SentimentMapper,
        config: EngineConfig,
    ) -> Self {
        Self {
            orchestrator,
            classifier,
            mapper,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch articles for `query` and classify every headline.
    pub async fn run(
        &self,
        query: &SearchQuery,
        strategies: &[Box<dyn RetrievalStrategy>],
    ) -> Result<Aggregation, AnalysisError> {
        let outcome = self.orchestrator.fetch(query, strategies).await?;
        if outcome.articles.is_empty() {
            return Err(AnalysisError::NoArticlesFound(query.topic()));
        }

        let (articles, tally, unclassified) = self.classify_all(outcome.articles).await?;
        Ok(Aggregation {
            articles,
            tally,
            unclassified,
            strategy: outcome.strategy,
        })
    }

    /// Classify headlines one at a time, pausing between calls.
    ///
    /// Labels the mapper does not know are kept on the article but counted
    /// in no bucket.
    pub async fn classify_all(
        &self,
        articles: Vec<Article>,
    ) -> Result<(Vec<ClassifiedArticle>, SentimentTally, usize), AnalysisError> {
        let mut tally = SentimentTally::default();
        let mut unclassified = 0;
        let mut classified = Vec::with_capacity(articles.len());
        let count = articles.len();

        for (i, article) in articles.into_iter().enumerate() {
            debug!(target: TARGET_CLASSIFIER, "{}/{} Analyzing: {}", i + 1, count, article.title);
            let started = Instant::now();

            match self
                .classifier
                .classify(&article.title, self.config.classify_timeout)
                .await
            {
                Ok(prediction) => {
                    let sentiment = self.mapper.map(&prediction.label);
                    match sentiment.canonical() {
                        Some(label) => tally.record(label),
                        None => {
                            warn!(target: TARGET_CLASSIFIER, "Unmapped label {:?} for {:?}; not counted", prediction.label, article.title);
                            unclassified += 1;
                        }
                    }
                    info!(
                        target: TARGET_CLASSIFIER,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Sentiment {} (score: {:.2}) for {:?}",
                        sentiment,
                        prediction.score,
                        article.title
                    );
                    classified.push(ClassifiedArticle {
                        article,
                        sentiment: Some(sentiment),
                        confidence: Some(prediction.score),
                        raw_label: Some(prediction.label),
                        error: None,
                    });
                }
                Err(err) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        error!(target: TARGET_CLASSIFIER, "Classification failed for {:?}, aborting: {}", article.title, err);
                        return Err(AnalysisError::Classification {
                            title: article.title,
                            source: err,
                        });
                    }
                    FailurePolicy::Skip => {
                        warn!(target: TARGET_CLASSIFIER, "Classification failed for {:?}, skipping: {}", article.title, err);
                        unclassified += 1;
                        classified.push(ClassifiedArticle {
                            article,
                            sentiment: None,
                            confidence: None,
                            raw_label: None,
                            error: Some(err.to_string()),
                        });
                    }
                },
            }

            if !self.config.pace_delay.is_zero() {
                sleep(self.config.pace_delay).await;
            }
        }

        debug!(target: TARGET_CLASSIFIER, "Sentiment summary: positive {}, neutral {}, negative {}, unclassified {}", tally.positive, tally.neutral, tally.negative, unclassified);
        Ok((classified, tally, unclassified))
    }
}
