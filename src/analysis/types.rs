//! Type definitions for the analysis module.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;
use crate::news::Article;
use crate::sentiment::{MappedSentiment, SentimentTally};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Positive => write!(f, "POSITIVE"),
            Recommendation::Negative => write!(f, "NEGATIVE"),
            Recommendation::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// What to do when one headline cannot be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole country, discarding partial results.
    #[default]
    Abort,
    /// Keep the article without a sentiment and continue.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" | "skip-and-continue" => Ok(FailurePolicy::Skip),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

/// An article with the classifier's verdict on its headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedArticle {
    #[serde(flatten)]
    pub article: Article,
    /// `None` only when classification failed under [`FailurePolicy::Skip`].
    pub sentiment: Option<MappedSentiment>,
    pub confidence: Option<f64>,
    pub raw_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassifiedArticle {
    /// Whether this article landed in a tally bucket.
    pub fn is_counted(&self) -> bool {
        self.sentiment
            .as_ref()
            .and_then(MappedSentiment::canonical)
            .is_some()
    }
}

/// Completed analysis of one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryResult {
    pub country_code: String,
    pub articles: Vec<ClassifiedArticle>,
    pub tally: SentimentTally,
    pub recommendation: Recommendation,
    pub total_articles: usize,
    /// Articles kept without a tally bucket: passthrough labels and skipped
    /// classification failures.
    pub unclassified: usize,
    /// Retrieval strategy that produced the articles.
    pub strategy: String,
}

impl CountryResult {
    /// `tally + unclassified == total_articles == articles.len()`
    pub fn is_consistent(&self) -> bool {
        self.total_articles == self.articles.len()
            && self.tally.total() as usize + self.unclassified == self.total_articles
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryFailure {
    pub country_code: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: AnalysisError,
}

fn serialize_error<S: Serializer>(error: &AnalysisError, serializer: S) -> Result<S::Ok, S::Error> {
    error.report().serialize(serializer)
}

/// Outcome of a campaign. Failed countries are reported here instead of
/// aborting the run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignReport {
    pub results: Vec<CountryResult>,
    pub failures: Vec<CountryFailure>,
    pub cancelled: bool,
}

impl CampaignReport {
    /// At least one country failed while others may have succeeded.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
