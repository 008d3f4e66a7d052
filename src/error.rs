//! Error taxonomy shared by the fetch, classification and analysis layers.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why a single retrieval strategy attempt was rejected.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StrategyError {
    /// Connection, TLS or body-read failure
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Non-success HTTP status from the search endpoint
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// HTTP 200 carrying an embedded `errors` list
    #[error("upstream application error: {}", .0.join("; "))]
    Upstream(Vec<String>),

    /// Body was not a recognizable search response
    #[error("could not decode search response: {0}")]
    Decode(String),

    #[error("search returned no articles")]
    Empty,
}

impl StrategyError {
    /// Coarse bucket of the taxonomy, used in structured error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyError::Transport(_) | StrategyError::Timeout(_) | StrategyError::HttpStatus(_) => {
                "TransportError"
            }
            StrategyError::Upstream(_) => "UpstreamApplicationError",
            StrategyError::Decode(_) => "MalformedResponse",
            StrategyError::Empty => "EmptyResult",
        }
    }
}

/// One entry of the per-strategy cause list.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: StrategyError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The hosted model is still loading. Retriable later.
    #[error("model is warming up{}", warming_hint(.estimated_secs))]
    ModelWarmingUp { estimated_secs: Option<f64> },

    #[error("unexpected classifier response: {0}")]
    MalformedResponse(String),
}

impl ClassifierError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            ClassifierError::ModelWarmingUp { .. } => "ModelWarmingUp",
            ClassifierError::MalformedResponse(_) => "MalformedResponse",
        }
    }
}

/// Failure of one country analysis.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("all {} strategies exhausted for {topic}: {}", .failures.len(), join_failures(.failures))]
    AllStrategiesExhausted {
        topic: String,
        failures: Vec<StrategyFailure>,
    },

    #[error("no articles found for {0}")]
    NoArticlesFound(String),

    #[error("classification of {title:?} failed: {source}")]
    Classification {
        title: String,
        #[source]
        source: ClassifierError,
    },

    #[error("analysis cancelled")]
    Cancelled,

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

fn warming_hint(estimated_secs: &Option<f64>) -> String {
    match estimated_secs {
        Some(secs) => format!(" (ready in ~{:.0}s)", secs),
        None => String::new(),
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

impl AnalysisError {
    /// Pipeline step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            AnalysisError::AllStrategiesExhausted { .. } | AnalysisError::NoArticlesFound(_) => "fetch",
            AnalysisError::Classification { .. } => "classify",
            AnalysisError::Cancelled => "campaign",
            AnalysisError::MissingConfig(_) => "config",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::AllStrategiesExhausted { .. } => "AllStrategiesExhausted",
            AnalysisError::NoArticlesFound(_) => "NoArticlesFound",
            AnalysisError::Classification { source, .. } => source.kind(),
            AnalysisError::Cancelled => "Cancelled",
            AnalysisError::MissingConfig(_) => "MissingConfig",
        }
    }

    /// Structured form for JSON consumers.
    pub fn report(&self) -> ErrorReport {
        let causes = match self {
            AnalysisError::AllStrategiesExhausted { failures, .. } => failures
                .iter()
                .map(|f| StrategyCause {
                    strategy: f.strategy.clone(),
                    kind: f.error.kind(),
                    message: f.error.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };
        ErrorReport {
            step: self.step(),
            kind: self.kind(),
            message: self.to_string(),
            causes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub step: &'static str,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StrategyCause>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyCause {
    pub strategy: String,
    pub kind: &'static str,
    pub message: String,
}
