//! Client for the hosted text-classification service.
//!
//! One POST per input string with body `{"inputs": "..."}`. The service
//! answers either with a ranked candidate list (`[[{label, score}, ...]]`),
//! a flat list, or a single `{label, score}` object; while the model is cold
//! it answers `{"error": "... is currently loading", "estimated_time": ...}`.

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::ClassifierError;
use crate::TARGET_CLASSIFIER;

pub const DEFAULT_CLASSIFIER_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "siebert/sentiment-roberta-large-english";
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(15);

/// Best label for one input and the score the service gave it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, timeout: Duration) -> Result<Prediction, ClassifierError>;
}

#[derive(Debug, Clone)]
pub struct ClassifierClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ClassifierClient {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }

    async fn post(&self, text: &str) -> Result<(u16, String), reqwest::Error> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({ "inputs": text }))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl Classifier for ClassifierClient {
    async fn classify(
        &self,
        text: &str,
        request_timeout: Duration,
    ) -> Result<Prediction, ClassifierError> {
        let started = Instant::now();
        debug!(target: TARGET_CLASSIFIER, model = %self.model, "Sending inference request: {}", text);

        let (status, body) = match timeout(request_timeout, self.post(text)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(target: TARGET_CLASSIFIER, model = %self.model, "Inference request failed: {}", err);
                return Err(ClassifierError::UpstreamUnavailable(err.to_string()));
            }
            Err(_) => {
                warn!(target: TARGET_CLASSIFIER, model = %self.model, "Inference request timed out after {:?}", request_timeout);
                return Err(ClassifierError::UpstreamUnavailable(format!(
                    "timed out after {}ms",
                    request_timeout.as_millis()
                )));
            }
        };

        let result = parse_inference_body(status, &body);
        debug!(
            target: TARGET_CLASSIFIER,
            model = %self.model,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inference response: {:?}",
            result
        );
        result
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    label: String,
    score: f64,
}

/// Interprets one inference reply. `status` is the HTTP status code.
pub fn parse_inference_body(status: u16, body: &str) -> Result<Prediction, ClassifierError> {
    let success = (200..300).contains(&status);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) if success => {
            return Err(ClassifierError::MalformedResponse(format!(
                "body is not JSON: {}",
                err
            )))
        }
        Err(_) => {
            return Err(ClassifierError::UpstreamUnavailable(format!(
                "HTTP {}",
                status
            )))
        }
    };

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        if message.to_lowercase().contains("loading") {
            let estimated_secs = value.get("estimated_time").and_then(Value::as_f64);
            return Err(ClassifierError::ModelWarmingUp { estimated_secs });
        }
        if !success {
            return Err(ClassifierError::UpstreamUnavailable(format!(
                "HTTP {}: {}",
                status, message
            )));
        }
        return Err(ClassifierError::MalformedResponse(format!(
            "error payload on success status: {}",
            message
        )));
    }

    if !success {
        return Err(ClassifierError::UpstreamUnavailable(format!(
            "HTTP {}",
            status
        )));
    }

    let candidates: Vec<Candidate> = match value {
        Value::Array(items) => match items.first() {
            Some(Value::Array(_)) => match items.into_iter().next() {
                Some(inner) => decode_candidates(inner)?,
                None => Vec::new(),
            },
            _ => decode_candidates(Value::Array(items))?,
        },
        Value::Object(_) => vec![decode_candidate(value)?],
        other => {
            return Err(ClassifierError::MalformedResponse(format!(
                "unexpected JSON type: {}",
                other
            )))
        }
    };

    let best = candidates
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| ClassifierError::MalformedResponse("no candidates".to_string()))?;

    if !(0.0..=1.0).contains(&best.score) {
        return Err(ClassifierError::MalformedResponse(format!(
            "score {} outside [0, 1]",
            best.score
        )));
    }

    Ok(Prediction {
        label: best.label,
        score: best.score,
    })
}

fn decode_candidates(value: Value) -> Result<Vec<Candidate>, ClassifierError> {
    serde_json::from_value(value)
        .map_err(|err| ClassifierError::MalformedResponse(format!("bad candidate list: {}", err)))
}

fn decode_candidate(value: Value) -> Result<Candidate, ClassifierError> {
    serde_json::from_value(value)
        .map_err(|err| ClassifierError::MalformedResponse(format!("bad candidate: {}", err)))
}
