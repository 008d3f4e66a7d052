//! Type definitions for the sentiment module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical sentiment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
            SentimentLabel::Negative => write!(f, "Negative"),
        }
    }
}

impl SentimentLabel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "neutral" => Some(SentimentLabel::Neutral),
            "negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

/// Result of mapping a raw classifier label.
///
/// Labels that match no synonym are carried through verbatim instead of
/// being forced into a bucket, so they stay visible in the output and do not
/// count toward any tally bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappedSentiment {
    Canonical(SentimentLabel),
    Passthrough(String),
}

impl MappedSentiment {
    pub fn canonical(&self) -> Option<SentimentLabel> {
        match self {
            MappedSentiment::Canonical(label) => Some(*label),
            MappedSentiment::Passthrough(_) => None,
        }
    }
}

impl fmt::Display for MappedSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedSentiment::Canonical(label) => write!(f, "{}", label),
            MappedSentiment::Passthrough(raw) => write!(f, "{}", raw),
        }
    }
}

/// Three-bucket count of classified articles for one country.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentTally {
    pub fn new(positive: u32, neutral: u32, negative: u32) -> Self {
        Self {
            positive,
            neutral,
            negative,
        }
    }

    pub fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
    }

    /// Number of articles that landed in a bucket.
    pub fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}
