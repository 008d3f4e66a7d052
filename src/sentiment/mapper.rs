//! Normalizes raw classifier labels into [`SentimentLabel`]s.

use std::collections::HashMap;
use tracing::debug;

use super::types::{MappedSentiment, SentimentLabel};
use crate::TARGET_CLASSIFIER;

/// Synonyms understood out of the box: English and Indonesian model outputs.
const DEFAULT_SYNONYMS: &[(&str, SentimentLabel)] = &[
    ("positive", SentimentLabel::Positive),
    ("positif", SentimentLabel::Positive),
    ("pos", SentimentLabel::Positive),
    ("neutral", SentimentLabel::Neutral),
    ("netral", SentimentLabel::Neutral),
    ("neu", SentimentLabel::Neutral),
    ("negative", SentimentLabel::Negative),
    ("negatif", SentimentLabel::Negative),
    ("neg", SentimentLabel::Negative),
];

#[derive(Debug, Clone)]
pub struct SentimentMapper {
    synonyms: HashMap<String, SentimentLabel>,
}

impl Default for SentimentMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentMapper {
    pub fn new() -> Self {
        let synonyms = DEFAULT_SYNONYMS
            .iter()
            .map(|(raw, label)| (raw.to_string(), *label))
            .collect();
        Self { synonyms }
    }

    /// A mapper that knows only the given synonyms.
    pub fn empty() -> Self {
        Self {
            synonyms: HashMap::new(),
        }
    }

    pub fn with_synonym(mut self, raw: &str, label: SentimentLabel) -> Self {
        self.synonyms.insert(raw.trim().to_lowercase(), label);
        self
    }

    /// Adds `label=Canonical` pairs, e.g. `LABEL_0=Negative`. Malformed
    /// pairs are skipped.
    pub fn with_pairs<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pair in pairs {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((raw, canonical)) if !raw.trim().is_empty() => {
                    match SentimentLabel::parse(canonical) {
                        Some(label) => {
                            self.synonyms.insert(raw.trim().to_lowercase(), label);
                        }
                        None => {
                            debug!(target: TARGET_CLASSIFIER, "Ignoring synonym with unknown sentiment: {}", pair)
                        }
                    }
                }
                _ => {
                    if !pair.trim().is_empty() {
                        debug!(target: TARGET_CLASSIFIER, "Ignoring malformed synonym: {}", pair);
                    }
                }
            }
        }
        self
    }

    /// Case-insensitive lookup; unknown labels come back unchanged.
    pub fn map(&self, raw_label: &str) -> MappedSentiment {
        match self.synonyms.get(&raw_label.trim().to_lowercase()) {
            Some(label) => MappedSentiment::Canonical(*label),
            None => MappedSentiment::Passthrough(raw_label.to_string()),
        }
    }
}
