//! Maps a sentiment tally to a recommendation.

use crate::sentiment::SentimentTally;

use super::types::Recommendation;

pub const DEFAULT_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationPolicy {
    /// Inclusive share a bucket needs to carry the recommendation.
    pub threshold: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl RecommendationPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Positive is checked before Negative; an empty tally is Neutral.
    pub fn decide(&self, tally: &SentimentTally) -> Recommendation {
        let total = tally.total();
        if total == 0 {
            return Recommendation::Neutral;
        }

        let positive_ratio = tally.positive as f64 / total as f64;
        let negative_ratio = tally.negative as f64 / total as f64;

        if positive_ratio >= self.threshold {
            Recommendation::Positive
        } else if negative_ratio >= self.threshold {
            Recommendation::Negative
        } else {
            Recommendation::Neutral
        }
    }
}
