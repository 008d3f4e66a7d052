//! Headline classification, tallying, recommendation and campaigns.

mod campaign;
mod engine;
mod policy;
mod types;

pub use self::campaign::CountryCampaignRunner;
pub use self::engine::{AggregationEngine, Aggregation, EngineConfig, DEFAULT_PACE_DELAY};
pub use self::policy::{RecommendationPolicy, DEFAULT_THRESHOLD};
pub use self::types::*;

#[cfg(test)]
pub(crate) use self::engine::tests::{prediction, quiet_config, FakeClassifier};
