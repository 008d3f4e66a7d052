//! Sentiment labels, label normalization and the per-country tally.

mod mapper;
mod types;

pub use self::mapper::SentimentMapper;
pub use self::types::*;
