//! News search: wire types, header profiles, retrieval strategies and the
//! first-success orchestrator.

mod client;
mod orchestrator;
mod strategy;
mod types;

pub use self::client::{create_http_client, HeaderProfile, Transport};
pub use self::orchestrator::{FetchOrchestrator, FetchOutcome, OrchestratorConfig};
pub use self::strategy::{
    default_ladder, AlternateTopicsStrategy, HttpStrategy, LadderConfig, RetrievalStrategy,
    SearchEndpoint, DEFAULT_SEARCH_URL,
};
pub use self::types::*;

#[cfg(test)]
pub(crate) use self::orchestrator::tests::{articles as fake_articles, FakeStrategy};
