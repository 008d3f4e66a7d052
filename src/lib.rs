pub mod analysis;
pub mod classifier;
pub mod countries;
pub mod environment;
pub mod error;
pub mod logging;
pub mod news;
pub mod pipeline;
pub mod sentiment;
pub mod status;
pub mod web;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_CLASSIFIER: &str = "classifier_request";
pub const TARGET_CAMPAIGN: &str = "campaign";

pub use analysis::{
    AggregationEngine, CampaignReport, CountryCampaignRunner, CountryResult, FailurePolicy,
    Recommendation, RecommendationPolicy,
};
pub use classifier::{Classifier, ClassifierClient, Prediction};
pub use error::{AnalysisError, ClassifierError, StrategyError, StrategyFailure};
pub use news::{Article, FetchOrchestrator, RetrievalStrategy, SearchQuery};
pub use pipeline::SentimentPipeline;
pub use sentiment::{MappedSentiment, SentimentLabel, SentimentMapper, SentimentTally};
