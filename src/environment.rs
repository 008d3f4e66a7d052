//! Configuration read from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::analysis::{FailurePolicy, DEFAULT_PACE_DELAY};
use crate::classifier::{DEFAULT_CLASSIFIER_BASE_URL, DEFAULT_CLASSIFIER_MODEL};
use crate::countries;
use crate::news::DEFAULT_SEARCH_URL;

/// Split a delimited list, trimming entries and dropping empty ones.
fn split_list(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gnews_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub search_url: String,
    pub classifier_base_url: String,
    pub classifier_model: String,
    pub classifier_timeout: Duration,
    pub lang: String,
    pub news_country: Option<String>,
    pub max_articles: u32,
    pub lookback_hours: Option<i64>,
    pub accept_empty: bool,
    pub pace_delay: Duration,
    pub failure_policy: FailurePolicy,
    pub campaign_countries: Vec<String>,
    pub sentiment_synonyms: Vec<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let campaign_countries = match get("CAMPAIGN_COUNTRIES") {
            Some(list) => split_list(&list, ';'),
            None => countries::all_codes(),
        };

        Ok(Self {
            gnews_api_key: get("GNEWS_API_KEY"),
            huggingface_api_key: get("HUGGINGFACE_API_KEY"),
            search_url: get("GNEWS_BASE_URL").unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            classifier_base_url: get("CLASSIFIER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_BASE_URL.to_string()),
            classifier_model: get("CLASSIFIER_MODEL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string()),
            classifier_timeout: Duration::from_secs(parse_or(
                "CLASSIFIER_TIMEOUT_SECS",
                get("CLASSIFIER_TIMEOUT_SECS"),
                15,
            )?),
            lang: get("NEWS_LANG").unwrap_or_else(|| "en".to_string()),
            news_country: get("NEWS_COUNTRY"),
            max_articles: parse_or("NEWS_MAX", get("NEWS_MAX"), 8)?,
            lookback_hours: get("NEWS_LOOKBACK_HOURS")
                .map(|v| parse_lookback(&v))
                .transpose()?,
            accept_empty: parse_or("NEWS_ACCEPT_EMPTY", get("NEWS_ACCEPT_EMPTY"), false)?,
            pace_delay: Duration::from_millis(parse_or(
                "PACE_DELAY_MS",
                get("PACE_DELAY_MS"),
                DEFAULT_PACE_DELAY.as_millis() as u64,
            )?),
            failure_policy: match get("CLASSIFY_FAILURE_POLICY") {
                Some(v) => v.parse().map_err(anyhow::Error::msg)?,
                None => FailurePolicy::Abort,
            },
            campaign_countries,
            sentiment_synonyms: get("SENTIMENT_SYNONYMS")
                .map(|v| split_list(&v, ';'))
                .unwrap_or_default(),
            port: parse_or("PORT", get("PORT"), 8080)?,
        })
    }
}

/// Longest recency window accepted, one year.
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 365;

fn parse_lookback(value: &str) -> Result<i64> {
    let hours = value
        .parse::<i64>()
        .context("NEWS_LOOKBACK_HOURS must be a whole number of hours")?;
    if !(1..=MAX_LOOKBACK_HOURS).contains(&hours) {
        anyhow::bail!(
            "NEWS_LOOKBACK_HOURS must be between 1 and {}, got {}",
            MAX_LOOKBACK_HOURS,
            hours
        );
    }
    Ok(hours)
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .parse::<T>()
            .with_context(|| format!("Invalid value for {}: {:?}", name, v)),
        None => Ok(default),
    }
}
