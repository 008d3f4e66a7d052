//! Type definitions for the news module.

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::StrategyError;
use crate::TARGET_WEB_REQUEST;

/// A normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub url: String,
    pub publisher_name: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// The logical search request shared by every strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Topic terms, OR-joined and quoted when rendered.
    pub terms: Vec<String>,
    pub lang: String,
    pub country: Option<String>,
    pub max: u32,
    /// Recency window ending now; `None` omits `from`/`to`.
    pub lookback: Option<ChronoDuration>,
}

impl SearchQuery {
    pub fn new(terms: Vec<String>) -> Self {
        Self {
            terms,
            lang: "en".to_string(),
            country: None,
            max: 8,
            lookback: None,
        }
    }

    /// Same parameters, different topic terms.
    pub fn with_terms(&self, terms: Vec<String>) -> Self {
        Self {
            terms,
            ..self.clone()
        }
    }

    /// `"a" OR "b"`
    pub fn topic(&self) -> String {
        self.terms
            .iter()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(|term| format!("\"{}\"", term))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Query-string parameters without the credential.
    pub fn params(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.topic()),
            ("lang", self.lang.clone()),
        ];
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        params.push(("max", self.max.to_string()));
        // A window reaching past the representable range is left open.
        if let Some(from) = self.lookback.and_then(|lookback| now.checked_sub_signed(lookback)) {
            params.push(("from", from.to_rfc3339_opts(SecondsFormat::Millis, true)));
            params.push(("to", now.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        params
    }
}

/// Search endpoint reply. Either `articles` or `errors` is expected.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub articles: Option<Vec<SearchArticle>>,
    #[serde(default)]
    pub errors: Option<ErrorList>,
}

/// The endpoint reports errors as a list, or keyed by parameter name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorList {
    List(Vec<String>),
    Keyed(BTreeMap<String, String>),
    Single(String),
}

impl ErrorList {
    pub fn into_messages(self) -> Vec<String> {
        match self {
            ErrorList::List(list) => list,
            ErrorList::Keyed(map) => map
                .into_iter()
                .map(|(key, message)| format!("{}: {}", key, message))
                .collect(),
            ErrorList::Single(message) => vec![message],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<SearchSource>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchSource {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<SearchArticle> for Article {
    fn from(raw: SearchArticle) -> Self {
        Article {
            title: raw.title.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            publisher_name: raw.source.and_then(|s| s.name).unwrap_or_default(),
            published_at: raw.published_at.as_deref().and_then(parse_date),
        }
    }
}

/// Parse a timestamp as RFC3339, falling back to a few common layouts.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(date_str) {
        return Some(date.with_timezone(&Utc));
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(date_str) {
        return Some(date.with_timezone(&Utc));
    }

    for format in &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(date) = DateTime::parse_from_str(date_str, format) {
            return Some(date.with_timezone(&Utc));
        }
    }

    None
}

/// Decodes one search reply body.
///
/// Embedded errors win over articles. Hits without a headline are dropped.
/// An empty `articles` list is returned as-is; judging emptiness is left to
/// the caller.
pub fn parse_search_body(body: &str) -> Result<Vec<Article>, StrategyError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|err| StrategyError::Decode(err.to_string()))?;

    if let Some(errors) = response.errors {
        let messages = errors.into_messages();
        if !messages.is_empty() {
            return Err(StrategyError::Upstream(messages));
        }
    }

    match response.articles {
        Some(articles) => {
            let total = articles.len();
            let articles: Vec<Article> = articles
                .into_iter()
                .filter(|raw| raw.title.as_deref().is_some_and(|t| !t.trim().is_empty()))
                .map(Article::from)
                .collect();
            if articles.len() < total {
                debug!(target: TARGET_WEB_REQUEST, "Dropped {} untitled article(s)", total - articles.len());
            }
            Ok(articles)
        }
        None => Err(StrategyError::Decode(
            "response has neither articles nor errors".to_string(),
        )),
    }
}
