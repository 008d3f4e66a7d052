//! Country catalogue: display names and the topics searched for each code.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
    /// Lowercase name used to build topics.
    pub topic_name: &'static str,
}

pub const ASEAN: &[Country] = &[
    Country { code: "BN", name: "Brunei Darussalam", topic_name: "brunei" },
    Country { code: "KH", name: "Cambodia", topic_name: "cambodia" },
    Country { code: "ID", name: "Indonesia", topic_name: "indonesia" },
    Country { code: "LA", name: "Laos", topic_name: "laos" },
    Country { code: "MY", name: "Malaysia", topic_name: "malaysia" },
    Country { code: "MM", name: "Myanmar", topic_name: "myanmar" },
    Country { code: "PH", name: "Philippines", topic_name: "philippines" },
    Country { code: "SG", name: "Singapore", topic_name: "singapore" },
    Country { code: "TH", name: "Thailand", topic_name: "thailand" },
    Country { code: "VN", name: "Vietnam", topic_name: "vietnam" },
];

pub fn lookup(code: &str) -> Option<&'static Country> {
    ASEAN.iter().find(|c| c.code.eq_ignore_ascii_case(code.trim()))
}

pub fn all_codes() -> Vec<String> {
    ASEAN.iter().map(|c| c.code.to_string()).collect()
}

pub fn display_name(code: &str) -> String {
    lookup(code)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| code.to_string())
}

fn topic_name(code: &str) -> String {
    lookup(code)
        .map(|c| c.topic_name.to_string())
        .unwrap_or_else(|| code.trim().to_lowercase())
}

/// Primary search terms for a country.
pub fn topic_terms(code: &str) -> Vec<String> {
    vec![format!("{} government", topic_name(code))]
}

/// Broader topics tried when the primary terms find nothing.
pub fn alternate_topics(code: &str) -> Vec<String> {
    let name = topic_name(code);
    vec![
        format!("{} government", name),
        format!("{} politics", name),
        format!("{} news", name),
        name,
    ]
}
