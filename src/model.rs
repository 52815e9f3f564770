// Core structs: Listing, BatchResult, and the error taxonomy
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    #[default]
    Sale,
    Rent,
}

/// A normalized machine listing. Only `source_url` is guaranteed; every other
/// field is `None` when the page did not carry it or it failed to parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub model: Option<String>,
    pub contract_type: Option<ContractType>,
    pub make: Option<String>,
    pub manufacture_year: Option<i32>,
    pub usage_hours: Option<i32>,
    pub location_city: Option<String>,
    pub price: Option<Decimal>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub photo_data: Option<String>,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
}

impl Listing {
    pub fn empty(source_url: &str) -> Self {
        Self {
            model: None,
            contract_type: None,
            make: None,
            manufacture_year: None,
            usage_hours: None,
            location_city: None,
            price: None,
            photo_url: None,
            photo_data: None,
            source_url: source_url.to_string(),
        }
    }
}

/// Listings collected by one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub listings: Vec<Listing>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set when the drain timeout or an interruption forced cancellation.
    pub timed_out: bool,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Failure surface of the page-fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page not found")]
    NotFound,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Outcome of an extractor that could not produce a listing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("no listing found at {url}")]
    NotFound { url: String },
    #[error("unexpected page structure at {url}: {cause}")]
    ParseFailure { url: String, cause: String },
    #[error("failed to fetch {url}: {cause}")]
    TransportFailure { url: String, cause: String },
}

impl ExtractionFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionFailure::NotFound { .. } => "NotFound",
            ExtractionFailure::ParseFailure { .. } => "ParseFailure",
            ExtractionFailure::TransportFailure { .. } => "TransportFailure",
        }
    }

    pub fn parse(url: &str, cause: impl Into<String>) -> Self {
        ExtractionFailure::ParseFailure {
            url: url.to_string(),
            cause: cause.into(),
        }
    }

    /// Maps a collaborator error, keeping not-found distinct from transport errors.
    pub fn from_fetch(url: &str, err: FetchError) -> Self {
        match err {
            FetchError::NotFound => ExtractionFailure::NotFound {
                url: url.to_string(),
            },
            other => ExtractionFailure::TransportFailure {
                url: url.to_string(),
                cause: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
