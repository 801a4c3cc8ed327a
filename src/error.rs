use reqwest::StatusCode;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed workload request (out-of-range count/hours, unsupported enum value)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unrecognized instance identifier
    #[error("Instance type not found: {0}")]
    NotFound(String),

    /// Quote handed to the aggregator does not match the slot it was passed in
    #[error("Quote mismatch: {0}")]
    QuoteMismatch(String),

    /// Neither pricing source produced a usable quote
    #[error("No pricing data available: {0}")]
    NoPricingData(String),

    /// Computed cost exceeds the sanity bound
    #[error("Cost overflow: {0}")]
    Overflow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Instance catalog could not be loaded
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Export serialization or parsing failed
    #[error("Export error: {0}")]
    Export(String),

    /// Upstream API answered with a non-success status
    #[error("Upstream error ({status}): {message}")]
    UpstreamError { status: StatusCode, message: String },

    /// Upstream call did not finish within its time budget
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Upstream API answered, but not with something we can price from
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// HTTP request error (preserves reqwest::Error for transient detection)
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(format!("JSON error: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        Self::Export(format!("CSV error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Short machine-readable name, used as a log/metrics label
pub fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::Validation(_) => "validation_error",
        AppError::NotFound(_) => "not_found",
        AppError::QuoteMismatch(_) => "quote_mismatch",
        AppError::NoPricingData(_) => "no_pricing_data",
        AppError::Overflow(_) => "overflow",
        AppError::Config(_) => "config_error",
        AppError::Catalog(_) => "catalog_error",
        AppError::Export(_) => "export_error",
        AppError::UpstreamError { .. } => "upstream_error",
        AppError::Timeout { .. } => "timeout",
        AppError::InvalidResponse(_) => "invalid_response",
        AppError::HttpRequest(_) => "http_request_error",
    }
}
