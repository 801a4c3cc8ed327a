//! Upstream pricing adapters.
//!
//! Each adapter turns one upstream API into a [`PriceQuote`]. Adapters never
//! return errors: after the retry policy in [`crate::retry`] is exhausted the
//! failure is folded into an unavailable quote, which the aggregator handles.

pub mod infrastructure;
pub mod platform;

pub use infrastructure::{InfrastructurePricingClient, InfrastructureQuery};
pub use platform::{PlatformPricingClient, PlatformQuery};

use crate::error::{error_type_name, AppError};
use crate::metrics;
use crate::pricing::{PriceQuote, PriceSource};
use crate::workload::WorkloadRequest;
use async_trait::async_trait;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// A source of hourly prices for a workload
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetch a fresh quote; failures come back as an unavailable quote
    async fn fetch(&self, request: &WorkloadRequest) -> PriceQuote;
}

/// Fetch both quotes concurrently
pub async fn fetch_quotes(
    infrastructure: &dyn PriceFetcher,
    platform: &dyn PriceFetcher,
    request: &WorkloadRequest,
) -> (PriceQuote, PriceQuote) {
    tokio::join!(infrastructure.fetch(request), platform.fetch(request))
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("workload-pricing/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into an upstream error
pub(crate) async fn check_status(response: Response) -> Result<Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::UpstreamError { status, message })
}

pub(crate) async fn read_json(response: Response) -> Result<Value, AppError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| AppError::InvalidResponse(format!("Failed to decode JSON body: {}", e)))
}

/// Parse a price that may be encoded as a JSON string or number
///
/// Numbers go through their textual form so no binary-float rounding leaks
/// into the decimal. Negative prices are rejected.
pub(crate) fn parse_price(value: &Value, field: &str) -> Result<Decimal, AppError> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(AppError::InvalidResponse(format!(
                "'{}' is not a price: {}",
                field, other
            )))
        }
    };

    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| AppError::InvalidResponse(format!("'{}' is not a price: {}", field, text)))?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::InvalidResponse(format!(
            "'{}' is negative: {}",
            field, price
        )));
    }

    Ok(price.normalize())
}

/// Fold a lookup result into a quote, recording the outcome
pub(crate) fn into_quote(
    source: PriceSource,
    instance_type: &str,
    result: Result<Decimal, AppError>,
) -> PriceQuote {
    match result {
        Ok(unit_price) => {
            metrics::record_quote(source, "available");
            debug!(source = %source, instance_type, unit_price = %unit_price, "Price quote available");
            match source {
                PriceSource::Infrastructure => PriceQuote::infrastructure(instance_type, unit_price),
                PriceSource::Platform => PriceQuote::platform(unit_price),
            }
        }
        Err(e) => {
            metrics::record_quote(source, error_type_name(&e));
            warn!(source = %source, instance_type, error = %e, "Price unavailable");
            PriceQuote::unavailable(source, Some(instance_type.to_string()), e.to_string())
        }
    }
}
