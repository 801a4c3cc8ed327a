use crate::{
    config::PricingConfig,
    error::AppError,
    pricing::{PriceQuote, PriceSource},
    providers::{build_http_client, check_status, into_quote, parse_price, read_json, PriceFetcher},
    retry::execute_with_retry,
    workload::{ComputeType, PlatformPlan, Region, WorkloadRequest},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Parameters of a platform price lookup
///
/// The published price list has one row per instance type, so the instance
/// type selects the row even though the resulting quote is not tied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformQuery {
    pub instance_type: String,
    pub compute_type: ComputeType,
    pub plan: PlatformPlan,
    pub region: Region,
}

impl From<&WorkloadRequest> for PlatformQuery {
    fn from(request: &WorkloadRequest) -> Self {
        Self {
            instance_type: request.instance_type().to_string(),
            compute_type: request.compute_type(),
            plan: request.plan(),
            region: request.region(),
        }
    }
}

/// One row of the published price list; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct PriceListEntry {
    #[serde(default)]
    instance: Option<String>,
    #[serde(default)]
    compute: Option<String>,
    #[serde(default)]
    plan: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    hourrate: Option<Value>,
}

/// Client for the analytics platform's public price list
pub struct PlatformPricingClient {
    client: Client,
    pricing_url: String,
    timeout: Duration,
}

impl PlatformPricingClient {
    pub fn new(config: &PricingConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.platform.timeout_seconds);
        Ok(Self::with_client(
            build_http_client(timeout)?,
            &config.platform.pricing_url,
            timeout,
        ))
    }

    pub fn with_client(client: Client, pricing_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            pricing_url: pricing_url.to_string(),
            timeout,
        }
    }

    /// Hourly platform price per instance; never fails
    pub async fn fetch_price(&self, query: &PlatformQuery) -> PriceQuote {
        let result = execute_with_retry(PriceSource::Platform, self.timeout, || {
            self.lookup_price(query)
        })
        .await;

        into_quote(PriceSource::Platform, &query.instance_type, result)
    }

    async fn lookup_price(&self, query: &PlatformQuery) -> Result<Decimal, AppError> {
        debug!(url = %self.pricing_url, "Requesting platform price list");

        let response = self
            .client
            .get(&self.pricing_url)
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        let body = read_json(check_status(response).await?).await?;
        let rows = body.as_array().ok_or_else(|| {
            AppError::InvalidResponse("Platform price list is not a JSON array".to_string())
        })?;

        find_hour_rate(rows, query)
    }
}

#[async_trait]
impl PriceFetcher for PlatformPricingClient {
    async fn fetch(&self, request: &WorkloadRequest) -> PriceQuote {
        self.fetch_price(&PlatformQuery::from(request)).await
    }
}

/// Select the row for the query and read its hourly rate
///
/// A row for the exact region wins over a row without a region; rows for
/// other regions never match.
fn find_hour_rate(rows: &[Value], query: &PlatformQuery) -> Result<Decimal, AppError> {
    let mut regionless: Option<PriceListEntry> = None;

    for row in rows {
        // Skip anything that is not an object row
        let Ok(entry) = serde_json::from_value::<PriceListEntry>(row.clone()) else {
            continue;
        };

        if entry.instance.as_deref() != Some(query.instance_type.as_str())
            || entry.compute.as_deref() != Some(query.compute_type.label())
            || entry.plan.as_deref() != Some(query.plan.label())
        {
            continue;
        }

        match entry.region.as_deref() {
            Some(region) if region == query.region.as_str() => return hour_rate(&entry),
            Some(_) => continue,
            None => {
                if regionless.is_none() {
                    regionless = Some(entry);
                }
            }
        }
    }

    match regionless {
        Some(entry) => hour_rate(&entry),
        None => Err(AppError::InvalidResponse(format!(
            "No platform price for {} ({}, {}) in {}",
            query.instance_type,
            query.compute_type.label(),
            query.plan.label(),
            query.region
        ))),
    }
}

fn hour_rate(entry: &PriceListEntry) -> Result<Decimal, AppError> {
    match &entry.hourrate {
        Some(value) if !value.is_null() => parse_price(value, "hourrate"),
        _ => Err(AppError::InvalidResponse(
            "Matching platform price entry has no hourrate".to_string(),
        )),
    }
}
