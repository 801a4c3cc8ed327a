use crate::{
    config::PricingConfig,
    error::AppError,
    logging::SensitiveToken,
    pricing::{PriceQuote, PriceSource},
    providers::{build_http_client, check_status, into_quote, parse_price, read_json, PriceFetcher},
    retry::execute_with_retry,
    workload::{Region, WorkloadRequest},
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Parameters of an infrastructure price lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureQuery {
    pub instance_type: String,
    pub region: Region,
}

impl From<&WorkloadRequest> for InfrastructureQuery {
    fn from(request: &WorkloadRequest) -> Self {
        Self {
            instance_type: request.instance_type().to_string(),
            region: request.region(),
        }
    }
}

impl InfrastructureQuery {
    /// On-demand Linux price id for this instance in this region
    pub fn price_id(&self, product_id: &str) -> String {
        format!(
            "{}-{}-on_demand-linux",
            product_id,
            self.region.as_str().replace('-', "_")
        )
    }
}

/// Client for the cloud price list API (hourly on-demand EC2 prices)
pub struct InfrastructurePricingClient {
    client: Client,
    base_url: String,
    api_token: String,
    timeout: Duration,
}

impl InfrastructurePricingClient {
    pub fn new(config: &PricingConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.infrastructure.timeout_seconds);
        Ok(Self::with_client(
            build_http_client(timeout)?,
            &config.infrastructure.base_url,
            &config.api_token,
            timeout,
        ))
    }

    pub fn with_client(client: Client, base_url: &str, api_token: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            timeout,
        }
    }

    /// Hourly price of one instance; never fails
    pub async fn fetch_price(&self, query: &InfrastructureQuery) -> PriceQuote {
        let result = execute_with_retry(PriceSource::Infrastructure, self.timeout, || {
            self.lookup_price(query)
        })
        .await;

        into_quote(PriceSource::Infrastructure, &query.instance_type, result)
    }

    async fn lookup_price(&self, query: &InfrastructureQuery) -> Result<Decimal, AppError> {
        let product_id = self.find_product_id(&query.instance_type).await?;
        let price_id = query.price_id(&product_id);
        let url = format!("{}/v2/products/{}/prices/{}", self.base_url, product_id, price_id);

        let body = self.get_json(&url, &[]).await?;
        extract_hourly_amount(&body, &price_id)
    }

    async fn find_product_id(&self, instance_type: &str) -> Result<String, AppError> {
        let url = format!("{}/v2/products", self.base_url);
        let body = self.get_json(&url, &[("name", instance_type)]).await?;

        body.get("products")
            .and_then(Value::as_array)
            .and_then(|products| products.first())
            .and_then(|product| product.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::InvalidResponse(format!(
                    "Could not find product ID for instance type {}",
                    instance_type
                ))
            })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, AppError> {
        debug!(
            url,
            token = %SensitiveToken::new(&self.api_token),
            "Requesting infrastructure price"
        );

        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        read_json(check_status(response).await?).await
    }
}

#[async_trait]
impl PriceFetcher for InfrastructurePricingClient {
    async fn fetch(&self, request: &WorkloadRequest) -> PriceQuote {
        self.fetch_price(&InfrastructureQuery::from(request)).await
    }
}

/// Pull the hourly USD amount out of a price object
fn extract_hourly_amount(body: &Value, price_id: &str) -> Result<Decimal, AppError> {
    if let Some(currency) = body.get("currency").and_then(Value::as_str) {
        if !currency.eq_ignore_ascii_case("USD") {
            return Err(AppError::InvalidResponse(format!(
                "Price {} is in {}, expected USD",
                price_id, currency
            )));
        }
    }
    if let Some(unit) = body.get("unit").and_then(Value::as_str) {
        if !unit.to_ascii_lowercase().contains("hour") {
            return Err(AppError::InvalidResponse(format!(
                "Price {} is per {}, expected per hour",
                price_id, unit
            )));
        }
    }

    match body.get("amount") {
        Some(amount) if !amount.is_null() => parse_price(amount, "amount"),
        _ => Err(AppError::InvalidResponse(format!("Price {} has no amount", price_id))),
    }
}
