use crate::catalog::{InstanceCatalog, InstanceSpec};
use crate::config::Config;
use crate::error::AppError;
use crate::pricing::{aggregate, CostBreakdown, FleetSummary, PriceQuote};
use crate::providers::{fetch_quotes, InfrastructurePricingClient, PlatformPricingClient, PriceFetcher};
use crate::workload::WorkloadRequest;
use tracing::{info, warn};

/// Everything produced for one calculation
#[derive(Debug, Clone)]
pub struct Estimate {
    pub instance: InstanceSpec,
    pub infrastructure_quote: PriceQuote,
    pub platform_quote: PriceQuote,
    pub breakdown: CostBreakdown,
}

/// An instance type that could not be priced within a fleet run
#[derive(Debug)]
pub struct FleetFailure {
    pub instance_type: String,
    pub error: AppError,
}

/// Outcome of pricing several instance types in one run
#[derive(Debug, Default)]
pub struct FleetEstimate {
    pub estimates: Vec<Estimate>,
    pub failures: Vec<FleetFailure>,
}

impl FleetEstimate {
    pub fn breakdowns(&self) -> Vec<CostBreakdown> {
        self.estimates.iter().map(|e| e.breakdown.clone()).collect()
    }

    /// Totals over the estimates that succeeded
    pub fn summary(&self) -> Result<FleetSummary, AppError> {
        FleetSummary::from_breakdowns(&self.breakdowns())
    }
}

/// Catalog lookup → concurrent price fetch → aggregation
pub struct Estimator {
    catalog: InstanceCatalog,
    infrastructure: Box<dyn PriceFetcher>,
    platform: Box<dyn PriceFetcher>,
}

impl Estimator {
    pub fn new(
        catalog: InstanceCatalog,
        infrastructure: Box<dyn PriceFetcher>,
        platform: Box<dyn PriceFetcher>,
    ) -> Self {
        Self {
            catalog,
            infrastructure,
            platform,
        }
    }

    /// Build the live adapters and load the catalog named in `cfg`
    pub fn from_config(cfg: &Config) -> Result<Self, AppError> {
        let catalog = InstanceCatalog::load(cfg.catalog.path.as_deref())?;
        Ok(Self::new(
            catalog,
            Box::new(InfrastructurePricingClient::new(&cfg.pricing)?),
            Box::new(PlatformPricingClient::new(&cfg.pricing)?),
        ))
    }

    /// Price a validated request
    ///
    /// Unknown instance types fail with [`AppError::NotFound`] before any
    /// network call is made.
    pub async fn estimate(&self, request: &WorkloadRequest) -> Result<Estimate, AppError> {
        let instance = self.catalog.lookup(request.instance_type())?.clone();
        self.price(request, instance).await
    }

    /// Price several requests, one after another
    ///
    /// Every instance type is looked up before the first fetch, so an
    /// unknown one fails the whole run without network traffic. Pricing
    /// failures after that are collected per instance; the run fails only
    /// when nothing could be priced, with the first failure's error.
    pub async fn estimate_fleet(&self, requests: &[WorkloadRequest]) -> Result<FleetEstimate, AppError> {
        let instances = requests
            .iter()
            .map(|request| self.catalog.lookup(request.instance_type()).cloned())
            .collect::<Result<Vec<_>, AppError>>()?;

        let mut fleet = FleetEstimate::default();
        for (request, instance) in requests.iter().zip(instances) {
            match self.price(request, instance).await {
                Ok(estimate) => fleet.estimates.push(estimate),
                Err(error) => {
                    warn!(
                        instance_type = request.instance_type(),
                        error = %error,
                        "Could not price instance, continuing with the rest"
                    );
                    fleet.failures.push(FleetFailure {
                        instance_type: request.instance_type().to_string(),
                        error,
                    });
                }
            }
        }

        if fleet.estimates.is_empty() {
            return Err(match fleet.failures.into_iter().next() {
                Some(failure) => failure.error,
                None => AppError::Validation("at least one instance type is required".to_string()),
            });
        }
        Ok(fleet)
    }

    async fn price(&self, request: &WorkloadRequest, instance: InstanceSpec) -> Result<Estimate, AppError> {
        info!(
            instance_type = request.instance_type(),
            count = request.instance_count(),
            hours = %request.hours(),
            region = %request.region(),
            "Fetching prices"
        );

        let (infrastructure_quote, platform_quote) =
            fetch_quotes(self.infrastructure.as_ref(), self.platform.as_ref(), request).await;

        let breakdown = aggregate(request, &infrastructure_quote, &platform_quote)?;

        Ok(Estimate {
            instance,
            infrastructure_quote,
            platform_quote,
            breakdown,
        })
    }
}
