//! Workload selection: what the user wants priced.
//!
//! A [`WorkloadRequest`] can only be obtained through [`WorkloadRequest::new`],
//! so everything downstream (adapters, aggregator) receives input that already
//! satisfies the count/hours bounds.

use crate::error::AppError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest supported run: one week
pub const MAX_HOURS: Decimal = dec!(168);

/// Supported AWS regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[serde(rename = "us-east-2")]
    UsEast2,
    #[serde(rename = "us-west-1")]
    UsWest1,
    #[serde(rename = "us-west-2")]
    UsWest2,
    #[serde(rename = "eu-west-1")]
    EuWest1,
    #[serde(rename = "eu-central-1")]
    EuCentral1,
    #[serde(rename = "ap-southeast-1")]
    ApSoutheast1,
    #[serde(rename = "ap-northeast-1")]
    ApNortheast1,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::UsEast1,
        Region::UsEast2,
        Region::UsWest1,
        Region::UsWest2,
        Region::EuWest1,
        Region::EuCentral1,
        Region::ApSoutheast1,
        Region::ApNortheast1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsEast1 => "us-east-1",
            Self::UsEast2 => "us-east-2",
            Self::UsWest1 => "us-west-1",
            Self::UsWest2 => "us-west-2",
            Self::EuWest1 => "eu-west-1",
            Self::EuCentral1 => "eu-central-1",
            Self::ApSoutheast1 => "ap-southeast-1",
            Self::ApNortheast1 => "ap-northeast-1",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|region| region.as_str() == wanted)
            .ok_or_else(|| AppError::Validation(format!("Unsupported region: {}", s)))
    }
}

/// Platform subscription tier
///
/// The Standard tier is not sold on AWS, so it is rejected rather than modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformPlan {
    Premium,
    Enterprise,
}

impl PlatformPlan {
    /// Label used by the platform price list
    pub fn label(&self) -> &'static str {
        match self {
            Self::Premium => "Premium",
            Self::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for PlatformPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlatformPlan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            "standard" => Err(AppError::Validation(
                "The Standard plan is not available on AWS; use Premium or Enterprise".to_string(),
            )),
            _ => Err(AppError::Validation(format!("Unsupported plan: {}", s))),
        }
    }
}

/// Platform compute flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComputeType {
    JobsCompute,
    AllPurposeCompute,
    #[serde(rename = "SQLCompute")]
    SqlCompute,
    #[serde(rename = "MLRuntime")]
    MlRuntime,
}

impl ComputeType {
    pub const ALL: [ComputeType; 4] = [
        ComputeType::JobsCompute,
        ComputeType::AllPurposeCompute,
        ComputeType::SqlCompute,
        ComputeType::MlRuntime,
    ];

    /// Label used by the platform price list
    pub fn label(&self) -> &'static str {
        match self {
            Self::JobsCompute => "Jobs Compute",
            Self::AllPurposeCompute => "All-Purpose Compute",
            Self::SqlCompute => "SQL Compute",
            Self::MlRuntime => "ML Runtime",
        }
    }
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ComputeType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "jobscompute" | "jobs" => Ok(Self::JobsCompute),
            "allpurposecompute" | "allpurpose" => Ok(Self::AllPurposeCompute),
            "sqlcompute" | "sql" => Ok(Self::SqlCompute),
            "mlruntime" | "ml" => Ok(Self::MlRuntime),
            _ => Err(AppError::Validation(format!("Unsupported compute type: {}", s))),
        }
    }
}

/// Lowercase and drop separators so "All-Purpose Compute" == "all_purpose_compute"
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A validated request to price `instance_count` instances for `hours`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadRequest {
    instance_type: String,
    instance_count: u32,
    hours: Decimal,
    region: Region,
    plan: PlatformPlan,
    compute_type: ComputeType,
}

impl WorkloadRequest {
    /// Validate and build a request
    ///
    /// Fails with [`AppError::Validation`] when the instance type is blank,
    /// the count is zero, or hours fall outside `(0, 168]`.
    pub fn new(
        instance_type: impl Into<String>,
        instance_count: u32,
        hours: Decimal,
        region: Region,
        plan: PlatformPlan,
        compute_type: ComputeType,
    ) -> Result<Self, AppError> {
        let instance_type = instance_type.into().trim().to_string();

        if instance_type.is_empty() {
            return Err(AppError::Validation("Instance type is required".to_string()));
        }
        if instance_count == 0 {
            return Err(AppError::Validation(
                "Number of instances must be greater than 0".to_string(),
            ));
        }
        if hours <= Decimal::ZERO || hours > MAX_HOURS {
            return Err(AppError::Validation(format!(
                "Hours per run must be between 0 and {} (1 week), got {}",
                MAX_HOURS, hours
            )));
        }

        Ok(Self {
            instance_type,
            instance_count,
            hours,
            region,
            plan,
            compute_type,
        })
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn hours(&self) -> Decimal {
        self.hours
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn plan(&self) -> PlatformPlan {
        self.plan
    }

    pub fn compute_type(&self) -> ComputeType {
        self.compute_type
    }

    /// instance count × hours, bounded by u32::MAX × 168
    pub fn instance_hours(&self) -> Decimal {
        Decimal::from(self.instance_count) * self.hours
    }
}

/// Parse an hours value exactly (no binary float in between)
pub fn parse_hours(s: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(s.trim())
        .map_err(|e| AppError::Validation(format!("Invalid hours value '{}': {}", s, e)))
}
