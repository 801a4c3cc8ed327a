use crate::error::AppError;
use crate::pricing::calculator::MAX_COST_USD;
use crate::workload::MAX_HOURS;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which upstream a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Infrastructure,
    Platform,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Platform => "platform",
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing unit of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    PerHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
}

/// Result of one upstream price lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuoteOutcome {
    Available { unit_price: Decimal },
    Unavailable { reason: String },
}

/// A single normalized price observation from one pricing source, valid or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub source: PriceSource,
    pub unit: PriceUnit,
    pub currency: Currency,
    /// Only infrastructure quotes are tied to an instance type
    pub instance_type: Option<String>,
    pub outcome: QuoteOutcome,
}

impl PriceQuote {
    /// Hourly USD price for one instance of `instance_type`
    pub fn infrastructure(instance_type: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            source: PriceSource::Infrastructure,
            unit: PriceUnit::PerHour,
            currency: Currency::Usd,
            instance_type: Some(instance_type.into()),
            outcome: QuoteOutcome::Available { unit_price },
        }
    }

    /// Hourly USD platform price per instance
    pub fn platform(unit_price: Decimal) -> Self {
        Self {
            source: PriceSource::Platform,
            unit: PriceUnit::PerHour,
            currency: Currency::Usd,
            instance_type: None,
            outcome: QuoteOutcome::Available { unit_price },
        }
    }

    /// A quote recording that `source` could not be priced
    pub fn unavailable(
        source: PriceSource,
        instance_type: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        let instance_type = match source {
            PriceSource::Infrastructure => instance_type,
            PriceSource::Platform => None,
        };
        Self {
            source,
            unit: PriceUnit::PerHour,
            currency: Currency::Usd,
            instance_type,
            outcome: QuoteOutcome::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, QuoteOutcome::Available { .. })
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        match &self.outcome {
            QuoteOutcome::Available { unit_price } => Some(*unit_price),
            QuoteOutcome::Unavailable { .. } => None,
        }
    }

    pub fn raw_error(&self) -> Option<&str> {
        match &self.outcome {
            QuoteOutcome::Available { .. } => None,
            QuoteOutcome::Unavailable { reason } => Some(reason),
        }
    }
}

/// One row of a cost breakdown, attributable to a single pricing source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub source: PriceSource,
    pub label: String,
    /// Instance-hours (instance count × hours)
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// quantity × unit_price, unrounded
    pub line_total: Decimal,
}

/// Cost of a workload across both pricing sources
///
/// Subtotals and line totals are kept at full precision; only
/// `grand_total` is rounded to cents. Deserialized values go through
/// the same arithmetic checks as exports read back from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BreakdownRecord")]
pub struct CostBreakdown {
    instance_count: u32,
    hours: Decimal,
    infrastructure_subtotal: Decimal,
    platform_subtotal: Decimal,
    grand_total: Decimal,
    infrastructure_cost_per_hour: Decimal,
    platform_cost_per_hour: Decimal,
    total_cost_per_hour: Decimal,
    line_items: Vec<LineItem>,
    warnings: BTreeSet<String>,
}

/// Unchecked field-for-field form of [`CostBreakdown`], as read from an export
#[derive(Debug, Clone, Deserialize)]
pub struct BreakdownRecord {
    pub instance_count: u32,
    pub hours: Decimal,
    pub infrastructure_subtotal: Decimal,
    pub platform_subtotal: Decimal,
    pub grand_total: Decimal,
    pub infrastructure_cost_per_hour: Decimal,
    pub platform_cost_per_hour: Decimal,
    pub total_cost_per_hour: Decimal,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub warnings: BTreeSet<String>,
}

impl TryFrom<BreakdownRecord> for CostBreakdown {
    type Error = String;

    fn try_from(record: BreakdownRecord) -> Result<Self, Self::Error> {
        let breakdown = Self {
            instance_count: record.instance_count,
            hours: record.hours,
            infrastructure_subtotal: record.infrastructure_subtotal,
            platform_subtotal: record.platform_subtotal,
            grand_total: record.grand_total,
            infrastructure_cost_per_hour: record.infrastructure_cost_per_hour,
            platform_cost_per_hour: record.platform_cost_per_hour,
            total_cost_per_hour: record.total_cost_per_hour,
            line_items: record.line_items,
            warnings: record.warnings,
        };
        breakdown.verify()?;
        Ok(breakdown)
    }
}

impl CostBreakdown {
    /// Assemble a breakdown from two already-bounded line items
    ///
    /// Hourly fleet costs are unit price × instance count.
    pub(crate) fn new(
        instance_count: u32,
        hours: Decimal,
        infrastructure: LineItem,
        platform: LineItem,
        grand_total: Decimal,
        warnings: BTreeSet<String>,
    ) -> Result<Self, AppError> {
        let count = Decimal::from(instance_count);
        let infrastructure_cost_per_hour = infrastructure
            .unit_price
            .checked_mul(count)
            .ok_or_else(|| AppError::Overflow("infrastructure hourly cost out of range".to_string()))?;
        let platform_cost_per_hour = platform
            .unit_price
            .checked_mul(count)
            .ok_or_else(|| AppError::Overflow("platform hourly cost out of range".to_string()))?;
        let total_cost_per_hour = infrastructure_cost_per_hour
            .checked_add(platform_cost_per_hour)
            .ok_or_else(|| AppError::Overflow("hourly cost out of range".to_string()))?;

        Ok(Self {
            instance_count,
            hours,
            infrastructure_subtotal: infrastructure.line_total,
            platform_subtotal: platform.line_total,
            grand_total,
            infrastructure_cost_per_hour,
            platform_cost_per_hour,
            total_cost_per_hour,
            line_items: vec![infrastructure, platform],
            warnings,
        })
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn hours(&self) -> Decimal {
        self.hours
    }

    /// instance count × hours, the quantity billed on both lines
    pub fn instance_hours(&self) -> Decimal {
        Decimal::from(self.instance_count) * self.hours
    }

    pub fn infrastructure_subtotal(&self) -> Decimal {
        self.infrastructure_subtotal
    }

    pub fn platform_subtotal(&self) -> Decimal {
        self.platform_subtotal
    }

    /// Sum of both subtotals, rounded to 2 decimal places
    pub fn grand_total(&self) -> Decimal {
        self.grand_total
    }

    /// Sum of both subtotals before currency rounding
    pub fn unrounded_total(&self) -> Decimal {
        // Both subtotals are at most MAX_COST_USD on every construction path
        self.infrastructure_subtotal + self.platform_subtotal
    }

    /// Infrastructure cost of the whole fleet for one hour
    pub fn infrastructure_cost_per_hour(&self) -> Decimal {
        self.infrastructure_cost_per_hour
    }

    /// Platform cost of the whole fleet for one hour
    pub fn platform_cost_per_hour(&self) -> Decimal {
        self.platform_cost_per_hour
    }

    pub fn total_cost_per_hour(&self) -> Decimal {
        self.total_cost_per_hour
    }

    /// Infrastructure line first, platform line second
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn warnings(&self) -> &BTreeSet<String> {
        &self.warnings
    }

    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Re-check every derived figure with overflow-safe arithmetic
    fn verify(&self) -> Result<(), String> {
        if self.instance_count == 0 {
            return Err("instance count must be greater than 0".to_string());
        }
        if self.hours <= Decimal::ZERO || self.hours > MAX_HOURS {
            return Err(format!("hours must be between 0 and {}, got {}", MAX_HOURS, self.hours));
        }

        let [infrastructure, platform] = self.line_items.as_slice() else {
            return Err(format!("expected 2 line items, found {}", self.line_items.len()));
        };
        if infrastructure.source != PriceSource::Infrastructure
            || platform.source != PriceSource::Platform
        {
            return Err("line items are out of order".to_string());
        }

        let count = Decimal::from(self.instance_count);
        let instance_hours = self.instance_hours();
        for line in &self.line_items {
            if line.unit_price.is_sign_negative() && !line.unit_price.is_zero() {
                return Err(format!("line '{}' has a negative unit price", line.label));
            }
            if line.quantity != instance_hours {
                return Err(format!(
                    "line '{}' quantity {} is not {} instances × {} h",
                    line.label, line.quantity, self.instance_count, self.hours
                ));
            }
            if line.quantity.checked_mul(line.unit_price) != Some(line.line_total) {
                return Err(format!("line '{}' does not multiply out", line.label));
            }
            if line.line_total > MAX_COST_USD {
                return Err(format!("line '{}' exceeds ${}", line.label, MAX_COST_USD));
            }
        }

        if infrastructure.line_total != self.infrastructure_subtotal
            || platform.line_total != self.platform_subtotal
        {
            return Err("subtotals do not match line items".to_string());
        }
        match self.infrastructure_subtotal.checked_add(self.platform_subtotal) {
            Some(total) if total <= MAX_COST_USD && round_currency(total) == self.grand_total => {}
            _ => {
                return Err(format!(
                    "grand total {} does not match subtotals",
                    self.grand_total
                ))
            }
        }

        let hourly = (
            infrastructure.unit_price.checked_mul(count),
            platform.unit_price.checked_mul(count),
        );
        let expected = match hourly {
            (Some(infra), Some(platform)) => infra
                .checked_add(platform)
                .map(|total| (infra, platform, total)),
            _ => None,
        };
        if expected
            != Some((
                self.infrastructure_cost_per_hour,
                self.platform_cost_per_hour,
                self.total_cost_per_hour,
            ))
        {
            return Err("hourly costs do not match unit prices".to_string());
        }

        Ok(())
    }
}

/// Round a USD amount to cents, half away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
