use crate::error::AppError;
use crate::pricing::models::{round_currency, CostBreakdown};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Totals across several estimates (e.g. driver + worker pools)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub estimates: usize,
    pub total_instances: u64,
    pub instance_hours: Decimal,
    pub infrastructure_total: Decimal,
    pub platform_total: Decimal,
    /// Rounded to cents once, after summing the unrounded subtotals
    pub grand_total: Decimal,
    pub infrastructure_percentage: Decimal,
    pub platform_percentage: Decimal,
    /// Cost of running every instance in the fleet for one hour
    pub infrastructure_cost_per_hour: Decimal,
    pub platform_cost_per_hour: Decimal,
    pub total_cost_per_hour: Decimal,
}

impl FleetSummary {
    pub fn from_breakdowns(breakdowns: &[CostBreakdown]) -> Result<Self, AppError> {
        let mut summary = Self {
            estimates: breakdowns.len(),
            ..Self::default()
        };

        for breakdown in breakdowns {
            summary.total_instances += u64::from(breakdown.instance_count());
            add(&mut summary.instance_hours, breakdown.instance_hours())?;
            add(&mut summary.infrastructure_total, breakdown.infrastructure_subtotal())?;
            add(&mut summary.platform_total, breakdown.platform_subtotal())?;
            add(
                &mut summary.infrastructure_cost_per_hour,
                breakdown.infrastructure_cost_per_hour(),
            )?;
            add(&mut summary.platform_cost_per_hour, breakdown.platform_cost_per_hour())?;
            add(&mut summary.total_cost_per_hour, breakdown.total_cost_per_hour())?;
        }

        let total = summary
            .infrastructure_total
            .checked_add(summary.platform_total)
            .ok_or_else(|| AppError::Overflow("fleet total out of range".to_string()))?;
        summary.grand_total = round_currency(total);

        if total > Decimal::ZERO {
            summary.infrastructure_percentage =
                (summary.infrastructure_total / total * dec!(100)).round_dp(2);
            summary.platform_percentage = (summary.platform_total / total * dec!(100)).round_dp(2);
        }

        Ok(summary)
    }
}

fn add(total: &mut Decimal, amount: Decimal) -> Result<(), AppError> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| AppError::Overflow("fleet total out of range".to_string()))?;
    Ok(())
}
