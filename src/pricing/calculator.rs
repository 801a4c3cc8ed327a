use crate::error::AppError;
use crate::pricing::models::{
    round_currency, CostBreakdown, Currency, LineItem, PriceQuote, PriceSource, PriceUnit,
};
use crate::workload::WorkloadRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Largest figure we are willing to report for any subtotal or total (USD)
pub const MAX_COST_USD: Decimal = dec!(1_000_000_000);

pub const INFRASTRUCTURE_UNAVAILABLE: &str = "infrastructure price unavailable";
pub const PLATFORM_UNAVAILABLE: &str = "platform price unavailable";

/// Combine an infrastructure quote and a platform quote into one breakdown
///
/// The request is trusted to be valid (see [`WorkloadRequest::new`]); only the
/// quotes are checked, for structural consistency. A single missing price
/// yields a zeroed line plus a warning, both missing is
/// [`AppError::NoPricingData`].
///
/// This never does I/O and never rounds anything except the grand total, so the
/// same inputs always produce the same breakdown.
pub fn aggregate(
    request: &WorkloadRequest,
    infra_quote: &PriceQuote,
    platform_quote: &PriceQuote,
) -> Result<CostBreakdown, AppError> {
    check_quote(infra_quote, PriceSource::Infrastructure)?;
    check_quote(platform_quote, PriceSource::Platform)?;

    if let Some(quoted) = infra_quote.instance_type.as_deref() {
        if quoted != request.instance_type() {
            return Err(AppError::QuoteMismatch(format!(
                "infrastructure quote is for '{}', request is for '{}'",
                quoted,
                request.instance_type()
            )));
        }
    }

    let mut warnings = BTreeSet::new();

    let (infra_price, platform_price) = match (infra_quote.unit_price(), platform_quote.unit_price()) {
        (Some(infra), Some(platform)) => (infra, platform),
        (None, Some(platform)) => {
            warnings.insert(unavailable_warning(INFRASTRUCTURE_UNAVAILABLE, infra_quote));
            (Decimal::ZERO, platform)
        }
        (Some(infra), None) => {
            warnings.insert(unavailable_warning(PLATFORM_UNAVAILABLE, platform_quote));
            (infra, Decimal::ZERO)
        }
        (None, None) => {
            return Err(AppError::NoPricingData(format!(
                "infrastructure: {}; platform: {}",
                infra_quote.raw_error().unwrap_or("unknown error"),
                platform_quote.raw_error().unwrap_or("unknown error"),
            )));
        }
    };

    let quantity = request.instance_hours();

    let infrastructure = line_item(
        PriceSource::Infrastructure,
        format!("Infrastructure ({})", request.instance_type()),
        quantity,
        infra_price,
    )?;
    let platform = line_item(
        PriceSource::Platform,
        format!(
            "Platform ({}, {})",
            request.compute_type().label(),
            request.plan().label()
        ),
        quantity,
        platform_price,
    )?;

    let total = infrastructure
        .line_total
        .checked_add(platform.line_total)
        .ok_or_else(|| AppError::Overflow("grand total out of range".to_string()))?;
    ensure_within_bound("grand total", total)?;

    let grand_total = round_currency(total);

    debug!(
        instance_type = request.instance_type(),
        infrastructure = %infrastructure.line_total,
        platform = %platform.line_total,
        grand_total = %grand_total,
        partial = !warnings.is_empty(),
        "Aggregated cost breakdown"
    );

    CostBreakdown::new(
        request.instance_count(),
        request.hours(),
        infrastructure,
        platform,
        grand_total,
        warnings,
    )
}

fn check_quote(quote: &PriceQuote, expected: PriceSource) -> Result<(), AppError> {
    if quote.source != expected {
        return Err(AppError::QuoteMismatch(format!(
            "expected a {} quote, got a {} quote",
            expected, quote.source
        )));
    }
    if quote.unit != PriceUnit::PerHour || quote.currency != Currency::Usd {
        return Err(AppError::QuoteMismatch(format!(
            "{} quote must be priced in USD per hour",
            expected
        )));
    }
    if let Some(price) = quote.unit_price() {
        if price.is_sign_negative() && !price.is_zero() {
            return Err(AppError::QuoteMismatch(format!(
                "{} quote has a negative unit price: {}",
                expected, price
            )));
        }
    }
    Ok(())
}

fn line_item(
    source: PriceSource,
    label: String,
    quantity: Decimal,
    unit_price: Decimal,
) -> Result<LineItem, AppError> {
    let line_total = quantity
        .checked_mul(unit_price)
        .ok_or_else(|| AppError::Overflow(format!("{} subtotal out of range", source)))?;
    ensure_within_bound(source.as_str(), line_total)?;

    Ok(LineItem {
        source,
        label,
        quantity,
        unit_price,
        line_total,
    })
}

fn ensure_within_bound(what: &str, amount: Decimal) -> Result<(), AppError> {
    if amount > MAX_COST_USD {
        warn!(what, amount = %amount, "Computed cost exceeds sanity bound");
        return Err(AppError::Overflow(format!(
            "{} of ${} exceeds the ${} limit",
            what, amount, MAX_COST_USD
        )));
    }
    Ok(())
}

fn unavailable_warning(prefix: &str, quote: &PriceQuote) -> String {
    match quote.raw_error() {
        Some(reason) if !reason.is_empty() => format!("{} ({})", prefix, reason),
        _ => prefix.to_string(),
    }
}
