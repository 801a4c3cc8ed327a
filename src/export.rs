//! CSV and JSON export of cost breakdowns.
//!
//! Both formats carry every amount at full precision so an exported
//! breakdown parses back into an identical value. Several breakdowns are
//! exported together with their fleet totals.

use crate::error::AppError;
use crate::pricing::models::BreakdownRecord;
use crate::pricing::{round_currency, CostBreakdown, FleetSummary, LineItem, PriceSource};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RowKind {
    Line,
    Subtotal,
    Total,
    Hourly,
    Warning,
}

/// One flat CSV record
///
/// `estimate` numbers the breakdown a row belongs to, starting at 1; fleet
/// rows leave it empty. Amounts are kept as text; the csv deserializer
/// would otherwise infer them as floats.
#[derive(Debug, Serialize, Deserialize)]
struct ExportRow {
    estimate: Option<usize>,
    kind: RowKind,
    source: Option<PriceSource>,
    label: String,
    instances: Option<u64>,
    hours: Option<String>,
    quantity: Option<String>,
    unit_price: Option<String>,
    amount: Option<String>,
}

impl ExportRow {
    fn amount(
        estimate: Option<usize>,
        source: Option<PriceSource>,
        kind: RowKind,
        label: &str,
        amount: Decimal,
    ) -> Self {
        Self {
            estimate,
            kind,
            source,
            label: label.to_string(),
            instances: None,
            hours: None,
            quantity: None,
            unit_price: None,
            amount: Some(amount.to_string()),
        }
    }
}

/// JSON layout for more than one breakdown
#[derive(Debug, Serialize, Deserialize)]
struct FleetExport {
    summary: FleetSummary,
    estimates: Vec<CostBreakdown>,
}

fn breakdown_rows(number: usize, breakdown: &CostBreakdown) -> Vec<ExportRow> {
    let estimate = Some(number);
    let mut rows: Vec<ExportRow> = breakdown
        .line_items()
        .iter()
        .map(|line| ExportRow {
            estimate,
            kind: RowKind::Line,
            source: Some(line.source),
            label: line.label.clone(),
            instances: Some(u64::from(breakdown.instance_count())),
            hours: Some(breakdown.hours().to_string()),
            quantity: Some(line.quantity.to_string()),
            unit_price: Some(line.unit_price.to_string()),
            amount: Some(line.line_total.to_string()),
        })
        .collect();

    rows.extend([
        ExportRow::amount(
            estimate,
            Some(PriceSource::Infrastructure),
            RowKind::Subtotal,
            "Infrastructure subtotal",
            breakdown.infrastructure_subtotal(),
        ),
        ExportRow::amount(
            estimate,
            Some(PriceSource::Platform),
            RowKind::Subtotal,
            "Platform subtotal",
            breakdown.platform_subtotal(),
        ),
        ExportRow::amount(estimate, None, RowKind::Total, "Grand total", breakdown.grand_total()),
        ExportRow::amount(
            estimate,
            Some(PriceSource::Infrastructure),
            RowKind::Hourly,
            "Infrastructure cost per hour",
            breakdown.infrastructure_cost_per_hour(),
        ),
        ExportRow::amount(
            estimate,
            Some(PriceSource::Platform),
            RowKind::Hourly,
            "Platform cost per hour",
            breakdown.platform_cost_per_hour(),
        ),
        ExportRow::amount(
            estimate,
            None,
            RowKind::Hourly,
            "Total cost per hour",
            breakdown.total_cost_per_hour(),
        ),
    ]);

    rows.extend(breakdown.warnings().iter().map(|warning| ExportRow {
        estimate,
        kind: RowKind::Warning,
        source: None,
        label: warning.clone(),
        instances: None,
        hours: None,
        quantity: None,
        unit_price: None,
        amount: None,
    }));
    rows
}

fn fleet_rows(summary: &FleetSummary) -> Vec<ExportRow> {
    let mut total = ExportRow::amount(None, None, RowKind::Total, "Fleet grand total", summary.grand_total);
    total.instances = Some(summary.total_instances);
    total.quantity = Some(summary.instance_hours.to_string());

    vec![
        ExportRow::amount(
            None,
            Some(PriceSource::Infrastructure),
            RowKind::Subtotal,
            "Fleet infrastructure total",
            summary.infrastructure_total,
        ),
        ExportRow::amount(
            None,
            Some(PriceSource::Platform),
            RowKind::Subtotal,
            "Fleet platform total",
            summary.platform_total,
        ),
        total,
        ExportRow::amount(
            None,
            Some(PriceSource::Infrastructure),
            RowKind::Hourly,
            "Fleet infrastructure cost per hour",
            summary.infrastructure_cost_per_hour,
        ),
        ExportRow::amount(
            None,
            Some(PriceSource::Platform),
            RowKind::Hourly,
            "Fleet platform cost per hour",
            summary.platform_cost_per_hour,
        ),
        ExportRow::amount(
            None,
            None,
            RowKind::Hourly,
            "Fleet total cost per hour",
            summary.total_cost_per_hour,
        ),
    ]
}

pub fn to_csv(breakdown: &CostBreakdown) -> Result<String, AppError> {
    to_csv_all(std::slice::from_ref(breakdown))
}

/// Every breakdown in order; fleet rows follow when there is more than one
pub fn to_csv_all(breakdowns: &[CostBreakdown]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for (index, breakdown) in breakdowns.iter().enumerate() {
        for row in breakdown_rows(index + 1, breakdown) {
            writer.serialize(row)?;
        }
    }
    if breakdowns.len() > 1 {
        for row in fleet_rows(&FleetSummary::from_breakdowns(breakdowns)?) {
            writer.serialize(row)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Export(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Export(format!("CSV is not UTF-8: {}", e)))
}

/// Rows of one estimate, gathered before validation
#[derive(Default)]
struct PendingBreakdown {
    lines: Vec<LineItem>,
    shape: Option<(u32, Decimal)>,
    subtotals: Vec<(PriceSource, Decimal)>,
    grand_total: Option<Decimal>,
    hourly: Vec<(Option<PriceSource>, Decimal)>,
    warnings: BTreeSet<String>,
}

impl PendingBreakdown {
    fn push(&mut self, row: ExportRow) -> Result<(), AppError> {
        match row.kind {
            RowKind::Line => {
                let instances = row
                    .instances
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| AppError::Export(format!("Row '{}' has no valid instance count", row.label)))?;
                let shape = (instances, parse_amount(row.hours.as_deref(), "hours")?);
                if self.shape.is_some_and(|seen| seen != shape) {
                    return Err(AppError::Export(format!(
                        "Row '{}' disagrees on instance count or hours",
                        row.label
                    )));
                }
                self.shape = Some(shape);
                self.lines.push(LineItem {
                    source: require_source(&row)?,
                    label: row.label.clone(),
                    quantity: parse_amount(row.quantity.as_deref(), "quantity")?,
                    unit_price: parse_amount(row.unit_price.as_deref(), "unit_price")?,
                    line_total: parse_amount(row.amount.as_deref(), "amount")?,
                });
            }
            RowKind::Subtotal => self
                .subtotals
                .push((require_source(&row)?, parse_amount(row.amount.as_deref(), "amount")?)),
            RowKind::Total => {
                if self.grand_total.is_some() {
                    return Err(AppError::Export("Estimate has more than one total row".to_string()));
                }
                self.grand_total = Some(parse_amount(row.amount.as_deref(), "amount")?);
            }
            RowKind::Hourly => self
                .hourly
                .push((row.source, parse_amount(row.amount.as_deref(), "amount")?)),
            RowKind::Warning => {
                self.warnings.insert(row.label);
            }
        }
        Ok(())
    }

    fn finish(self, number: usize) -> Result<CostBreakdown, AppError> {
        let missing = |what: &str| AppError::Export(format!("Estimate {} has no {}", number, what));

        let (instance_count, hours) = self.shape.ok_or_else(|| missing("line rows"))?;
        let grand_total = self.grand_total.ok_or_else(|| missing("total row"))?;
        let subtotal = |source: PriceSource| {
            single(self.subtotals.iter().filter(|(s, _)| *s == source).map(|(_, a)| *a))
                .ok_or_else(|| missing(&format!("single {} subtotal row", source)))
        };
        let hourly = |source: Option<PriceSource>| {
            single(self.hourly.iter().filter(|(s, _)| *s == source).map(|(_, a)| *a))
                .ok_or_else(|| missing("complete set of hourly rows"))
        };

        let record = BreakdownRecord {
            instance_count,
            hours,
            infrastructure_subtotal: subtotal(PriceSource::Infrastructure)?,
            platform_subtotal: subtotal(PriceSource::Platform)?,
            grand_total,
            infrastructure_cost_per_hour: hourly(Some(PriceSource::Infrastructure))?,
            platform_cost_per_hour: hourly(Some(PriceSource::Platform))?,
            total_cost_per_hour: hourly(None)?,
            line_items: self.lines,
            warnings: self.warnings,
        };
        CostBreakdown::try_from(record)
            .map_err(|e| AppError::Export(format!("Estimate {}: {}", number, e)))
    }
}

fn single(mut values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    match (values.next(), values.next()) {
        (Some(value), None) => Some(value),
        _ => None,
    }
}

/// Parse an export holding exactly one breakdown
pub fn from_csv(data: &str) -> Result<CostBreakdown, AppError> {
    exactly_one(from_csv_all(data)?)
}

pub fn from_csv_all(data: &str) -> Result<Vec<CostBreakdown>, AppError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());

    let mut pending: BTreeMap<usize, PendingBreakdown> = BTreeMap::new();
    let mut fleet = Vec::new();

    for record in reader.deserialize::<ExportRow>() {
        let row = record?;
        match row.estimate {
            Some(number) => pending.entry(number).or_default().push(row)?,
            None => fleet.push(row),
        }
    }

    if pending.is_empty() {
        return Err(AppError::Export("CSV has no estimates".to_string()));
    }
    if pending.keys().copied().ne(1..=pending.len()) {
        return Err(AppError::Export("Estimates must be numbered from 1 without gaps".to_string()));
    }

    let breakdowns = pending
        .into_iter()
        .map(|(number, rows)| rows.finish(number))
        .collect::<Result<Vec<_>, _>>()?;

    if !fleet.is_empty() {
        check_fleet_rows(&fleet, &FleetSummary::from_breakdowns(&breakdowns)?)?;
    }
    Ok(breakdowns)
}

/// Fleet rows must match the totals recomputed from the estimates
fn check_fleet_rows(rows: &[ExportRow], summary: &FleetSummary) -> Result<(), AppError> {
    let expected = fleet_rows(summary);
    if rows.len() != expected.len() {
        return Err(AppError::Export(format!(
            "Expected {} fleet rows, found {}",
            expected.len(),
            rows.len()
        )));
    }

    for (row, want) in rows.iter().zip(&expected) {
        let same = row.kind == want.kind
            && row.source == want.source
            && row.instances == want.instances
            && parse_optional(row.quantity.as_deref())? == parse_optional(want.quantity.as_deref())?
            && parse_optional(row.amount.as_deref())? == parse_optional(want.amount.as_deref())?;
        if !same {
            return Err(AppError::Export(format!(
                "Fleet row '{}' does not match its estimates",
                row.label
            )));
        }
    }
    Ok(())
}

fn exactly_one(mut breakdowns: Vec<CostBreakdown>) -> Result<CostBreakdown, AppError> {
    match (breakdowns.pop(), breakdowns.is_empty()) {
        (Some(breakdown), true) => Ok(breakdown),
        _ => Err(AppError::Export(
            "Export holds several estimates; read it as a fleet".to_string(),
        )),
    }
}

fn require_source(row: &ExportRow) -> Result<PriceSource, AppError> {
    row.source
        .ok_or_else(|| AppError::Export(format!("Row '{}' has no source", row.label)))
}

fn parse_amount(value: Option<&str>, field: &str) -> Result<Decimal, AppError> {
    parse_optional(value)?.ok_or_else(|| AppError::Export(format!("Missing '{}'", field)))
}

fn parse_optional(value: Option<&str>) -> Result<Option<Decimal>, AppError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => Decimal::from_str(text)
            .map(Some)
            .map_err(|_| AppError::Export(format!("Not a decimal: {}", text))),
        None => Ok(None),
    }
}

pub fn to_json(breakdown: &CostBreakdown) -> Result<String, AppError> {
    serde_json::to_string_pretty(breakdown)
        .map_err(|e| AppError::Export(format!("Failed to serialize JSON: {}", e)))
}

/// A single breakdown as-is, several under `estimates` with their `summary`
pub fn to_json_all(breakdowns: &[CostBreakdown]) -> Result<String, AppError> {
    if let [breakdown] = breakdowns {
        return to_json(breakdown);
    }
    let export = FleetExport {
        summary: FleetSummary::from_breakdowns(breakdowns)?,
        estimates: breakdowns.to_vec(),
    };
    serde_json::to_string_pretty(&export)
        .map_err(|e| AppError::Export(format!("Failed to serialize JSON: {}", e)))
}

pub fn from_json(data: &str) -> Result<CostBreakdown, AppError> {
    exactly_one(from_json_all(data)?)
}

/// Every breakdown is re-verified while deserializing
pub fn from_json_all(data: &str) -> Result<Vec<CostBreakdown>, AppError> {
    let invalid = |e: serde_json::Error| AppError::Export(format!("Invalid JSON export: {}", e));

    let value: serde_json::Value = serde_json::from_str(data).map_err(invalid)?;
    if value.get("estimates").is_none() {
        let breakdown: CostBreakdown = serde_json::from_value(value).map_err(invalid)?;
        return Ok(vec![breakdown]);
    }

    let export: FleetExport = serde_json::from_value(value).map_err(invalid)?;
    if export.estimates.is_empty() {
        return Err(AppError::Export("JSON export has no estimates".to_string()));
    }
    if FleetSummary::from_breakdowns(&export.estimates)? != export.summary {
        return Err(AppError::Export(
            "Fleet summary does not match its estimates".to_string(),
        ));
    }
    Ok(export.estimates)
}

/// Write one breakdown, or several plus their fleet totals
pub fn write_export(
    path: &Path,
    format: ExportFormat,
    breakdowns: &[CostBreakdown],
) -> Result<(), AppError> {
    if breakdowns.is_empty() {
        return Err(AppError::Export("Nothing to export".to_string()));
    }

    let content = match format {
        ExportFormat::Csv => to_csv_all(breakdowns)?,
        ExportFormat::Json => to_json_all(breakdowns)?,
    };

    std::fs::write(path, content).map_err(|e| {
        AppError::Export(format!("Failed to write {}: {}", path.display(), e))
    })?;

    info!(
        path = %path.display(),
        format = %format,
        estimates = breakdowns.len(),
        "Exported cost breakdown"
    );
    Ok(())
}

pub fn read_export(path: &Path, format: ExportFormat) -> Result<Vec<CostBreakdown>, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::Export(format!("Failed to read {}: {}", path.display(), e)))?;

    match format {
        ExportFormat::Csv => from_csv_all(&content),
        ExportFormat::Json => from_json_all(&content),
    }
}

/// Render a USD amount for display, e.g. `$1,234.57`
pub fn format_currency(amount: Decimal) -> String {
    let rounded = round_currency(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{aggregate, PriceQuote};
    use crate::workload::{ComputeType, PlatformPlan, Region, WorkloadRequest};
    use rust_decimal_macros::dec;

    fn breakdown(infra: Option<Decimal>) -> CostBreakdown {
        let request = WorkloadRequest::new(
            "r5d.4xlarge",
            7,
            dec!(3.3),
            Region::EuWest1,
            PlatformPlan::Enterprise,
            ComputeType::AllPurposeCompute,
        )
        .unwrap();
        let infra_quote = match infra {
            Some(price) => PriceQuote::infrastructure("r5d.4xlarge", price),
            None => PriceQuote::unavailable(
                PriceSource::Infrastructure,
                Some("r5d.4xlarge".into()),
                "HTTP 503",
            ),
        };
        aggregate(&request, &infra_quote, &PriceQuote::platform(dec!(0.248))).unwrap()
    }

    #[test]
    fn test_csv_round_trip_keeps_precision() {
        let original = breakdown(Some(dec!(1.152)));
        let csv = to_csv(&original).unwrap();

        assert!(csv.starts_with(
            "estimate,kind,source,label,instances,hours,quantity,unit_price,amount\n"
        ));
        assert!(csv.contains("1,line,infrastructure,Infrastructure (r5d.4xlarge),7,3.3,23.1,1.152,26.6112"));
        // 7 × 1.152 + 7 × 0.248
        assert!(csv.contains("1,hourly,,Total cost per hour,,,,,9.800"));

        assert_eq!(from_csv(&csv).unwrap(), original);
    }

    #[test]
    fn test_csv_round_trip_with_warning() {
        let original = breakdown(None);
        let csv = to_csv(&original).unwrap();
        assert!(csv.contains("1,warning,,infrastructure price unavailable (HTTP 503)"));

        let parsed = from_csv(&csv).unwrap();
        assert!(parsed.is_partial());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_json_round_trip() {
        let original = breakdown(Some(dec!(1.152)));
        let json = to_json(&original).unwrap();
        assert_eq!(from_json(&json).unwrap(), original);
    }

    #[test]
    fn test_tampered_total_is_rejected() {
        let csv = to_csv(&breakdown(Some(dec!(1.152)))).unwrap();
        let tampered = csv.replace("1,total,,Grand total,,,,,32.34", "1,total,,Grand total,,,,,99.99");
        assert_ne!(csv, tampered);
        assert!(matches!(from_csv(&tampered), Err(AppError::Export(_))));

        let json = to_json(&breakdown(Some(dec!(1.152)))).unwrap();
        let tampered = json.replace("\"32.34\"", "\"40.00\"");
        assert!(from_json(&tampered).is_err());
    }

    const HEADER: &str = "estimate,kind,source,label,instances,hours,quantity,unit_price,amount\n";

    #[test]
    fn test_csv_missing_rows() {
        let csv = format!("{}1,total,,Grand total,,,,,1.00\n", HEADER);
        assert!(from_csv(&csv).is_err());
        assert!(from_csv(HEADER).is_err());
    }

    #[test]
    fn test_amounts_near_decimal_max_are_rejected() {
        // Quantity × unit price and subtotal sums both exceed Decimal's range
        let csv = format!(
            "{}\
             1,line,infrastructure,Infrastructure (m5.xlarge),1,1,70000000000000000000000000000,2,1\n\
             1,line,platform,\"Platform (Jobs Compute, Premium)\",1,1,1,1,1\n\
             1,subtotal,infrastructure,Infrastructure subtotal,,,,,1\n\
             1,subtotal,platform,Platform subtotal,,,,,1\n\
             1,total,,Grand total,,,,,2\n\
             1,hourly,infrastructure,Infrastructure cost per hour,,,,,2\n\
             1,hourly,platform,Platform cost per hour,,,,,1\n\
             1,hourly,,Total cost per hour,,,,,3\n",
            HEADER
        );
        assert!(matches!(from_csv(&csv), Err(AppError::Export(_))));

        let json = r#"{
            "instance_count": 1,
            "hours": "1",
            "infrastructure_subtotal": "70000000000000000000000000000",
            "platform_subtotal": "70000000000000000000000000000",
            "grand_total": "1",
            "infrastructure_cost_per_hour": "1",
            "platform_cost_per_hour": "1",
            "total_cost_per_hour": "2",
            "line_items": [
                { "source": "infrastructure", "label": "a", "quantity": "1",
                  "unit_price": "70000000000000000000000000000",
                  "line_total": "70000000000000000000000000000" },
                { "source": "platform", "label": "b", "quantity": "1",
                  "unit_price": "70000000000000000000000000000",
                  "line_total": "70000000000000000000000000000" }
            ],
            "warnings": []
        }"#;
        assert!(matches!(from_json(json), Err(AppError::Export(_))));
    }

    #[test]
    fn test_several_estimates_round_trip() {
        let estimates = vec![breakdown(Some(dec!(1.152))), breakdown(None)];

        let csv = to_csv_all(&estimates).unwrap();
        assert!(csv.contains(",total,,Fleet grand total,14,,46.2,,"));
        assert_eq!(from_csv_all(&csv).unwrap(), estimates);

        let json = to_json_all(&estimates).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["total_instances"], 14);
        assert_eq!(from_json_all(&json).unwrap(), estimates);

        // A fleet is not a single breakdown
        assert!(from_csv(&csv).is_err());
        assert!(from_json(&json).is_err());
    }

    #[test]
    fn test_tampered_fleet_total_is_rejected() {
        let estimates = vec![breakdown(Some(dec!(1.152))), breakdown(Some(dec!(2)))];

        let csv = to_csv_all(&estimates).unwrap();
        let summary = FleetSummary::from_breakdowns(&estimates).unwrap();
        let line = format!(",total,,Fleet grand total,14,,46.2,,{}", summary.grand_total);
        assert!(csv.contains(&line));
        let tampered = csv.replace(&line, ",total,,Fleet grand total,14,,46.2,,1.00");
        assert!(matches!(from_csv_all(&tampered), Err(AppError::Export(_))));

        let json = to_json_all(&estimates).unwrap();
        let tampered = json.replace("\"total_instances\": 14", "\"total_instances\": 15");
        assert_ne!(json, tampered);
        assert!(from_json_all(&tampered).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("out.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("out")), None);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(1234.567)), "$1,234.57");
        assert_eq!(format_currency(dec!(21)), "$21.00");
        assert_eq!(format_currency(dec!(0.005)), "$0.01");
        assert_eq!(format_currency(dec!(1000000000)), "$1,000,000,000.00");
        assert_eq!(format_currency(dec!(-1234.5)), "-$1,234.50");
        assert_eq!(format_currency(dec!(999)), "$999.00");
    }
}
