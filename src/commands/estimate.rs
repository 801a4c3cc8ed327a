use crate::cli::EstimateArgs;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing::info;
use workload_pricing::{
    config::{self, DefaultsConfig},
    error::AppError,
    estimator::{Estimate, Estimator, FleetFailure},
    export::{format_currency, write_export, ExportFormat},
    pricing::FleetSummary,
    workload::{parse_hours, ComputeType, PlatformPlan, Region, WorkloadRequest},
};

/// Execute the estimate command
///
/// Prices every requested instance type with the same count and hours.
/// Instances that cannot be priced are reported and skipped.
pub async fn execute(config_path: Option<&Path>, args: EstimateArgs) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let (region, plan, compute_type) = resolve_options(&args, &cfg.defaults)?;
    let hours = parse_hours(&args.hours)?;

    let requests = args
        .instances
        .iter()
        .map(|instance| {
            WorkloadRequest::new(instance, args.count, hours, region, plan, compute_type)
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let estimator = Estimator::from_config(&cfg)?;
    let fleet = estimator.estimate_fleet(&requests).await?;

    for estimate in &fleet.estimates {
        print_estimate(estimate, region);
    }
    print_failures(&fleet.failures);

    if requests.len() > 1 {
        print_summary(&fleet.summary()?);
    }

    if let Some(path) = &args.export {
        let format = args
            .format
            .or_else(|| ExportFormat::from_path(path))
            .unwrap_or(ExportFormat::Csv);
        write_export(path, format, &fleet.breakdowns())?;
        println!(
            "{}",
            format!(
                "✓ Exported {} estimate(s) as {} to {}",
                fleet.estimates.len(),
                format,
                path.display()
            )
            .green()
        );
    }

    info!(
        estimates = fleet.estimates.len(),
        failures = fleet.failures.len(),
        "Estimate complete"
    );
    Ok(())
}

/// Command-line values win over configured defaults
fn resolve_options(
    args: &EstimateArgs,
    defaults: &DefaultsConfig,
) -> Result<(Region, PlatformPlan, ComputeType), AppError> {
    let region = match &args.region {
        Some(region) => region.parse()?,
        None => defaults.region()?,
    };
    let plan = match &args.plan {
        Some(plan) => plan.parse()?,
        None => defaults.plan()?,
    };
    let compute_type = match &args.compute_type {
        Some(compute_type) => compute_type.parse()?,
        None => defaults.compute_type()?,
    };
    Ok((region, plan, compute_type))
}

fn print_estimate(estimate: &Estimate, region: Region) {
    let breakdown = &estimate.breakdown;

    println!();
    println!(
        "{} {} × {} for {} h in {}",
        "Estimate:".bold(),
        breakdown.instance_count(),
        estimate.instance.identifier.cyan(),
        breakdown.hours(),
        region
    );
    println!(
        "  {} {} vCPU, {} GiB ({})",
        "Instance:".dimmed(),
        estimate.instance.vcpu,
        estimate.instance.memory_gib,
        estimate.instance.category
    );
    println!();

    println!(
        "  {:<44} {:>12} {:>14} {:>16}",
        "Item".bold(),
        "Inst-hours".bold(),
        "Unit price".bold(),
        "Amount".bold()
    );
    for line in breakdown.line_items() {
        println!(
            "  {:<44} {:>12} {:>14} {:>16}",
            line.label,
            line.quantity.to_string(),
            format!("${}/h", line.unit_price),
            format_currency(line.line_total)
        );
    }
    println!();
    println!(
        "  {:<44} {:>44}",
        "Infrastructure subtotal",
        format_currency(breakdown.infrastructure_subtotal())
    );
    println!(
        "  {:<44} {:>44}",
        "Platform subtotal",
        format_currency(breakdown.platform_subtotal())
    );
    println!(
        "  {:<44} {:>44}",
        "Grand total".bold(),
        format_currency(breakdown.grand_total()).green().bold()
    );
    println!();
    println!(
        "  {:<44} {:>44}",
        "Fleet cost per hour (infrastructure)",
        format!("${}/h", breakdown.infrastructure_cost_per_hour())
    );
    println!(
        "  {:<44} {:>44}",
        "Fleet cost per hour (platform)",
        format!("${}/h", breakdown.platform_cost_per_hour())
    );
    println!(
        "  {:<44} {:>44}",
        "Fleet cost per hour".bold(),
        format!("${}/h", breakdown.total_cost_per_hour())
    );

    if breakdown.is_partial() {
        println!();
        for warning in breakdown.warnings() {
            println!("  {} {}", "⚠".yellow(), warning.yellow());
        }
    }
}

fn print_failures(failures: &[FleetFailure]) {
    if failures.is_empty() {
        return;
    }
    println!();
    for failure in failures {
        println!(
            "  {} {}: {}",
            "⚠".yellow(),
            failure.instance_type.yellow(),
            failure.error.to_string().yellow()
        );
    }
}

fn print_summary(summary: &FleetSummary) {
    println!();
    println!("{}", "Summary:".bold());
    println!("  {}: {}", "Estimates".cyan(), summary.estimates);
    println!("  {}: {}", "Total instances".cyan(), summary.total_instances);
    println!("  {}: {}", "Instance-hours".cyan(), summary.instance_hours);
    println!(
        "  {}: {} ({}%)",
        "Infrastructure".cyan(),
        format_currency(summary.infrastructure_total),
        summary.infrastructure_percentage
    );
    println!(
        "  {}: {} ({}%)",
        "Platform".cyan(),
        format_currency(summary.platform_total),
        summary.platform_percentage
    );
    println!(
        "  {}: {}",
        "Grand total".cyan(),
        format_currency(summary.grand_total).green().bold()
    );
    println!(
        "  {}: ${}/h (infrastructure ${}/h, platform ${}/h)",
        "Cost per hour".cyan(),
        summary.total_cost_per_hour,
        summary.infrastructure_cost_per_hour,
        summary.platform_cost_per_hour
    );
}
