use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing::info;
use workload_pricing::{
    catalog::InstanceCatalog,
    config::{self, Config},
    logging::mask_token,
};

/// Execute the config show command
///
/// Displays the effective configuration with the API token masked
pub fn show(config_path: Option<&Path>) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    // Show what would be used even if it does not validate yet
    let cfg = config::read_config(config_path, std::env::vars().collect())?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: Option<&Path>) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration");

    let cfg = config::load_config(config_path)?;
    let catalog = InstanceCatalog::load(cfg.catalog.path.as_deref())?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  {}: {}", "API Token".cyan(), mask_token(&cfg.pricing.api_token));
    println!(
        "  {}: {} ({}s timeout)",
        "Infrastructure API".cyan(),
        cfg.pricing.infrastructure.base_url,
        cfg.pricing.infrastructure.timeout_seconds
    );
    println!(
        "  {}: {} ({}s timeout)",
        "Platform price list".cyan(),
        cfg.pricing.platform.pricing_url,
        cfg.pricing.platform.timeout_seconds
    );
    println!(
        "  {}: {}, {}, {}",
        "Defaults".cyan(),
        cfg.defaults.region()?,
        cfg.defaults.compute_type()?,
        cfg.defaults.plan()?
    );
    println!(
        "  {}: {} instance types ({})",
        "Catalog".cyan(),
        catalog.len(),
        cfg.catalog
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "embedded".to_string())
    );

    info!("Configuration validation successful");
    Ok(())
}

/// Mask secrets in configuration for safe display
fn sanitize_secrets(cfg: &Config) -> Config {
    let mut sanitized = cfg.clone();
    sanitized.pricing.api_token = mask_token(&sanitized.pricing.api_token);
    sanitized
}
