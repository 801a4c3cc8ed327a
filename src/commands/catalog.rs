use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tracing::info;
use workload_pricing::{
    catalog::{InstanceCatalog, InstanceCategory, InstanceSpec},
    config,
};

/// Catalog commands need no API token, so the config is read unvalidated
fn load_catalog(config_path: Option<&Path>) -> Result<InstanceCatalog> {
    let cfg = config::read_config(config_path, std::env::vars().collect())?;
    Ok(InstanceCatalog::load(cfg.catalog.path.as_deref())?)
}

/// Execute the catalog show command
pub fn show(config_path: Option<&Path>, id: &str) -> Result<()> {
    let catalog = load_catalog(config_path)?;
    let spec = catalog.lookup(id)?;

    println!("{}", spec.identifier.cyan().bold());
    println!("  {}: {}", "Category".cyan(), spec.category);
    println!("  {}: {}", "vCPU".cyan(), spec.vcpu);
    println!("  {}: {} GiB", "Memory".cyan(), spec.memory_gib);
    Ok(())
}

/// Execute the catalog list command
pub fn list(config_path: Option<&Path>, category: Option<&str>) -> Result<()> {
    let catalog = load_catalog(config_path)?;
    let wanted = category.map(str::parse::<InstanceCategory>).transpose()?;

    let groups = catalog.by_category();
    let mut shown = 0;
    for (category, specs) in groups
        .iter()
        .filter(|(category, _)| wanted.map_or(true, |w| w == **category))
    {
        println!("{}", format!("{} ({})", category, specs.len()).bold());
        for spec in specs {
            print_row(spec);
        }
        println!();
        shown += specs.len();
    }

    if shown == 0 {
        println!("{}", "No instance types match".yellow());
    }
    info!(shown, total = catalog.len(), "Listed catalog");
    Ok(())
}

fn print_row(spec: &InstanceSpec) {
    println!(
        "  {:<18} {:>4} vCPU {:>8} GiB",
        spec.identifier, spec.vcpu, spec.memory_gib
    );
}
