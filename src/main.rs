use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use workload_pricing::{init_tracing, metrics::init_metric_descriptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    init_tracing(args.log_format == cli::LogFormat::Json);
    init_metric_descriptions();

    let config_path = args.config.as_deref();

    // Dispatch to appropriate command handler
    match args.command {
        cli::Commands::Estimate(estimate) => {
            commands::estimate::execute(config_path, estimate).await?;
        }
        cli::Commands::Catalog { action } => match action {
            cli::CatalogCommands::Show { id } => commands::catalog::show(config_path, &id)?,
            cli::CatalogCommands::List { category } => {
                commands::catalog::list(config_path, category.as_deref())?
            }
        },
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(config_path)?,
            cli::ConfigCommands::Validate => commands::config::validate(config_path)?,
        },
        cli::Commands::Version => {
            println!("Workload Pricing Calculator v{}", env!("CARGO_PKG_VERSION"));
            println!("Rust {}", env!("CARGO_PKG_RUST_VERSION"));
        }
    }

    Ok(())
}
