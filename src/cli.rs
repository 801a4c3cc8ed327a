use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use workload_pricing::export::ExportFormat;

#[derive(Parser, Debug)]
#[command(name = "calculator", version, about = "Workload cost calculator")]
pub struct Cli {
    /// Configuration file path (defaults to ./calculator.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Estimate the hourly-billed cost of a workload
    Estimate(EstimateArgs),

    /// Browse the instance catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogCommands,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct EstimateArgs {
    /// Instance type, e.g. m5d.8xlarge (repeat to price several)
    #[arg(short, long = "instance", required = true)]
    pub instances: Vec<String>,

    /// Number of instances
    #[arg(short = 'n', long, default_value = "1")]
    pub count: u32,

    /// Hours of runtime (0 < hours <= 168)
    #[arg(short = 'H', long, default_value = "1")]
    pub hours: String,

    /// Region (falls back to DEFAULT_REGION)
    #[arg(short, long)]
    pub region: Option<String>,

    /// Platform plan (falls back to DEFAULT_PLAN)
    #[arg(short, long)]
    pub plan: Option<String>,

    /// Compute type (falls back to DEFAULT_COMPUTE_TYPE)
    #[arg(long)]
    pub compute_type: Option<String>,

    /// Write the breakdown(s) to this file, with fleet totals for several instances
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Export format (guessed from the file extension if omitted)
    #[arg(short, long, value_enum, requires = "export")]
    pub format: Option<ExportFormat>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CatalogCommands {
    /// Show one instance type
    Show {
        /// Instance type identifier
        id: String,
    },

    /// List instance types, grouped by category
    List {
        /// Only list this category (e.g. "General Purpose", gpu)
        #[arg(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
    Show,

    /// Validate configuration file
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_estimate() {
        let args = vec![
            "calculator",
            "estimate",
            "--instance",
            "m5d.8xlarge",
            "--count",
            "3",
            "--hours",
            "10",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Estimate(args) => {
                assert_eq!(args.instances, vec!["m5d.8xlarge"]);
                assert_eq!(args.count, 3);
                assert_eq!(args.hours, "10");
                assert!(args.region.is_none());
                assert!(args.export.is_none());
            }
            _ => panic!("Expected Estimate command"),
        }
        assert!(cli.config.is_none());
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_cli_parsing_repeated_instances() {
        let args = vec!["calculator", "estimate", "-i", "m5.xlarge", "-i", "r5.2xlarge"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Estimate(args) => assert_eq!(args.instances.len(), 2),
            _ => panic!("Expected Estimate command"),
        }
    }

    #[test]
    fn test_cli_estimate_requires_instance() {
        assert!(Cli::try_parse_from(vec!["calculator", "estimate"]).is_err());
    }

    #[test]
    fn test_cli_format_requires_export() {
        let args = vec!["calculator", "estimate", "-i", "m5.xlarge", "--format", "csv"];
        assert!(Cli::try_parse_from(args).is_err());

        let args = vec![
            "calculator", "estimate", "-i", "m5.xlarge", "--export", "out.txt", "--format", "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Estimate(args) => assert_eq!(args.format, Some(ExportFormat::Json)),
            _ => panic!("Expected Estimate command"),
        }
    }

    #[test]
    fn test_cli_parsing_catalog_list() {
        let args = vec!["calculator", "catalog", "list", "--category", "gpu"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Catalog {
                action: CatalogCommands::List { category },
            } => assert_eq!(category.as_deref(), Some("gpu")),
            _ => panic!("Expected Catalog list command"),
        }
    }

    #[test]
    fn test_cli_parsing_config_show_with_global_flags() {
        let args = vec![
            "calculator",
            "config",
            "show",
            "--config",
            "other.toml",
            "--log-format",
            "json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigCommands::Show
            }
        ));
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
