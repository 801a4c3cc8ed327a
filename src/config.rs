use crate::error::AppError;
use crate::workload::{ComputeType, PlatformPlan, Region};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "calculator.toml";
pub const DEFAULT_INFRASTRUCTURE_URL: &str = "https://api.vantage.sh";
pub const DEFAULT_PLATFORM_URL: &str =
    "https://www.databricks.com/en-pricing-assets/data/pricing/AWS.json";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Plain environment variables recognized on top of `CALCULATOR__*`
const PLAIN_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("DEFAULT_REGION", "defaults.region"),
    ("DEFAULT_COMPUTE_TYPE", "defaults.compute_type"),
    ("DEFAULT_PLAN", "defaults.plan"),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub pricing: PricingConfig,
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    /// Bearer token for the infrastructure pricing API
    pub api_token: String,
    pub infrastructure: InfrastructureConfig,
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InfrastructureConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    pub pricing_url: String,
    pub timeout_seconds: u64,
}

/// Request defaults; they only fill in what the user did not specify
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultsConfig {
    pub region: String,
    pub compute_type: String,
    pub plan: String,
}

impl DefaultsConfig {
    pub fn region(&self) -> Result<Region, AppError> {
        self.region.parse()
    }

    pub fn compute_type(&self) -> Result<ComputeType, AppError> {
        self.compute_type.parse()
    }

    pub fn plan(&self) -> Result<PlatformPlan, AppError> {
        self.plan.parse()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Alternative catalog dataset; the embedded one is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Load and validate configuration from the file and the process environment
pub fn load_config(path: Option<&Path>) -> Result<Config, AppError> {
    load_config_with_env(path, std::env::vars().collect())
}

/// Load and validate configuration against an explicit environment map
pub fn load_config_with_env(
    path: Option<&Path>,
    env: HashMap<String, String>,
) -> Result<Config, AppError> {
    let cfg = read_config(path, env)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Merge defaults, the config file and environment without validating
///
/// The file is optional unless `path` was given explicitly.
pub fn read_config(path: Option<&Path>, env: HashMap<String, String>) -> Result<Config, AppError> {
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut builder = config::Config::builder()
        .set_default("pricing.api_token", "")?
        .set_default("pricing.infrastructure.base_url", DEFAULT_INFRASTRUCTURE_URL)?
        .set_default("pricing.infrastructure.timeout_seconds", DEFAULT_TIMEOUT_SECONDS)?
        .set_default("pricing.platform.pricing_url", DEFAULT_PLATFORM_URL)?
        .set_default("pricing.platform.timeout_seconds", DEFAULT_TIMEOUT_SECONDS)?
        .set_default("defaults.region", Region::UsEast1.as_str())?
        .set_default("defaults.compute_type", "JobsCompute")?
        .set_default("defaults.plan", "Premium")?
        .add_source(config::File::from(file.as_path()).required(path.is_some()))
        .add_source(
            config::Environment::with_prefix("CALCULATOR")
                .separator("__")
                .source(Some(env.clone())),
        );

    // API_TOKEN wins over the legacy VANTAGE_API_TOKEN name
    if let Some(token) = env.get("API_TOKEN").or_else(|| env.get("VANTAGE_API_TOKEN")) {
        builder = builder.set_override("pricing.api_token", token.as_str())?;
    }
    for (var, key) in PLAIN_ENV_OVERRIDES {
        if let Some(value) = env.get(var) {
            builder = builder.set_override(key, value.as_str())?;
        }
    }

    let cfg: Config = builder.build()?.try_deserialize()?;
    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<(), AppError> {
    if cfg.pricing.api_token.trim().is_empty() {
        return Err(AppError::Config(
            "API token not found. Set API_TOKEN in the environment or pricing.api_token in the config file"
                .to_string(),
        ));
    }

    if cfg.pricing.infrastructure.timeout_seconds == 0 {
        return Err(AppError::Config(
            "pricing.infrastructure.timeout_seconds must be greater than 0".to_string(),
        ));
    }
    if cfg.pricing.platform.timeout_seconds == 0 {
        return Err(AppError::Config(
            "pricing.platform.timeout_seconds must be greater than 0".to_string(),
        ));
    }

    for (name, url) in [
        ("pricing.infrastructure.base_url", &cfg.pricing.infrastructure.base_url),
        ("pricing.platform.pricing_url", &cfg.pricing.platform.pricing_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Config(format!("{} must be an http(s) URL: {}", name, url)));
        }
    }

    // Defaults must name supported values
    cfg.defaults
        .region()
        .map_err(|e| AppError::Config(format!("defaults.region: {}", e)))?;
    cfg.defaults
        .compute_type()
        .map_err(|e| AppError::Config(format!("defaults.compute_type: {}", e)))?;
    cfg.defaults
        .plan()
        .map_err(|e| AppError::Config(format!("defaults.plan: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn create_test_config() -> Config {
        Config {
            pricing: PricingConfig {
                api_token: "vntg_tkn_test1234".to_string(),
                infrastructure: InfrastructureConfig {
                    base_url: DEFAULT_INFRASTRUCTURE_URL.to_string(),
                    timeout_seconds: 10,
                },
                platform: PlatformConfig {
                    pricing_url: DEFAULT_PLATFORM_URL.to_string(),
                    timeout_seconds: 10,
                },
            },
            defaults: DefaultsConfig {
                region: "us-east-1".to_string(),
                compute_type: "JobsCompute".to_string(),
                plan: "Premium".to_string(),
            },
            catalog: CatalogConfig::default(),
        }
    }

    #[test]
    fn test_defaults_from_environment_only() {
        let cfg = load_config_with_env(None, env(&[("API_TOKEN", "vntg_tkn_abc")])).unwrap();

        assert_eq!(cfg.pricing.api_token, "vntg_tkn_abc");
        assert_eq!(cfg.pricing.infrastructure.base_url, DEFAULT_INFRASTRUCTURE_URL);
        assert_eq!(cfg.pricing.infrastructure.timeout_seconds, 10);
        assert_eq!(cfg.defaults.region().unwrap(), Region::UsEast1);
        assert_eq!(cfg.defaults.compute_type().unwrap(), ComputeType::JobsCompute);
        assert_eq!(cfg.defaults.plan().unwrap(), PlatformPlan::Premium);
        assert!(cfg.catalog.path.is_none());
    }

    #[test]
    fn test_plain_env_overrides() {
        let cfg = load_config_with_env(
            None,
            env(&[
                ("API_TOKEN", "tkn"),
                ("DEFAULT_REGION", "eu-west-1"),
                ("DEFAULT_COMPUTE_TYPE", "SQL Compute"),
                ("DEFAULT_PLAN", "Enterprise"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.defaults.region().unwrap(), Region::EuWest1);
        assert_eq!(cfg.defaults.compute_type().unwrap(), ComputeType::SqlCompute);
        assert_eq!(cfg.defaults.plan().unwrap(), PlatformPlan::Enterprise);
    }

    #[test]
    fn test_legacy_token_name() {
        let cfg = load_config_with_env(None, env(&[("VANTAGE_API_TOKEN", "legacy")])).unwrap();
        assert_eq!(cfg.pricing.api_token, "legacy");

        let cfg = load_config_with_env(
            None,
            env(&[("VANTAGE_API_TOKEN", "legacy"), ("API_TOKEN", "current")]),
        )
        .unwrap();
        assert_eq!(cfg.pricing.api_token, "current");
    }

    #[test]
    fn test_missing_token_rejected() {
        let result = load_config_with_env(None, HashMap::new());
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("API token")));
    }

    #[test]
    fn test_read_config_does_not_validate() {
        let cfg = read_config(None, HashMap::new()).unwrap();
        assert!(cfg.pricing.api_token.is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_defaults() {
        let mut cfg = create_test_config();
        cfg.defaults.plan = "Standard".to_string();
        let err = validate_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("defaults.plan"));

        let mut cfg = create_test_config();
        cfg.defaults.region = "mars-1".to_string();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut cfg = create_test_config();
        cfg.pricing.platform.timeout_seconds = 0;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut cfg = create_test_config();
        cfg.pricing.infrastructure.base_url = "ftp://example.com".to_string();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = load_config_with_env(
            Some(Path::new("/nonexistent/calculator.toml")),
            env(&[("API_TOKEN", "tkn")]),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
