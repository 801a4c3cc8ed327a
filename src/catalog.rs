//! Static instance-type catalog.
//!
//! Loaded once at startup (embedded dataset by default, or a JSON file named
//! in configuration) and only read afterwards. Lookups are exact-match.

use crate::error::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const EMBEDDED_DATASET: &str = include_str!("../data/instances.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstanceCategory {
    GeneralPurpose,
    ComputeOptimized,
    MemoryOptimized,
    StorageOptimized,
    #[serde(rename = "GPU")]
    Gpu,
    Other,
}

impl InstanceCategory {
    /// Guess a category from the instance family prefix
    pub fn infer(identifier: &str) -> Self {
        let id = identifier.to_ascii_lowercase();
        let has_any = |needles: &[&str]| needles.iter().any(|n| id.contains(n));

        if has_any(&["gpu", "p3", "p4", "g4", "g5"]) {
            Self::Gpu
        } else if has_any(&["c5", "c6", "c7", "compute"]) {
            Self::ComputeOptimized
        } else if has_any(&["r5", "r6", "r7", "x1", "x2", "memory"]) {
            Self::MemoryOptimized
        } else if has_any(&["d2", "d3", "h1", "i3", "storage"]) {
            Self::StorageOptimized
        } else if has_any(&["m5", "m6", "m7", "t3", "t4"]) {
            Self::GeneralPurpose
        } else {
            Self::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::GeneralPurpose => "General Purpose",
            Self::ComputeOptimized => "Compute Optimized",
            Self::MemoryOptimized => "Memory Optimized",
            Self::StorageOptimized => "Storage Optimized",
            Self::Gpu => "GPU Instances",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for InstanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InstanceCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "generalpurpose" | "general" => Ok(Self::GeneralPurpose),
            "computeoptimized" | "compute" => Ok(Self::ComputeOptimized),
            "memoryoptimized" | "memory" => Ok(Self::MemoryOptimized),
            "storageoptimized" | "storage" => Ok(Self::StorageOptimized),
            "gpu" | "gpuinstances" => Ok(Self::Gpu),
            "other" => Ok(Self::Other),
            _ => Err(AppError::Validation(format!("Unknown instance category: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceSpec {
    pub identifier: String,
    pub category: InstanceCategory,
    pub vcpu: u32,
    pub memory_gib: Decimal,
}

/// Dataset row; category is optional and inferred when absent
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    identifier: String,
    #[serde(default)]
    category: Option<InstanceCategory>,
    vcpu: u32,
    memory_gib: Decimal,
}

#[derive(Debug, Clone)]
pub struct InstanceCatalog {
    entries: BTreeMap<String, InstanceSpec>,
}

impl InstanceCatalog {
    /// Catalog compiled into the binary
    pub fn embedded() -> Result<Self, AppError> {
        Self::from_json(EMBEDDED_DATASET)
    }

    /// Load from `path` when given, otherwise the embedded dataset
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Catalog(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&content)?;
        info!("Loaded {} instance types from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let rows: Vec<CatalogEntry> = serde_json::from_str(json)
            .map_err(|e| AppError::Catalog(format!("Failed to parse catalog JSON: {}", e)))?;

        let mut entries = BTreeMap::new();
        for row in rows {
            let identifier = row.identifier.trim().to_string();
            if identifier.is_empty() {
                return Err(AppError::Catalog("Catalog entry with empty identifier".to_string()));
            }
            if row.vcpu == 0 {
                return Err(AppError::Catalog(format!("{}: vCPU count must be positive", identifier)));
            }
            if row.memory_gib <= Decimal::ZERO {
                return Err(AppError::Catalog(format!("{}: memory must be positive", identifier)));
            }

            let category = row
                .category
                .unwrap_or_else(|| InstanceCategory::infer(&identifier));

            let spec = InstanceSpec {
                identifier: identifier.clone(),
                category,
                vcpu: row.vcpu,
                memory_gib: row.memory_gib,
            };
            if entries.insert(identifier.clone(), spec).is_some() {
                return Err(AppError::Catalog(format!("Duplicate instance type: {}", identifier)));
            }
        }

        debug!("Parsed {} catalog entries", entries.len());
        Ok(Self { entries })
    }

    /// Exact-match lookup
    pub fn lookup(&self, identifier: &str) -> Result<&InstanceSpec, AppError> {
        self.entries
            .get(identifier)
            .ok_or_else(|| AppError::NotFound(identifier.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_category(&self) -> BTreeMap<InstanceCategory, Vec<&InstanceSpec>> {
        let mut grouped: BTreeMap<InstanceCategory, Vec<&InstanceSpec>> = BTreeMap::new();
        for spec in self.entries.values() {
            grouped.entry(spec.category).or_default().push(spec);
        }
        grouped
    }
}
