//! Command implementations for the CLI
//!
//! - estimate: Price one or more workloads
//! - catalog: Browse the instance catalog
//! - config: Configuration display and validation

pub mod catalog;
pub mod config;
pub mod estimate;
