#![forbid(unsafe_code)]

//! Antenatal care decision support based on the WHO Digital Adaptation Kit.
//!
//! This crate provides:
//! - Domain types (visit and pregnancy records, alerts, recommendations)
//! - The guideline catalog (decision points, contact schedule, indicators)
//! - Alert generation, next-visit scheduling and indicator aggregation
//! - Configuration, logging and CSV export for the command-line tools

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod alerts;
pub mod schedule;
pub mod indicators;
pub mod report;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::{Config, OutputFormat};
pub use alerts::generate_alerts;
pub use schedule::recommend_next_visit;
pub use indicators::compute_indicators;
pub use report::write_indicators_csv;
pub use engine::Engine;
