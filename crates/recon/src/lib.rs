//! `podium-recon`: athlete / GDP / continent reconciliation engine.
//!
//! Loads the GDP series and the country catalog, reconciles athlete country
//! codes against both, and emits the enriched athlete table. No CLI or
//! process-level concerns.

pub mod athletes;
pub mod cache;
pub mod catalog;
pub mod codes;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod evidence;
pub mod gdp;
pub mod matcher;
pub mod model;
pub mod resolve;
pub mod source;

/// Log target for per-row anomalies (rogue codes, fuzzy matches, missing
/// continents). Filter with `RUST_LOG=podium::anomaly=warn`.
pub const ANOMALY_TARGET: &str = "podium::anomaly";

pub use config::PipelineConfig;
pub use engine::{run, run_sharded, write_csv, Pipeline};
pub use error::ReconError;
pub use evidence::RunReport;
pub use model::{DropReason, EnrichedTable, RowOutcome, RunSummary};
