use std::fmt;

use serde::Serialize;

use crate::evidence::RunReport;

// ---------------------------------------------------------------------------
// Row outcomes
// ---------------------------------------------------------------------------

/// Why an athlete row was left out of the enriched table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Year earlier than the first year of the GDP series.
    BeforeBaseYear,
    /// Code (and name) unknown to the GDP table.
    UnknownGdpCountry,
    /// Country is in the GDP table but the year's cell is empty.
    NoGdpFigure,
    /// No ISO-3166 record for the country, fuzzy matching included.
    NoCanonicalCountry,
    /// Canonical country has no continent in the catalog.
    MissingContinent,
    /// Dissolved state or historical team; expected to be unresolvable.
    DefunctCountry,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeBaseYear => write!(f, "before base year"),
            Self::UnknownGdpCountry => write!(f, "rogue country code"),
            Self::NoGdpFigure => write!(f, "no GDP figure"),
            Self::NoCanonicalCountry => write!(f, "non-ISO-3166 country"),
            Self::MissingContinent => write!(f, "missing continent"),
            Self::DefunctCountry => write!(f, "defunct country"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Enriched(Vec<String>),
    Dropped(DropReason),
}

/// Header plus surviving rows in input order.
#[derive(Debug, Clone)]
pub struct EnrichedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub report: RunReport,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub jobs: usize,
}

impl RunMeta {
    pub fn now(config_name: &str, jobs: usize) -> Self {
        Self {
            config_name: config_name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            jobs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub path: String,
    pub rows: usize,
    /// `blake3:<hex>` of the written bytes.
    pub digest: String,
}

/// Everything a caller needs to audit one run. Serialized as the `--json`
/// document.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub meta: RunMeta,
    pub output: OutputSummary,
    pub report: RunReport,
}
