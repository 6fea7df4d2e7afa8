use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::codes::CodeTables;
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// First year covered by the GDP series. Earlier athlete rows are dropped.
    #[serde(default = "default_base_year")]
    pub base_year: i32,
    pub inputs: InputsConfig,
    #[serde(default)]
    pub gdp: GdpLayout,
    #[serde(default)]
    pub athletes: AthleteLayout,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

fn default_name() -> String {
    "athletes-with-gdp".into()
}

fn default_base_year() -> i32 {
    1960
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// File locations, resolved relative to the config file's directory.
#[derive(Debug, Clone, Deserialize)]
pub struct InputsConfig {
    pub gdp: String,
    pub athletes: String,
    /// Country catalog CSV. The bundled catalog is used when absent.
    #[serde(default)]
    pub catalog: Option<String>,
    pub output: String,
}

// ---------------------------------------------------------------------------
// Column layouts
// ---------------------------------------------------------------------------

/// Column positions in the wide country x year GDP table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GdpLayout {
    pub country_column: usize,
    pub code_column: usize,
    pub first_year_column: usize,
    /// Inclusive.
    pub last_year_column: usize,
    /// Physical lines before the header row, blank ones included. World Bank
    /// exports carry four.
    pub skip_rows: usize,
}

impl Default for GdpLayout {
    fn default() -> Self {
        Self {
            country_column: 0,
            code_column: 1,
            first_year_column: 4,
            last_year_column: 65,
            skip_rows: 0,
        }
    }
}

/// Column positions in the athlete-events table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AthleteLayout {
    pub country_column: usize,
    pub code_column: usize,
    pub year_column: usize,
    pub gdp_column: usize,
    pub continent_column: usize,
    /// Separator between nationalities in multi-nation team names.
    pub nationality_delimiter: String,
    /// Header label used when the GDP column has to be appended.
    pub gdp_header: String,
    /// Header label used when the continent column has to be appended.
    pub continent_header: String,
}

impl Default for AthleteLayout {
    fn default() -> Self {
        Self {
            country_column: 6,
            code_column: 7,
            year_column: 9,
            gdp_column: 15,
            continent_column: 16,
            nationality_delimiter: "/".into(),
            gdp_header: "PIB".into(),
            continent_header: "Continent".into(),
        }
    }
}

impl AthleteLayout {
    pub fn columns(&self) -> [(&'static str, usize); 5] {
        [
            ("country_column", self.country_column),
            ("code_column", self.code_column),
            ("year_column", self.year_column),
            ("gdp_column", self.gdp_column),
            ("continent_column", self.continent_column),
        ]
    }

    /// Number of columns a row needs to hold every configured field.
    pub fn required_width(&self) -> usize {
        self.columns().iter().map(|(_, c)| *c).max().unwrap_or(0) + 1
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Minimum score for a fuzzy name match to be accepted.
    pub fuzzy_threshold: f64,
    /// Extra codes treated as defunct, on top of the built-in list.
    pub defunct_codes: Vec<String>,
    /// Extra athlete-source -> GDP-source code remaps.
    pub code_remap: BTreeMap<String, String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            defunct_codes: Vec::new(),
            code_remap: BTreeMap::new(),
        }
    }
}

impl ReconcileConfig {
    pub fn code_tables(&self) -> CodeTables {
        CodeTables::with_overrides(&self.code_remap, &self.defunct_codes)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        // Athlete columns must not overlap
        let mut seen = BTreeSet::new();
        for (field, column) in self.athletes.columns() {
            if !seen.insert(column) {
                return Err(ReconError::ConfigValidation(format!(
                    "athletes.{field} = {column} overlaps another athlete column"
                )));
            }
        }

        if self.athletes.nationality_delimiter.is_empty() {
            return Err(ReconError::ConfigValidation(
                "athletes.nationality_delimiter must not be empty".into(),
            ));
        }

        // GDP year range must be well-formed and sit after the key columns
        let gdp = &self.gdp;
        if gdp.first_year_column > gdp.last_year_column {
            return Err(ReconError::ConfigValidation(format!(
                "gdp.first_year_column ({}) is after gdp.last_year_column ({})",
                gdp.first_year_column, gdp.last_year_column
            )));
        }
        if gdp.country_column == gdp.code_column {
            return Err(ReconError::ConfigValidation(
                "gdp.country_column and gdp.code_column must differ".into(),
            ));
        }
        for (field, column) in [
            ("country_column", gdp.country_column),
            ("code_column", gdp.code_column),
        ] {
            if column >= gdp.first_year_column {
                return Err(ReconError::ConfigValidation(format!(
                    "gdp.{field} ({column}) must precede the year columns"
                )));
            }
        }

        let threshold = self.reconcile.fuzzy_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ReconError::ConfigValidation(format!(
                "reconcile.fuzzy_threshold must be in (0, 1], got {threshold}"
            )));
        }

        for (from, to) in &self.reconcile.code_remap {
            for code in [from, to] {
                if !is_country_code(code) {
                    return Err(ReconError::ConfigValidation(format!(
                        "reconcile.code_remap: '{code}' is not a 3-letter code"
                    )));
                }
            }
        }
        for code in &self.reconcile.defunct_codes {
            if !is_country_code(code) {
                return Err(ReconError::ConfigValidation(format!(
                    "reconcile.defunct_codes: '{code}' is not a 3-letter code"
                )));
            }
        }

        Ok(())
    }
}

fn is_country_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
