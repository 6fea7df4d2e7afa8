use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::model::DropReason;

/// Kinds of per-row anomaly that leave a country unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    RogueCode,
    NonIsoCountry,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RogueCode => write!(f, "rogue country code"),
            Self::NonIsoCountry => write!(f, "non-ISO-3166 country"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnresolvedCountry {
    pub code: String,
    pub name: String,
    pub reason: Anomaly,
}

/// One fuzzy resolution, kept for review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyAudit {
    pub query: String,
    pub alpha_3: String,
    pub canonical: String,
    pub score: f64,
}

/// Counters and distinct anomalies accumulated over a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub rows_read: usize,
    pub rows_emitted: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    /// Rows dropped for a defunct code. Also counted in `dropped`.
    pub defunct_rows: usize,
    pub unresolved: BTreeSet<UnresolvedCountry>,
    /// GDP-source code -> fuzzy resolution.
    pub fuzzy_matches: BTreeMap<String, FuzzyAudit>,
    pub missing_continents: BTreeSet<String>,
    pub fuzzy_invocations: usize,
    pub cached_codes: usize,
}

impl RunReport {
    pub fn note_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
        if reason == DropReason::DefunctCountry {
            self.defunct_rows += 1;
        }
    }

    /// Returns true the first time this (code, name, reason) is seen.
    pub fn note_unresolved(&mut self, code: &str, name: &str, reason: Anomaly) -> bool {
        self.unresolved.insert(UnresolvedCountry {
            code: code.to_string(),
            name: name.to_string(),
            reason,
        })
    }

    /// Returns true the first time this code is seen.
    pub fn note_missing_continent(&mut self, alpha_3: &str) -> bool {
        self.missing_continents.insert(alpha_3.to_string())
    }

    pub fn note_fuzzy(&mut self, code: &str, audit: FuzzyAudit) {
        self.fuzzy_matches.entry(code.to_string()).or_insert(audit);
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    /// Fold a shard's report into this one. Sets are unioned, counters summed.
    pub fn merge(&mut self, other: RunReport) {
        self.rows_read += other.rows_read;
        self.rows_emitted += other.rows_emitted;
        for (reason, count) in other.dropped {
            *self.dropped.entry(reason).or_insert(0) += count;
        }
        self.defunct_rows += other.defunct_rows;
        self.unresolved.extend(other.unresolved);
        for (code, audit) in other.fuzzy_matches {
            self.fuzzy_matches.entry(code).or_insert(audit);
        }
        self.missing_continents.extend(other.missing_continents);
        self.fuzzy_invocations += other.fuzzy_invocations;
        self.cached_codes = self.cached_codes.max(other.cached_codes);
    }
}
