use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::codes::normalize_code;
use crate::config::GdpLayout;
use crate::error::ReconError;
use crate::source::{line_of, reader};

/// One cell of the GDP series.
#[derive(Debug, Clone, PartialEq)]
pub enum GdpCell {
    /// Raw text is kept so the enriched table reproduces the source verbatim.
    Figure { raw: String, value: f64 },
    Unavailable,
}

impl GdpCell {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(value) if !raw.is_empty() && value.is_finite() => Self::Figure {
                raw: raw.to_string(),
                value,
            },
            _ => Self::Unavailable,
        }
    }

    pub fn figure(&self) -> Option<&str> {
        match self {
            Self::Figure { raw, .. } => Some(raw),
            Self::Unavailable => None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Figure { value, .. } => Some(*value),
            Self::Unavailable => None,
        }
    }
}

/// Year label (as written in the source header) -> GDP cell.
pub type YearMap = BTreeMap<String, GdpCell>;

/// GDP series indexed by country name and by country code. Both indices
/// share the same `Arc<YearMap>` for a given source row.
#[derive(Debug, Default)]
pub struct GdpIndex {
    by_name: HashMap<String, Arc<YearMap>>,
    by_code: HashMap<String, Arc<YearMap>>,
    rows: usize,
}

impl GdpIndex {
    /// Parse the wide country x year table. `source` names the input in errors.
    pub fn from_csv(source: &str, text: &str, layout: &GdpLayout) -> Result<Self, ReconError> {
        if layout.first_year_column > layout.last_year_column {
            return Err(ReconError::MalformedHeader {
                source: source.into(),
                detail: format!(
                    "first year column {} is after last year column {}",
                    layout.first_year_column, layout.last_year_column
                ),
            });
        }

        // Row numbers in errors count from the header line
        let mut rdr = reader(skip_lines(text, layout.skip_rows));
        let mut records = rdr.records().enumerate();

        let header = match records.next() {
            Some((idx, record)) => record.map_err(|e| ReconError::MalformedRow {
                source: source.into(),
                row: idx + 1,
                detail: e.to_string(),
            })?,
            None => {
                return Err(ReconError::MalformedHeader {
                    source: source.into(),
                    detail: "no header row".into(),
                })
            }
        };

        if header.len() <= layout.last_year_column {
            return Err(ReconError::MalformedHeader {
                source: source.into(),
                detail: format!(
                    "{} columns, but the last year column is {}",
                    header.len(),
                    layout.last_year_column
                ),
            });
        }

        let mut year_labels = Vec::with_capacity(layout.last_year_column + 1 - layout.first_year_column);
        for column in layout.first_year_column..=layout.last_year_column {
            let label = header.get(column).unwrap_or("").trim();
            if !is_year_label(label) {
                return Err(ReconError::MalformedHeader {
                    source: source.into(),
                    detail: format!("column {column} header '{label}' is not a year"),
                });
            }
            year_labels.push((column, label.to_string()));
        }

        let mut index = GdpIndex::default();
        for (idx, record) in records {
            let record = record.map_err(|e| ReconError::MalformedRow {
                source: source.into(),
                row: idx + 1,
                detail: e.to_string(),
            })?;
            if record.len() != header.len() {
                return Err(ReconError::MalformedRow {
                    source: source.into(),
                    row: line_of(&record, idx),
                    detail: format!(
                        "expected {} columns, found {}",
                        header.len(),
                        record.len()
                    ),
                });
            }

            let years: YearMap = year_labels
                .iter()
                .map(|(column, label)| {
                    (label.clone(), GdpCell::parse(record.get(*column).unwrap_or("")))
                })
                .collect();
            let years = Arc::new(years);

            let name = record.get(layout.country_column).unwrap_or("").trim();
            let code = normalize_code(record.get(layout.code_column).unwrap_or(""));
            if !name.is_empty() {
                index.by_name.insert(name.to_string(), Arc::clone(&years));
            }
            if !code.is_empty() {
                index.by_code.insert(code, years);
            }
            index.rows += 1;
        }

        Ok(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<YearMap>> {
        self.by_name.get(name.trim())
    }

    pub fn by_code(&self, code: &str) -> Option<&Arc<YearMap>> {
        self.by_code.get(&normalize_code(code))
    }

    /// Name-keyed series first, code-keyed second. Some historical entities
    /// are only keyed by name upstream.
    pub fn lookup(&self, name: &str, code: &str) -> Option<&Arc<YearMap>> {
        self.by_name(name).or_else(|| self.by_code(code))
    }

    /// Number of source rows (countries and aggregates) loaded.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Drop the first `n` physical lines, blank ones included.
fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(end) => rest = &rest[end + 1..],
            None => return "",
        }
    }
    rest
}

/// Four-digit calendar year, as in World Bank headers.
fn is_year_label(label: &str) -> bool {
    label.len() == 4
        && label.bytes().all(|b| b.is_ascii_digit())
        && label.parse::<u16>().map_or(false, |y| (1800..=2200).contains(&y))
}
