//! Athlete-events table parsing and header preparation.

use crate::config::AthleteLayout;
use crate::error::ReconError;
use crate::source::{line_of, reader};

/// A data row with the 1-based source line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthleteRow {
    pub line: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AthleteTable {
    pub header: Vec<String>,
    pub rows: Vec<AthleteRow>,
}

impl AthleteTable {
    /// Parse the athlete table. When the header lacks only the GDP and/or
    /// continent columns at its end, their labels are appended and short rows
    /// are padded to match.
    pub fn parse(source: &str, text: &str, layout: &AthleteLayout) -> Result<Self, ReconError> {
        let mut rdr = reader(text);
        let mut records = rdr.records().enumerate();

        let mut header: Vec<String> = match records.next() {
            Some((idx, record)) => record
                .map_err(|e| ReconError::MalformedRow {
                    source: source.into(),
                    row: idx + 1,
                    detail: e.to_string(),
                })?
                .iter()
                .map(str::to_string)
                .collect(),
            None => {
                return Err(ReconError::MalformedHeader {
                    source: source.into(),
                    detail: "no header row".into(),
                })
            }
        };

        let source_width = header.len();
        for label in missing_labels(source, source_width, layout)? {
            header.push(label);
        }
        let width = header.len();

        let mut rows = Vec::new();
        for (idx, record) in records {
            let record = record.map_err(|e| ReconError::MalformedRow {
                source: source.into(),
                row: idx + 1,
                detail: e.to_string(),
            })?;
            let line = line_of(&record, idx);

            let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
            if fields.len() == source_width && source_width < width {
                fields.resize(width, String::new());
            }
            if fields.len() != width {
                return Err(ReconError::MalformedRow {
                    source: source.into(),
                    row: line,
                    detail: format!("expected {width} columns, found {}", fields.len()),
                });
            }
            rows.push(AthleteRow { line, fields });
        }

        Ok(Self { header, rows })
    }
}

/// Labels to append to a header of `width` columns. Only the columns this
/// pipeline fills may be missing.
fn missing_labels(
    source: &str,
    width: usize,
    layout: &AthleteLayout,
) -> Result<Vec<String>, ReconError> {
    let required = layout.required_width();
    if width >= required {
        return Ok(Vec::new());
    }

    (width..required)
        .map(|column| {
            if column == layout.gdp_column {
                Ok(layout.gdp_header.clone())
            } else if column == layout.continent_column {
                Ok(layout.continent_header.clone())
            } else {
                let field = layout
                    .columns()
                    .iter()
                    .find(|(_, c)| *c == column)
                    .map(|(name, _)| format!("athletes.{name}"))
                    .unwrap_or_else(|| format!("column {column}"));
                Err(ReconError::MalformedHeader {
                    source: source.into(),
                    detail: format!("{width} columns, but {field} is column {column}"),
                })
            }
        })
        .collect()
}
