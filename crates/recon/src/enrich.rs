//! Per-row enrichment.
//!
//! Each row moves through `Pending -> YearFiltered -> CountryResolved ->
//! Enriched`; every transition is a gate that may drop the row instead.
//! Dropped rows never abort the batch. Only rows that cannot be read at all
//! (wrong width, unparseable year) produce an error.

use std::sync::Arc;

use crate::cache::ResolutionCache;
use crate::catalog::CountryRecord;
use crate::engine::Pipeline;
use crate::error::ReconError;
use crate::evidence::{Anomaly, FuzzyAudit, RunReport};
use crate::gdp::YearMap;
use crate::matcher::CountryQuery;
use crate::model::{DropReason, RowOutcome};
use crate::resolve::{Reconciler, Resolution};
use crate::ANOMALY_TARGET;

enum Gate<T> {
    Pass(T),
    Drop(DropReason),
}

struct Pending {
    line: usize,
    fields: Vec<String>,
}

struct YearFiltered {
    fields: Vec<String>,
    year: i32,
}

struct CountryResolved {
    fields: Vec<String>,
    year: i32,
    name: String,
    athlete_code: String,
    gdp_code: String,
    series: Option<Arc<YearMap>>,
    resolution: Resolution,
}

struct Enriched(Vec<String>);

impl Pending {
    fn filter_year(self, pipeline: &Pipeline, source: &str) -> Result<Gate<YearFiltered>, ReconError> {
        let raw = self.fields[pipeline.layout.year_column].trim();
        let year: i32 = raw.parse().map_err(|_| ReconError::MalformedRow {
            source: source.into(),
            row: self.line,
            detail: format!("year '{raw}' is not an integer"),
        })?;

        if year < pipeline.base_year {
            return Ok(Gate::Drop(DropReason::BeforeBaseYear));
        }
        Ok(Gate::Pass(YearFiltered {
            fields: self.fields,
            year,
        }))
    }
}

impl YearFiltered {
    fn resolve_country<C: ResolutionCache>(
        self,
        pipeline: &Pipeline,
        reconciler: &Reconciler<'_, C>,
    ) -> (CountryResolved, bool) {
        let layout = &pipeline.layout;
        let team = &self.fields[layout.country_column];
        let name = team
            .split(layout.nationality_delimiter.as_str())
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        let athlete_code = self.fields[layout.code_column].trim().to_ascii_uppercase();
        let gdp_code = pipeline.codes().remap(&athlete_code);

        let series = pipeline.gdp().lookup(&name, &gdp_code).cloned();
        let (resolution, fresh) = reconciler.resolve(&CountryQuery {
            name: &name,
            gdp_code: &gdp_code,
            athlete_code: &athlete_code,
        });

        let resolved = CountryResolved {
            fields: self.fields,
            year: self.year,
            name,
            athlete_code,
            gdp_code,
            series,
            resolution,
        };
        (resolved, fresh)
    }
}

impl CountryResolved {
    fn figure(&self) -> Option<&str> {
        self.series
            .as_ref()
            .and_then(|years| years.get(&self.year.to_string()))
            .and_then(|cell| cell.figure())
    }

    fn record(&self) -> Option<&Arc<CountryRecord>> {
        self.resolution.matched().map(|m| &m.record)
    }

    /// Every missing piece, in gate order. Empty when the row can be enriched.
    fn gaps(&self, pipeline: &Pipeline) -> Vec<DropReason> {
        let mut gaps = Vec::new();
        match (&self.series, self.figure()) {
            (None, _) => gaps.push(DropReason::UnknownGdpCountry),
            (Some(_), None) => gaps.push(DropReason::NoGdpFigure),
            (Some(_), Some(_)) => {}
        }
        match self.record() {
            None => gaps.push(DropReason::NoCanonicalCountry),
            Some(record) if pipeline.continents().get(&record.alpha_3).is_none() => {
                gaps.push(DropReason::MissingContinent)
            }
            Some(_) => {}
        }
        gaps
    }

    fn enrich(self, pipeline: &Pipeline) -> Gate<Enriched> {
        if let Some(&reason) = self.gaps(pipeline).first() {
            return Gate::Drop(reason);
        }
        let (Some(figure), Some(record)) = (self.figure(), self.record()) else {
            return Gate::Drop(DropReason::NoCanonicalCountry);
        };
        let Some(continent) = pipeline.continents().get(&record.alpha_3) else {
            return Gate::Drop(DropReason::MissingContinent);
        };

        let layout = &pipeline.layout;
        let figure = figure.to_string();
        let name = record.name.clone();
        let alpha_3 = record.alpha_3.clone();
        let continent = continent.to_string();

        let mut fields = self.fields;
        fields[layout.country_column] = name;
        fields[layout.code_column] = alpha_3;
        fields[layout.gdp_column] = figure;
        fields[layout.continent_column] = continent;
        Gate::Pass(Enriched(fields))
    }
}

/// Drives rows through the gates and accumulates the run report.
pub struct Enricher<'a, C> {
    pipeline: &'a Pipeline,
    reconciler: &'a Reconciler<'a, C>,
    source: &'a str,
    width: usize,
    report: RunReport,
}

impl<'a, C: ResolutionCache> Enricher<'a, C> {
    /// `width` is the prepared header width; `source` names the input in errors.
    pub fn new(
        pipeline: &'a Pipeline,
        reconciler: &'a Reconciler<'a, C>,
        source: &'a str,
        width: usize,
    ) -> Self {
        Self {
            pipeline,
            reconciler,
            source,
            width,
            report: RunReport::default(),
        }
    }

    pub fn enrich_row(&mut self, line: usize, fields: Vec<String>) -> Result<RowOutcome, ReconError> {
        if fields.len() != self.width {
            return Err(ReconError::MalformedRow {
                source: self.source.into(),
                row: line,
                detail: format!("expected {} columns, found {}", self.width, fields.len()),
            });
        }
        self.report.rows_read += 1;

        let filtered = match (Pending { line, fields }).filter_year(self.pipeline, self.source)? {
            Gate::Pass(state) => state,
            Gate::Drop(reason) => return Ok(self.dropped(reason)),
        };

        let (resolved, fresh) = filtered.resolve_country(self.pipeline, self.reconciler);
        if fresh {
            self.audit_fuzzy(&resolved);
        }

        let gaps = resolved.gaps(self.pipeline);
        if !gaps.is_empty() && self.is_defunct(&resolved) {
            log::debug!(
                target: ANOMALY_TARGET,
                "defunct country {} ({}) in {}: {}",
                resolved.athlete_code,
                resolved.name,
                resolved.year,
                gaps[0]
            );
            return Ok(self.dropped(DropReason::DefunctCountry));
        }
        for gap in &gaps {
            self.log_gap(&resolved, *gap);
        }

        match resolved.enrich(self.pipeline) {
            Gate::Pass(Enriched(fields)) => {
                self.report.rows_emitted += 1;
                Ok(RowOutcome::Enriched(fields))
            }
            Gate::Drop(reason) => Ok(self.dropped(reason)),
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    fn dropped(&mut self, reason: DropReason) -> RowOutcome {
        self.report.note_drop(reason);
        RowOutcome::Dropped(reason)
    }

    fn is_defunct(&self, state: &CountryResolved) -> bool {
        let codes = self.pipeline.codes();
        codes.is_defunct(&state.athlete_code) || codes.is_defunct(&state.gdp_code)
    }

    fn audit_fuzzy(&mut self, state: &CountryResolved) {
        if let Resolution::Resolved(found) = &state.resolution {
            if found.via.is_fuzzy() {
                self.report.note_fuzzy(
                    &state.gdp_code,
                    FuzzyAudit {
                        query: state.name.clone(),
                        alpha_3: found.record.alpha_3.clone(),
                        canonical: found.record.name.clone(),
                        score: found.score,
                    },
                );
            }
        }
    }

    /// First sighting of a distinct anomaly logs at warn, repeats at debug.
    fn log_gap(&mut self, state: &CountryResolved, gap: DropReason) {
        let (code, name) = (state.gdp_code.as_str(), state.name.as_str());
        match gap {
            DropReason::UnknownGdpCountry | DropReason::NoCanonicalCountry => {
                let anomaly = if gap == DropReason::UnknownGdpCountry {
                    Anomaly::RogueCode
                } else {
                    Anomaly::NonIsoCountry
                };
                if self.report.note_unresolved(code, name, anomaly) {
                    log::warn!(target: ANOMALY_TARGET, "{anomaly}: {code} ({name})");
                } else {
                    log::debug!(target: ANOMALY_TARGET, "{anomaly}: {code} ({name})");
                }
            }
            DropReason::NoGdpFigure => {
                log::debug!(
                    target: ANOMALY_TARGET,
                    "no GDP figure: {code} ({name}) in {}",
                    state.year
                );
            }
            DropReason::MissingContinent => {
                let Some(record) = state.record() else { return };
                if self.report.note_missing_continent(&record.alpha_3) {
                    log::warn!(
                        target: ANOMALY_TARGET,
                        "missing continent: {} ({})",
                        record.alpha_3,
                        record.name
                    );
                } else {
                    log::debug!(target: ANOMALY_TARGET, "missing continent: {}", record.alpha_3);
                }
            }
            DropReason::BeforeBaseYear | DropReason::DefunctCountry => {}
        }
    }
}
