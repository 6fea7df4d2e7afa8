use std::path::Path;

use crate::athletes::{AthleteRow, AthleteTable};
use crate::cache::{LocalResolutionCache, ResolutionCache, SharedResolutionCache};
use crate::catalog::{ContinentIndex, CountryCatalog};
use crate::codes::CodeTables;
use crate::config::{AthleteLayout, PipelineConfig};
use crate::enrich::Enricher;
use crate::error::ReconError;
use crate::evidence::RunReport;
use crate::gdp::GdpIndex;
use crate::model::{EnrichedTable, RowOutcome};
use crate::resolve::Reconciler;
use crate::source::read_source;

/// Read-only lookup structures for one run.
#[derive(Debug)]
pub struct Pipeline {
    pub base_year: i32,
    pub layout: AthleteLayout,
    pub fuzzy_threshold: f64,
    gdp: GdpIndex,
    catalog: CountryCatalog,
    continents: ContinentIndex,
    codes: CodeTables,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, gdp: GdpIndex, catalog: CountryCatalog) -> Self {
        let continents = catalog.continent_index();
        Self {
            base_year: config.base_year,
            layout: config.athletes.clone(),
            fuzzy_threshold: config.reconcile.fuzzy_threshold,
            gdp,
            catalog,
            continents,
            codes: config.reconcile.code_tables(),
        }
    }

    /// Load the GDP table and the country catalog named by `config`. Paths are
    /// relative to `base_dir`; the bundled catalog is used when none is set.
    pub fn load(config: &PipelineConfig, base_dir: &Path) -> Result<Self, ReconError> {
        let gdp_text = read_source(&base_dir.join(&config.inputs.gdp))?;
        let gdp = GdpIndex::from_csv(&config.inputs.gdp, &gdp_text, &config.gdp)?;
        log::info!("loaded {} GDP rows from {}", gdp.len(), config.inputs.gdp);

        let catalog = match &config.inputs.catalog {
            Some(path) => {
                let text = read_source(&base_dir.join(path)).map_err(|e| match e {
                    ReconError::Io(msg) => ReconError::Catalog(msg),
                    other => other,
                })?;
                CountryCatalog::from_csv(path, &text)?
            }
            None => CountryCatalog::bundled()?,
        };
        log::info!("loaded {} catalog countries", catalog.len());

        Ok(Self::new(config, gdp, catalog))
    }

    pub fn reconciler<C: ResolutionCache>(&self, cache: C) -> Reconciler<'_, C> {
        Reconciler::new(&self.catalog, self.fuzzy_threshold, cache)
    }

    pub fn gdp(&self) -> &GdpIndex {
        &self.gdp
    }

    pub fn catalog(&self) -> &CountryCatalog {
        &self.catalog
    }

    pub fn continents(&self) -> &ContinentIndex {
        &self.continents
    }

    pub fn codes(&self) -> &CodeTables {
        &self.codes
    }
}

/// Enrich the athlete table in a single pass.
pub fn run(pipeline: &Pipeline, source: &str, text: &str) -> Result<EnrichedTable, ReconError> {
    let table = AthleteTable::parse(source, text, &pipeline.layout)?;
    let reconciler = pipeline.reconciler(LocalResolutionCache::new());

    let (rows, mut report) = enrich_rows(pipeline, &reconciler, source, table.header.len(), table.rows)?;
    report.fuzzy_invocations = reconciler.fuzzy_invocations();
    report.cached_codes = reconciler.cache().len();

    log_totals(&report);
    Ok(EnrichedTable {
        header: table.header,
        rows,
        report,
    })
}

/// Same output as [`run`], with rows split into `jobs` contiguous shards on
/// scoped threads sharing one resolution cache.
pub fn run_sharded(
    pipeline: &Pipeline,
    source: &str,
    text: &str,
    jobs: usize,
) -> Result<EnrichedTable, ReconError> {
    let table = AthleteTable::parse(source, text, &pipeline.layout)?;
    let width = table.header.len();
    let reconciler = pipeline.reconciler(SharedResolutionCache::new());

    let shard_len = table.rows.len().div_ceil(jobs.max(1)).max(1);
    let mut shards: Vec<Vec<AthleteRow>> = Vec::new();
    let mut rows = table.rows.into_iter().peekable();
    while rows.peek().is_some() {
        shards.push(rows.by_ref().take(shard_len).collect());
    }
    log::debug!("enriching {} shards of up to {shard_len} rows", shards.len());

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = shards
            .into_iter()
            .map(|shard| {
                let reconciler = &reconciler;
                scope.spawn(move || enrich_rows(pipeline, reconciler, source, width, shard))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    let mut rows = Vec::new();
    let mut report = RunReport::default();
    for result in results {
        let (shard_rows, shard_report) = result?;
        rows.extend(shard_rows);
        report.merge(shard_report);
    }
    report.fuzzy_invocations = reconciler.fuzzy_invocations();
    report.cached_codes = reconciler.cache().len();

    log_totals(&report);
    Ok(EnrichedTable {
        header: table.header,
        rows,
        report,
    })
}

fn enrich_rows<C: ResolutionCache>(
    pipeline: &Pipeline,
    reconciler: &Reconciler<'_, C>,
    source: &str,
    width: usize,
    rows: Vec<AthleteRow>,
) -> Result<(Vec<Vec<String>>, RunReport), ReconError> {
    let mut enricher = Enricher::new(pipeline, reconciler, source, width);
    let mut enriched = Vec::new();
    for row in rows {
        if let RowOutcome::Enriched(fields) = enricher.enrich_row(row.line, row.fields)? {
            enriched.push(fields);
        }
    }
    Ok((enriched, enricher.into_report()))
}

fn log_totals(report: &RunReport) {
    log::info!(
        "enriched {} of {} rows ({} dropped, {} distinct codes resolved, {} fuzzy)",
        report.rows_emitted,
        report.rows_read,
        report.dropped_total(),
        report.cached_codes,
        report.fuzzy_matches.len()
    );
}

/// Serialize the enriched table, header first.
pub fn write_csv(table: &EnrichedTable) -> Result<Vec<u8>, ReconError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    let io_err = |e: csv::Error| ReconError::Io(format!("cannot write CSV: {e}"));

    wtr.write_record(&table.header).map_err(io_err)?;
    for row in &table.rows {
        wtr.write_record(row).map_err(io_err)?;
    }
    wtr.into_inner()
        .map_err(|e| ReconError::Io(format!("cannot write CSV: {}", e.error())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GDP: &str = "\
Country Name,Country Code,Indicator Name,Indicator Code,1960,1961
Spain,ESP,GDP,NY.GDP,12.3,13.1
Germany,DEU,GDP,NY.GDP,7.5,8.1
";

    const ATHLETES: &str = "\
ID,Team,NOC,Year
1,Spain,ESP,1960
2,Germany,GER,1961
3,Spain,ESP,1956
4,\"Spain, Madrid\",ESP,1961
";

    fn pipeline() -> Pipeline {
        let config = PipelineConfig::from_toml(
            r#"
[inputs]
gdp = "gdp.csv"
athletes = "athletes.csv"
output = "out.csv"

[gdp]
last_year_column = 5

[athletes]
country_column = 1
code_column = 2
year_column = 3
gdp_column = 4
continent_column = 5
"#,
        )
        .unwrap();
        let gdp = GdpIndex::from_csv("gdp.csv", GDP, &config.gdp).unwrap();
        Pipeline::new(&config, gdp, CountryCatalog::bundled().unwrap())
    }

    #[test]
    fn run_keeps_input_order_and_appends_columns() {
        let table = run(&pipeline(), "athletes.csv", ATHLETES).unwrap();
        assert_eq!(table.header, vec!["ID", "Team", "NOC", "Year", "PIB", "Continent"]);
        let ids: Vec<_> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
        assert_eq!(table.rows[1][1..], ["Germany", "DEU", "1961", "8.1", "Europe"]);
        // Unknown name, known code: GDP falls back to the code index
        assert_eq!(table.rows[2][1..], ["Spain", "ESP", "1961", "13.1", "Europe"]);
        assert_eq!(table.report.rows_read, 4);
        assert_eq!(table.report.rows_emitted, 3);
    }

    #[test]
    fn sharded_run_matches_sequential() {
        let pipeline = pipeline();
        let sequential = run(&pipeline, "athletes.csv", ATHLETES).unwrap();
        for jobs in [1, 2, 3, 8] {
            let sharded = run_sharded(&pipeline, "athletes.csv", ATHLETES, jobs).unwrap();
            assert_eq!(sharded.rows, sequential.rows, "jobs = {jobs}");
            assert_eq!(sharded.report.dropped, sequential.report.dropped);
            assert_eq!(
                write_csv(&sharded).unwrap(),
                write_csv(&sequential).unwrap()
            );
        }
    }

    #[test]
    fn sharded_run_reports_first_error_in_row_order() {
        let text = "ID,Team,NOC,Year\n1,Spain,ESP,1960\n2,Spain,ESP,x\n3,Spain,ESP,y\n";
        let err = run_sharded(&pipeline(), "athletes.csv", text, 3).unwrap_err();
        assert_eq!(err.to_string(), "athletes.csv, row 3: year 'x' is not an integer");
    }

    #[test]
    fn empty_body_yields_header_only() {
        let table = run_sharded(&pipeline(), "athletes.csv", "ID,Team,NOC,Year\n", 4).unwrap();
        assert!(table.rows.is_empty());
        let bytes = write_csv(&table).unwrap();
        assert_eq!(bytes, b"ID,Team,NOC,Year,PIB,Continent\n");
    }

    #[test]
    fn csv_output_quotes_fields() {
        let table = EnrichedTable {
            header: vec!["Team".into(), "PIB".into()],
            rows: vec![vec!["Korea, Republic of".into(), "1.5E+11".into()]],
            report: RunReport::default(),
        };
        let bytes = write_csv(&table).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Team,PIB\n\"Korea, Republic of\",1.5E+11\n"
        );
    }

    #[test]
    fn load_reads_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gdp.csv"), GDP).unwrap();
        std::fs::write(
            dir.path().join("countries.csv"),
            "alpha_3,name,continent\nESP,Spain,Europe\n",
        )
        .unwrap();
        let mut config = PipelineConfig::from_toml(
            r#"
[inputs]
gdp = "gdp.csv"
athletes = "athletes.csv"
catalog = "countries.csv"
output = "out.csv"

[gdp]
last_year_column = 5
"#,
        )
        .unwrap();
        let pipeline = Pipeline::load(&config, dir.path()).unwrap();
        assert_eq!(pipeline.gdp().len(), 2);
        assert_eq!(pipeline.catalog().len(), 1);
        assert_eq!(pipeline.continents().get("ESP"), Some("Europe"));

        config.inputs.catalog = Some("absent.csv".into());
        let err = Pipeline::load(&config, dir.path()).unwrap_err();
        assert!(matches!(err, ReconError::Catalog(_)), "{err}");
    }
}
