use std::path::PathBuf;

use podium_recon::config::PipelineConfig;
use podium_recon::engine::{run, run_sharded, write_csv, Pipeline};
use podium_recon::evidence::Anomaly;
use podium_recon::model::{DropReason, EnrichedTable};
use podium_recon::source::read_source;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_config() -> PipelineConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("podium.toml")).unwrap();
    PipelineConfig::from_toml(&toml).unwrap()
}

fn load_pipeline() -> (Pipeline, String) {
    let config = load_config();
    let pipeline = Pipeline::load(&config, &fixtures_dir()).unwrap();
    let athletes = read_source(&fixtures_dir().join(&config.inputs.athletes)).unwrap();
    (pipeline, athletes)
}

fn run_fixture() -> EnrichedTable {
    let (pipeline, athletes) = load_pipeline();
    run(&pipeline, "athlete_events.csv", &athletes).unwrap()
}

/// Enriched row by athlete ID.
fn row<'t>(table: &'t EnrichedTable, id: &str) -> Option<&'t Vec<String>> {
    table.rows.iter().find(|r| r[0] == id)
}

/// (Team, NOC, PIB, Continent) of an enriched row.
fn enriched(table: &EnrichedTable, id: &str) -> (String, String, String, String) {
    let r = row(table, id).unwrap_or_else(|| panic!("row {id} was dropped"));
    (r[6].clone(), r[7].clone(), r[15].clone(), r[16].clone())
}

fn owned(t: (&str, &str, &str, &str)) -> (String, String, String, String) {
    (t.0.into(), t.1.into(), t.2.into(), t.3.into())
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn spain_1960_gets_gdp_and_continent() {
    let table = run_fixture();
    assert_eq!(
        enriched(&table, "1"),
        owned(("Spain", "ESP", "12.3", "Europe"))
    );
}

#[test]
fn ioc_code_is_remapped_before_lookup() {
    let table = run_fixture();
    assert_eq!(
        enriched(&table, "2"),
        owned(("Germany", "DEU", "387.546", "Europe"))
    );
}

#[test]
fn burma_is_fuzzy_resolved_to_myanmar() {
    let table = run_fixture();
    assert_eq!(
        enriched(&table, "3"),
        owned(("Myanmar", "MMR", "0.498358", "Asia"))
    );
    assert_eq!(
        enriched(&table, "4"),
        owned(("Myanmar", "MMR", "0.605757", "Asia"))
    );

    let audit = &table.report.fuzzy_matches["BIR"];
    assert_eq!(audit.query, "Burma");
    assert_eq!(audit.alpha_3, "MMR");
    assert_eq!(audit.canonical, "Myanmar");
    assert_eq!(table.report.fuzzy_matches.len(), 1);
}

#[test]
fn remapped_code_matches_its_iso_target() {
    let table = run_fixture();
    let via_ioc = enriched(&table, "7");
    let via_iso = enriched(&table, "13");
    assert_eq!(via_ioc, via_iso);
    assert_eq!(via_ioc, owned(("Bahamas", "BHS", "0.206636", "North America")));
}

#[test]
fn multi_nation_team_uses_first_nationality() {
    let table = run_fixture();
    assert_eq!(
        enriched(&table, "9"),
        owned(("Spain", "ESP", "58.6088", "Europe"))
    );
}

#[test]
fn latin1_input_is_decoded() {
    let table = run_fixture();
    let r = row(&table, "12").unwrap();
    assert_eq!(r[1], "Awa Koné");
    assert_eq!(r[6], "Côte d'Ivoire");
    assert_eq!(r[16], "Africa");
}

// -------------------------------------------------------------------------
// Drops and anomalies
// -------------------------------------------------------------------------

#[test]
fn rows_before_base_year_never_appear() {
    let table = run_fixture();
    assert!(row(&table, "5").is_none());
    assert!(table.rows.iter().all(|r| r[9].parse::<i32>().unwrap() >= 1960));
    assert_eq!(table.report.dropped[&DropReason::BeforeBaseYear], 1);
}

#[test]
fn defunct_codes_produce_no_anomalies() {
    let table = run_fixture();
    assert!(row(&table, "6").is_none());
    assert!(row(&table, "10").is_none());
    assert_eq!(table.report.defunct_rows, 2);
    assert!(table
        .report
        .unresolved
        .iter()
        .all(|u| u.code != "URS" && u.code != "EUN"));
}

#[test]
fn rogue_code_is_reported_once_per_reason() {
    let table = run_fixture();
    let atlantis: Vec<_> = table
        .report
        .unresolved
        .iter()
        .filter(|u| u.code == "ATL")
        .map(|u| u.reason)
        .collect();
    assert_eq!(atlantis, vec![Anomaly::RogueCode, Anomaly::NonIsoCountry]);
    assert_eq!(table.report.unresolved.len(), 2);
}

#[test]
fn gdp_gap_drops_row_without_anomaly() {
    let table = run_fixture();
    assert!(row(&table, "11").is_none());
    assert_eq!(table.report.dropped[&DropReason::NoGdpFigure], 1);
}

#[test]
fn report_counts_add_up() {
    let table = run_fixture();
    let report = &table.report;
    assert_eq!(report.rows_read, 13);
    assert_eq!(report.rows_emitted, 8);
    assert_eq!(report.rows_emitted + report.dropped_total(), report.rows_read);
    assert_eq!(table.rows.len(), report.rows_emitted);
}

#[test]
fn header_gets_pib_and_continent() {
    let table = run_fixture();
    assert_eq!(table.header.len(), 17);
    assert_eq!(table.header[15], "PIB");
    assert_eq!(table.header[16], "Continent");
}

// -------------------------------------------------------------------------
// Memoization and determinism
// -------------------------------------------------------------------------

#[test]
fn fuzzy_matcher_runs_once_per_code() {
    let table = run_fixture();
    // BIR, URS, ATL and EUN reach the fuzzy step; BIR appears twice
    assert_eq!(table.report.fuzzy_invocations, 4);
}

#[test]
fn fuzzy_matcher_runs_once_under_sharding() {
    let (pipeline, _) = load_pipeline();
    let mut text = String::from(
        "ID,Name,Sex,Age,Height,Weight,Team,NOC,Games,Year,Season,City,Sport,Event,Medal\n",
    );
    for id in 0..64 {
        text.push_str(&format!(
            "{id},A,M,20,NA,NA,Burma,BIR,1964 Summer,1964,Summer,Tokyo,Boxing,Boxing,NA\n"
        ));
    }

    let table = run_sharded(&pipeline, "athletes.csv", &text, 8).unwrap();
    assert_eq!(table.rows.len(), 64);
    assert_eq!(table.report.fuzzy_invocations, 1);
    assert_eq!(table.report.cached_codes, 1);
    assert_eq!(table.report.fuzzy_matches.len(), 1);
}

#[test]
fn rerun_is_byte_identical() {
    let first = write_csv(&run_fixture()).unwrap();
    let second = write_csv(&run_fixture()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sharded_output_matches_sequential() {
    let (pipeline, athletes) = load_pipeline();
    let sequential = run(&pipeline, "athlete_events.csv", &athletes).unwrap();
    let expected = write_csv(&sequential).unwrap();

    for jobs in [2, 3, 5, 32] {
        let sharded = run_sharded(&pipeline, "athlete_events.csv", &athletes, jobs).unwrap();
        assert_eq!(write_csv(&sharded).unwrap(), expected, "jobs = {jobs}");
        assert_eq!(sharded.report.unresolved, sequential.report.unresolved);
        assert_eq!(sharded.report.fuzzy_invocations, sequential.report.fuzzy_invocations);
        assert_eq!(sharded.report.rows_emitted, sequential.report.rows_emitted);
    }
}
