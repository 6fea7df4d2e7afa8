//! `podium run` and `podium validate`.

use std::path::{Path, PathBuf};

use podium_recon::engine::{run, run_sharded, write_csv, Pipeline};
use podium_recon::model::{OutputSummary, RunMeta, RunSummary};
use podium_recon::source::{read_source, write_atomic};
use podium_recon::{PipelineConfig, ReconError};

use crate::exit_codes::{exit_code_for, EXIT_ERROR, EXIT_INPUT};
use crate::CliError;

pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub summary: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub jobs: usize,
}

fn recon_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::ConfigParse(_) => Some("check the TOML syntax and the [inputs] table".to_string()),
        ReconError::MalformedHeader { .. } => {
            Some("check the column layout in the [gdp] and [athletes] tables".to_string())
        }
        ReconError::Catalog(_) => {
            Some("remove inputs.catalog to use the bundled country catalog".to_string())
        }
        _ => None,
    };
    CliError {
        code: exit_code_for(&err),
        message: err.to_string(),
        hint,
    }
}

/// Read and validate the config. Returns it with the directory that input
/// paths are resolved against.
fn load_config(path: &Path) -> Result<(PipelineConfig, PathBuf), CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError {
        code: EXIT_INPUT,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    let config = PipelineConfig::from_toml(&text).map_err(recon_err)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&args.config)?;
    log::info!("running '{}' from {}", config.name, args.config.display());

    let pipeline = Pipeline::load(&config, &base_dir).map_err(recon_err)?;
    let athletes = read_source(&base_dir.join(&config.inputs.athletes)).map_err(recon_err)?;

    let jobs = args.jobs.max(1);
    let source = config.inputs.athletes.as_str();
    let table = if jobs > 1 {
        run_sharded(&pipeline, source, &athletes, jobs)
    } else {
        run(&pipeline, source, &athletes)
    }
    .map_err(recon_err)?;

    let bytes = write_csv(&table).map_err(recon_err)?;
    let output_path = args
        .output
        .unwrap_or_else(|| base_dir.join(&config.inputs.output));
    write_atomic(&output_path, &bytes).map_err(recon_err)?;

    let summary = RunSummary {
        meta: RunMeta::now(&config.name, jobs),
        output: OutputSummary {
            path: output_path.display().to_string(),
            rows: table.rows.len(),
            digest: format!("blake3:{}", blake3::hash(&bytes).to_hex()),
        },
        report: table.report,
    };

    let json = || {
        serde_json::to_string_pretty(&summary).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })
    };
    if let Some(path) = &args.summary {
        write_atomic(path, json()?.as_bytes()).map_err(recon_err)?;
        eprintln!("wrote {}", path.display());
    }
    if args.json {
        println!("{}", json()?);
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let r = &summary.report;
    eprintln!(
        "{}: {} of {} rows enriched, {} dropped",
        summary.meta.config_name,
        r.rows_emitted,
        r.rows_read,
        r.dropped_total()
    );
    for (reason, count) in &r.dropped {
        eprintln!("  {reason}: {count}");
    }
    if !r.fuzzy_matches.is_empty() {
        eprintln!("fuzzy matches ({}):", r.fuzzy_matches.len());
        for (code, audit) in &r.fuzzy_matches {
            eprintln!(
                "  {code} '{}' -> {} '{}' ({:.2})",
                audit.query, audit.alpha_3, audit.canonical, audit.score
            );
        }
    }
    if !r.unresolved.is_empty() {
        eprintln!("unresolved ({}):", r.unresolved.len());
        for u in &r.unresolved {
            eprintln!("  {} '{}': {}", u.code, u.name, u.reason);
        }
    }
    if !r.missing_continents.is_empty() {
        let codes: Vec<_> = r.missing_continents.iter().map(String::as_str).collect();
        eprintln!("missing continents: {}", codes.join(", "));
    }
    eprintln!("wrote {} ({})", summary.output.path, summary.output.digest);
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    for input in [&config.inputs.gdp, &config.inputs.athletes]
        .into_iter()
        .chain(config.inputs.catalog.as_ref())
    {
        let path = base_dir.join(input);
        if !path.is_file() {
            return Err(CliError {
                code: EXIT_INPUT,
                message: format!("input not found: {}", path.display()),
                hint: None,
            });
        }
    }
    eprintln!("config OK: {}", config.name);
    Ok(())
}
