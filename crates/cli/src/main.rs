// Podium CLI - athlete / GDP / continent reconciliation

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use run::{cmd_run, cmd_validate, RunArgs};

#[derive(Parser)]
#[command(name = "podium")]
#[command(about = "Enrich Olympic athlete events with GDP and continent data")]
#[command(version)]
#[command(long_version = long_version())]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline from a TOML config file
    #[command(after_help = "\
Examples:
  podium run podium.toml
  podium run podium.toml --json
  podium run podium.toml --summary run.json --jobs 4
  RUST_LOG=podium::anomaly=warn podium run podium.toml")]
    Run {
        /// Path to the pipeline config file
        config: PathBuf,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON run summary to a file
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Write the enriched table here instead of inputs.output
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Worker threads for row enrichment
        #[arg(long, short = 'j', default_value_t = 1)]
        jobs: usize,
    },

    /// Validate a config and check that its inputs exist
    #[command(after_help = "\
Examples:
  podium validate podium.toml")]
    Validate {
        /// Path to the pipeline config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PODIUM_COMMIT"), ")",
        "\nengine:  podium-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("PODIUM_TARGET"),
    )
}

fn init_logger(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        None => Err(CliError {
            code: EXIT_USAGE,
            message: "no command given".into(),
            hint: Some("podium --help for more information".into()),
        }),
        Some(Commands::Run {
            config,
            json,
            summary,
            output,
            jobs,
        }) => cmd_run(RunArgs {
            config,
            json,
            summary,
            output,
            jobs,
        }),
        Some(Commands::Validate { config }) => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
