//! Tabsynth - offline validation, synthesis and evaluation of CSV tables

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tabsynth_common::logging::{init_logging, LogConfig, LogLevel};
use tabsynth_common::Table;
use tabsynth_engine::synthesis::{EmpiricalBackend, SynthesisForm, SynthesisRequest};
use tabsynth_engine::{validator, Engine};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tabsynth")]
#[command(author, version, about = "Synthetic tabular data tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Check that a file is an acceptable upload
    Validate {
        /// CSV file to check
        file: PathBuf,
    },

    /// Generate a synthetic replica of a table
    Synthesize {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// fast_ml, gaussian_copula, ctgan, copulagan or tvae
        #[arg(short, long, default_value = "fast_ml")]
        strategy: String,

        #[arg(short, long)]
        rows: i64,

        #[arg(short, long)]
        epochs: Option<i64>,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        enforce_min_max_values: bool,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        enforce_rounding: bool,

        #[arg(long)]
        cuda: bool,

        #[arg(long)]
        default_distribution: Option<String>,

        /// Per-column distribution as COLUMN=FAMILY, repeatable
        #[arg(long = "distribution", value_parser = parse_key_value)]
        distributions: Vec<(String, String)>,

        /// Seed for reproducible output
        #[arg(long, env = "TABSYNTH_SAMPLER_SEED")]
        seed: Option<u64>,
    },

    /// Score a synthetic table against its source
    Evaluate {
        #[arg(long)]
        real: PathBuf,

        #[arg(long)]
        synthetic: PathBuf,

        /// Render comparison plots into this directory
        #[arg(long)]
        plots: Option<PathBuf>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected COLUMN=FAMILY, got '{s}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tabsynth")
        .build();
    init_logging(&log_config)?;

    match cli.command {
        Command::Validate { file } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let mut handle = std::fs::File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            validator::validate(&name, &mut handle)?;
            println!("{}: ok", file.display());
        },
        Command::Synthesize {
            input,
            output,
            strategy,
            rows,
            epochs,
            enforce_min_max_values,
            enforce_rounding,
            cuda,
            default_distribution,
            distributions,
            seed,
        } => {
            let request = SynthesisRequest::try_from(SynthesisForm {
                strategy,
                rows,
                epochs,
                enforce_min_max_values,
                enforce_rounding,
                cuda,
                default_distribution,
                column_distributions: distributions.into_iter().collect::<BTreeMap<_, _>>(),
            })?;

            let real = Table::from_path(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let engine = Engine::with_backend(EmpiricalBackend::new(seed));
            let synthetic = engine.synthesize(&real, &request)?;
            synthetic.write_path(&output)?;

            info!(output = %output.display(), rows = synthetic.len(), "Synthetic table written");
            println!("wrote {} rows to {}", synthetic.len(), output.display());
        },
        Command::Evaluate {
            real,
            synthetic,
            plots,
        } => {
            let real_table = Table::from_path(&real)?;
            let synthetic_table = Table::from_path(&synthetic)?;
            let engine = Engine::default();

            let report = match plots {
                Some(dir) => {
                    let evaluation = engine.evaluate_with_plots(0, &real_table, &synthetic_table, &dir)?;
                    info!(plots = evaluation.plots.len(), dir = %dir.display(), "Plots rendered");
                    evaluation.report
                },
                None => engine.evaluate(&real_table, &synthetic_table)?.0,
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
        },
    }

    Ok(())
}
