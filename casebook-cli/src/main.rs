//! casebook - case-study document CLI
//!
//! Usage:
//!   casebook validate <dir>                     Check every document against the schema
//!   casebook report <dir> --where industry=CPG  Render an aggregated report
//!   casebook metrics <dir> <type>               List every metric of one type
//!   casebook chunks <file>                      Print section-aware chunks as JSON

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "casebook", version, about = "Validate, query and report on case-study documents")]
struct Cli {
    /// JSON config file (defaults to $CASEBOOK_CONFIG when set)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report front-matter fields the schema does not declare
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate every document under a directory
    Validate {
        path: PathBuf,
    },
    /// Render a report over the valid documents
    Report {
        path: PathBuf,
        /// csv, json, markdown or text
        #[arg(long, short)]
        format: Option<String>,
        /// Comma-separated column keys, e.g. client,title,metrics
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Restrict rows to `dimension=value`, e.g. industry=CPG
        #[arg(long = "where", value_name = "DIMENSION=VALUE")]
        filter: Option<String>,
    },
    /// List every metric of the given type across the valid documents
    Metrics {
        path: PathBuf,
        metric_type: String,
    },
    /// Split one document into section-aware chunks
    Chunks {
        file: PathBuf,
        #[arg(long)]
        max_chunk_size: Option<usize>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = commands::load_config(cli.config, cli.strict)?;

    match cli.command {
        Command::Validate { path } => {
            let outcome = commands::validate(&path, &config)?;
            print!("{}", outcome.output);
            Ok(if outcome.failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Report { path, format, columns, filter } => {
            let request = commands::ReportRequest { format, columns, filter };
            print!("{}", commands::report(&path, &config, &request)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Metrics { path, metric_type } => {
            print!("{}", commands::metrics(&path, &config, &metric_type)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Chunks { file, max_chunk_size } => {
            println!("{}", commands::chunks(&file, &config, max_chunk_size)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
