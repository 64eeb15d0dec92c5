//! ferro-consensus CLI
//!
//! Command-line interface for the multi-lab variant classification
//! consensus pipeline.

use clap::{Parser, Subcommand};
use ferro_consensus::{pipeline, RunConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferro-consensus")]
#[command(author, version, about = "Multi-lab variant classification consensus")]
#[command(
    long_about = "Aggregate per-lab variant classifications into one consensus table,
match variant identities against prior export snapshots, and write the
public and audit report tables.

Examples:
  ferro-consensus run -c run.toml
  ferro-consensus run -c run.toml --tag 1902
  ferro-consensus run -c run.toml -i /data/in -o /data/out
  ferro-consensus report -c run.toml --tag 1902"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter, e.g. info or ferro_consensus=debug
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: retrieve, consensus, history, export, reports
    Run {
        /// Run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Export tag for output file names (defaults to current yymm)
        #[arg(long)]
        tag: Option<String>,

        /// Input directory, overriding the config file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory, overriding the config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild the report tables from an existing consensus table
    Report {
        /// Run configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Export tag of the consensus table to report on
        #[arg(long)]
        tag: String,

        /// Output directory, overriding the config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let summary = match cli.command {
        Commands::Run {
            config,
            tag,
            input,
            output,
        } => {
            let config = RunConfig::load(&config)?.with_overrides(input, output);
            match tag {
                Some(tag) => {
                    let source = ferro_consensus::TsvSource::new(
                        &config.input,
                        config.prefix.as_str(),
                        config.history_file.as_str(),
                    );
                    pipeline::run_with_source(&config, &source, &tag)?
                }
                None => pipeline::run(&config)?,
            }
        }
        Commands::Report { config, tag, output } => {
            let config = RunConfig::load(&config)?.with_overrides(None, output);
            pipeline::rerun_reports(&config, &tag)?
        }
    };

    println!(
        "export {}: {} variants, {} id corrections",
        summary.tag, summary.variants, summary.corrections
    );
    Ok(())
}
