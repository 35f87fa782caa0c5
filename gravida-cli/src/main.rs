//! Gravida CLI: symptom checklist in, pregnancy and trimester estimate out.
//!
//! Every command trains a fresh pipeline from the effective configuration,
//! so results are reproducible for a given seed.

mod commands;
mod interactive;
mod report;

use clap::Parser;
use gravida_ml::SchemaVariant;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Gravida: estimate pregnancy status and trimester from a symptom checklist
#[derive(Parser, Debug)]
#[command(name = "gravida", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (searched for .gravida/config.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the global seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Symptom checklist: standard or extended
    #[arg(long, global = true)]
    schema: Option<SchemaVariant>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Predict from a JSON array of 0/1 answers, e.g. '[1,0,1,...]'
    Predict {
        /// Answers in checklist order
        answers: String,

        /// Print pregnancy status and confidence instead of the trimester
        #[arg(long)]
        verdict: bool,
    },
    /// Answer the checklist interactively
    Check,
    /// Train and print evaluation results for every candidate predictor
    Report {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default .gravida/config.toml into the workspace
    Init,
    /// Print the effective configuration as TOML
    Show,
}

/// Flags that shape the pipeline configuration for every command.
#[derive(Debug, Clone)]
pub(crate) struct Overrides {
    pub workspace: PathBuf,
    pub config: Option<PathBuf>,
    pub seed: Option<u64>,
    pub schema: Option<SchemaVariant>,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Human-readable stderr + JSON file logging; stdout carries results only
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "gravida", "gravida")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "gravida.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let overrides = Overrides {
        workspace,
        config: cli.config,
        seed: cli.seed,
        schema: cli.schema,
    };
    commands::handle_command(cli.command, &overrides)
}
