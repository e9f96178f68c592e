//! motoval CLI — clean listings, train the price model, and price a bike.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// motoval: used-motorcycle price pipeline
#[derive(Parser, Debug)]
#[command(name = "motoval", version, about, long_about = None)]
struct Cli {
    /// Workspace directory; relative data and model paths resolve against it
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Clean the raw listings CSV
    Clean {
        /// Raw CSV (defaults to data.raw_path)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Cleaned CSV to write (defaults to data.cleaned_path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Train the price model on the cleaned CSV
    Train {
        /// Cleaned CSV (defaults to data.cleaned_path)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Bundle directory (defaults to model.model_dir)
        #[arg(long)]
        model_dir: Option<PathBuf>,
        /// Seed for the split and the forest
        #[arg(long)]
        seed: Option<u64>,
        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,
    },
    /// Predict the price of one listing
    Predict {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        location: String,
        /// Model year
        #[arg(long)]
        year: i32,
        /// Kilometres driven
        #[arg(long)]
        kms: f64,
        /// Fuel efficiency in kmpl
        #[arg(long)]
        mileage: f64,
        /// Power in bhp
        #[arg(long)]
        power: f64,
        /// Engine displacement in cc
        #[arg(long)]
        cc: f64,
        #[arg(long)]
        segment: Option<String>,
        /// Also list similar bikes from the cleaned dataset
        #[arg(long)]
        similar: bool,
        /// Bundle directory (defaults to model.model_dir)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// List cleaned listings closest to a bike of the same brand
    Similar {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        kms: f64,
        #[arg(long)]
        cc: f64,
        /// Number of listings (defaults to inference.similar_top_k)
        #[arg(long)]
        top: Option<usize>,
        /// Cleaned CSV (defaults to data.cleaned_path)
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default workspace configuration file
    Init,
    /// Show the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "motoval", "motoval")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "motoval.log");
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
        .unwrap_or_else(|_| cli.workspace.clone());

    let config = motoval_core::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    commands::handle_command(cli.command, &workspace, config)
}
