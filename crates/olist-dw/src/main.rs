//! olist-dw: batch ETL for the Olist e-commerce warehouse
//!
//! Cleans raw CSV extracts into the silver layer, validates them and loads
//! the star schema.

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use commands::GlobalArgs;
use commands::clean::CleanArgs;
use commands::report::ReportArgs;
use commands::run::RunArgs;
use commands::validate::ValidateArgs;
use error::CliError;

/// Batch ETL for the Olist e-commerce warehouse
#[derive(Parser, Debug)]
#[command(name = "olist-dw", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local directory holding raw/ and silver/
    #[arg(long, global = true, conflicts_with = "bucket")]
    data_dir: Option<PathBuf>,

    /// S3 / MinIO bucket holding raw/ and silver/
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Warehouse URL (duckdb://PATH, :memory: or postgresql://...)
    #[arg(long, global = true)]
    warehouse: Option<String>,

    /// Warehouse schema
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline or selected stages
    Run {
        /// Stage to run: clean, validate, load-dimensions, load-facts (repeatable)
        #[arg(long = "stage")]
        stages: Vec<String>,

        /// Check inputs without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Clean raw extracts into the silver layer
    Clean {
        /// Entity to clean (repeatable, default all)
        #[arg(long = "entity")]
        entities: Vec<String>,
    },
    /// Run the quality checks and persist the report
    Validate {
        /// Exit with code 2 when a check failed
        #[arg(long)]
        strict: bool,
    },
    /// Load dimensions, then facts
    Load,
    /// Create the warehouse schema and tables
    Init,
    /// Print the last persisted quality report
    Report {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn global_args(&self) -> GlobalArgs {
        GlobalArgs {
            config_file: self.config.clone(),
            data_dir: self.data_dir.clone(),
            bucket: self.bucket.clone(),
            warehouse: self.warehouse.clone(),
            schema: self.schema.clone(),
            verbose: self.verbose > 0,
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = commands::resolve_config(&cli.global_args())?;

    match cli.command {
        Commands::Run { stages, dry_run } => {
            commands::run::handle_run(config, &RunArgs { stages, dry_run }).await
        }
        Commands::Clean { entities } => {
            commands::clean::handle_clean(config, &CleanArgs { entities }).await
        }
        Commands::Validate { strict } => {
            commands::validate::handle_validate(config, &ValidateArgs { strict }).await
        }
        Commands::Load => commands::load::handle_load(config).await,
        Commands::Init => commands::init::handle_init(config).await,
        Commands::Report { json } => {
            commands::report::handle_report(config, &ReportArgs { json }).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            ExitCode::from(e.exit_code())
        }
    }
}
