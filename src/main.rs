use anyhow::Context;
use clap::Parser;
use disaster_etl::config::EtlConfig;
use disaster_etl::constants::USAGE;
use disaster_etl::{logging, metrics, Pipeline, PipelineInputs};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "process_data")]
#[command(about = "Merge disaster messages with their categories and save them to SQLite")]
#[command(version = "0.1.0")]
struct Cli {
    /// MESSAGES CATEGORIES DATABASE
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,

    /// TOML config file (defaults to ./etl.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Destination table name (overrides config)
    #[arg(long)]
    table: Option<String>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Wrong argument count: show guidance and exit before touching any file
    let Some(inputs) = PipelineInputs::from_positionals(&cli.paths) else {
        println!("{}", USAGE);
        return Ok(());
    };

    dotenv::dotenv().ok();

    let mut config = EtlConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(table) = cli.table {
        config.table_name = table;
        config.validate()?;
    }

    let _log_guard = logging::init_logging(&config.logging).context("initializing logging")?;
    metrics::init_metrics();
    info!(?config, "Configuration loaded");

    let report = Pipeline::new(&config)
        .run(&inputs)
        .with_context(|| format!("processing into {}", inputs.database.display()))?;

    if let Some(snapshot) = &report.metrics {
        info!("Metrics snapshot:\n{}", snapshot);
    }

    if let Some(path) = cli.report {
        report
            .write_json(&path)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    Ok(())
}
