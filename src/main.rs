//! uwo - query and classify the UWO sewer sensor dataset.

mod cli;
mod logging;

use anyhow::Context;
use cli::{format_wall_time, Cli, Command};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uwo_tools::classifier::classify_flow_sensor_metadata;
use uwo_tools::config::Config;
use uwo_tools::db::{Table, Value};
use uwo_tools::error::UwoError;
use uwo_tools::query::{SensorCatalog, TimeRangeFilter};

/// Rows printed by `variables` when `--head` is not given.
const VARIABLES_PREVIEW_ROWS: usize = 5;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let log_to_file = cli.log_file;

    if log_to_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    let started = Instant::now();
    let result = run(cli).await;
    println!("Wall time: {}", format_wall_time(started.elapsed()));

    if let Err(e) = result {
        let category = e
            .downcast_ref::<UwoError>()
            .map(UwoError::category)
            .unwrap_or("Error");
        error!("{category}: {e:#}");
        // The log already goes to stderr unless it was sent to a file.
        if log_to_file {
            eprintln!("{category}: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!("Could not load .env file: {e}"),
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load(&config_path)?;
    cli.apply_overrides(&mut config.database);

    let catalog = SensorCatalog::from_config(config.database.clone());
    let head = cli.head;

    match cli.command {
        Command::Variables => {
            let table = catalog.list_variables().await?;
            print_table(&table, Some(head.unwrap_or(VARIABLES_PREVIEW_ROWS)));
        }
        Command::Sites { variable } => {
            print_table(&catalog.list_sites_for_variable(&variable).await?, head);
        }
        Command::Sensors { site } => {
            print_table(&catalog.list_sensors_for_site(&site).await?, head);
        }
        Command::Series { source, range } => {
            let table = catalog.get_time_series(&source, &range.to_filter()).await?;
            print_table(&table, head);
        }
        Command::Metadata { source, range } => {
            let table = catalog.get_meta_data(&source, &range.to_filter()).await?;
            print_table(&table, head);
        }
        Command::FlowRate => {
            print_table(&catalog.get_flow_rate_time_series().await?, head);
        }
        Command::Classify { source, start, end } => {
            let filter = TimeRangeFilter::between(start, end);
            let meta_data = catalog.get_meta_data(&source, &filter).await?;
            info!("Classifying {} metadata comments of {source}", meta_data.len());

            for comment in meta_data.column("comment") {
                let Value::String(text) = comment else {
                    warn!("Skipping empty metadata comment");
                    continue;
                };

                let decision = classify_flow_sensor_metadata(&config.classifier, text).await?;
                let output = serde_json::json!({
                    "sensor_name": source,
                    "comment": text,
                    "decision": decision,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("Failed to render decision")?
                );
            }
        }
    }

    Ok(())
}

fn print_table(table: &Table, head: Option<usize>) {
    match head {
        Some(rows) if rows < table.len() => {
            println!("{}", table.head(rows));
            println!("(showing {rows} of {} rows)", table.len());
        }
        _ => println!("{table}"),
    }
    debug!("Query took {:?}", table.execution_time);
}
