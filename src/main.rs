use anyhow::{Context, Result};
use cereal_pipeline::config::PipelineConfig;
use cereal_pipeline::constants::DEFAULT_CONFIG_PATH;
use cereal_pipeline::infra::{ReqwestHttp, SqliteWarehouse, WarehouseSchema};
use cereal_pipeline::logging;
use cereal_pipeline::pipeline::Pipeline;
use cereal_pipeline::storage::{InMemoryWarehouse, WarehouseSink};
use cereal_pipeline::types::Table;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cereal_pipeline")]
#[command(about = "Fetch the cereal dataset, normalize it per cup, and report the winners")]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// TOML config file; missing file means built-in defaults
    #[arg(long, global = true, env = "CEREAL_PIPELINE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for the rotated JSON log file
    #[arg(long, global = true, env = "CEREAL_PIPELINE_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline once
    Run {
        /// CSV source URL
        #[arg(long, env = "CEREAL_PIPELINE_URL")]
        url: Option<String>,
        /// SQLite database path (or :memory:)
        #[arg(long, env = "CEREAL_PIPELINE_WAREHOUSE")]
        warehouse: Option<String>,
        /// Table the normalized rows replace
        #[arg(long, env = "CEREAL_PIPELINE_TABLE")]
        table: Option<String>,
        /// Keep normalized rows in memory instead of SQLite
        #[arg(long, env = "CEREAL_PIPELINE_IN_MEMORY")]
        in_memory: bool,
        /// Print the run outcome as JSON
        #[arg(long, env = "CEREAL_PIPELINE_JSON")]
        json: bool,
    },
    /// Print rows from the warehouse table
    Show {
        /// SQLite database path
        #[arg(long, env = "CEREAL_PIPELINE_WAREHOUSE")]
        warehouse: Option<String>,
        /// Table to read
        #[arg(long, env = "CEREAL_PIPELINE_TABLE")]
        table: Option<String>,
        /// Maximum rows to print
        #[arg(long, env = "CEREAL_PIPELINE_LIMIT", default_value_t = 10)]
        limit: usize,
        /// Print rows as JSON
        #[arg(long, env = "CEREAL_PIPELINE_JSON")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    let mut config = PipelineConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    match cli.command {
        Commands::Run {
            url,
            warehouse,
            table,
            in_memory,
            json,
        } => {
            if let Some(url) = url {
                config.fetch.url = url;
            }
            if let Some(warehouse) = warehouse {
                config.warehouse.conn_str = warehouse;
            }
            if let Some(table) = table {
                config.warehouse.table = table;
            }
            config.validate()?;
            run(config, in_memory, json).await
        }
        Commands::Show {
            warehouse,
            table,
            limit,
            json,
        } => {
            if let Some(warehouse) = warehouse {
                config.warehouse.conn_str = warehouse;
            }
            if let Some(table) = table {
                config.warehouse.table = table;
            }
            show(&config, limit, json).await
        }
    }
}

async fn run(config: PipelineConfig, in_memory: bool, json: bool) -> Result<()> {
    let http = ReqwestHttp::new(config.fetch.timeout_seconds.map(Duration::from_secs))
        .context("building HTTP client")?;
    let warehouse: Arc<dyn WarehouseSink> = if in_memory {
        Arc::new(InMemoryWarehouse::new())
    } else {
        Arc::new(
            SqliteWarehouse::open(&config.warehouse.conn_str, WarehouseSchema::cereals())
                .with_context(|| format!("opening warehouse {}", config.warehouse.conn_str))?,
        )
    };

    let pipeline = Pipeline::new(Arc::new(http), warehouse, config);
    match pipeline.run().await {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.report);
            }
            info!(
                "Stored {} rows in '{}'",
                outcome.rows_written, outcome.table_name
            );
            Ok(())
        }
        Err(e) => {
            error!(
                step = e.step().unwrap_or("pipeline"),
                kind = e.kind(),
                "Run aborted: {}",
                e
            );
            Err(e.into())
        }
    }
}

async fn show(config: &PipelineConfig, limit: usize, json: bool) -> Result<()> {
    let warehouse = SqliteWarehouse::open(&config.warehouse.conn_str, WarehouseSchema::cereals())
        .with_context(|| format!("opening warehouse {}", config.warehouse.conn_str))?;
    let table = warehouse
        .read_table(&config.warehouse.table)
        .await
        .with_context(|| format!("reading table {}", config.warehouse.table))?;

    if json {
        let rows: Vec<_> = table.records().iter().take(limit).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&table, limit);
    }
    Ok(())
}

fn print_table(table: &Table, limit: usize) {
    println!("{}", table.columns().join(" | "));
    for record in table.records().iter().take(limit) {
        let cells: Vec<String> = record.values().map(|v| v.to_string()).collect();
        println!("{}", cells.join(" | "));
    }
    if table.len() > limit {
        println!("... {} more rows", table.len() - limit);
    }
}
