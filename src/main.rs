use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use retail_star::config::{PipelineConfig, DEFAULT_CONFIG_PATH};
use retail_star::pipeline::{ConformanceStage, Layer, ModelStage, PipelineStage};
use retail_star::raw::RawCapture;
use retail_star::table::json::records_from_table;
use retail_star::{logging, metrics, LayerStores, PipelineRunner, RunReport};

#[derive(Parser)]
#[command(name = "retail-star")]
#[command(about = "Retail sales and inventory star-schema pipeline")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the three JSON extracts into the raw layer
    Ingest {
        #[arg(long)]
        pos: PathBuf,
        #[arg(long)]
        ecommerce: PathBuf,
        #[arg(long)]
        inventory: PathBuf,
    },
    /// Build the conformed layer from the raw layer
    Conform,
    /// Build the dimensional layer from the conformed layer
    Model,
    /// Conform, then model, then write the run report
    Run,
    /// Show a stored table
    Inspect {
        /// Table name, e.g. sales_unified or fact_sales
        table: String,
        /// Rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

async fn run_stages(
    config: &PipelineConfig,
    runner: &PipelineRunner,
    stages: Vec<Box<dyn PipelineStage>>,
) -> anyhow::Result<RunReport> {
    let report = runner.run(&stages).await;
    report
        .persist(&config.report_path)
        .with_context(|| format!("writing run report to {}", config.report_path.display()))?;

    println!("\n📊 Run {}:", report.run_id);
    println!("   Status: {:?}", report.status);
    if let Some(sales) = &report.sales {
        println!(
            "   Sales: {} in, {} out ({} duplicate, {} missing, {} out of range)",
            sales.rows_in,
            sales.rows_out,
            sales.dropped.duplicate_key,
            sales.dropped.missing_required,
            sales.dropped.out_of_range
        );
    }
    if let Some(inventory) = &report.inventory {
        println!(
            "   Inventory: {} positions, {} clamped, {} low stock, {} out of stock",
            inventory.rows_out, inventory.negative_stock_clamped, inventory.low_stock, inventory.out_of_stock
        );
    }
    for (name, summary) in &report.tables {
        println!("   {:<16} {:>8} rows  {}", name, summary.rows, &summary.fingerprint[..12]);
    }
    println!("   Report: {}", config.report_path.display());
    Ok(report)
}

async fn inspect(stores: &LayerStores, table: &str, limit: usize) -> anyhow::Result<()> {
    for layer in [Layer::Model, Layer::Conformed, Layer::Raw] {
        let store = stores.get(layer);
        if !store.list_tables().await?.iter().any(|t| t == table) {
            continue;
        }
        let data = store.read_table(table).await?;
        println!("📋 {} ({} layer)", table, layer);
        for column in data.schema().columns() {
            println!("   {:<22} {:?}", column.name, column.data_type);
        }
        println!("   rows: {}", data.num_rows());
        println!("   fingerprint: {}", data.fingerprint());
        let records: Vec<_> = records_from_table(&data).into_iter().take(limit).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    bail!("table '{}' not found in any layer", table)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = PipelineConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    logging::init_logging(&config.logging);
    metrics::init_metrics(&config.metrics);

    let stores = LayerStores::from_config(&config);
    let runner = PipelineRunner::new(stores.clone());

    let report = match cli.command {
        Commands::Ingest { pos, ecommerce, inventory } => {
            println!("📥 Capturing raw extracts...");
            let capture = RawCapture::default();
            let tables = capture
                .ingest_files(stores.get(Layer::Raw), &pos, &ecommerce, &inventory)
                .await?;
            for (name, table) in &tables {
                println!("   {:<22} {:>8} rows", name, table.num_rows());
            }
            info!("Raw layer captured at {}", capture.captured_at());
            return Ok(());
        }
        Commands::Inspect { table, limit } => {
            return inspect(&stores, &table, limit).await;
        }
        Commands::Conform => {
            println!("🔧 Running conformance...");
            let stage: Box<dyn PipelineStage> = Box::new(ConformanceStage::new(config.date_order, config.parallel));
            run_stages(&config, &runner, vec![stage]).await?
        }
        Commands::Model => {
            println!("🏗️  Building dimensional model...");
            let stage: Box<dyn PipelineStage> = Box::new(ModelStage::new(config.parallel));
            run_stages(&config, &runner, vec![stage]).await?
        }
        Commands::Run => {
            println!("🚀 Running full pipeline...");
            run_stages(&config, &runner, PipelineRunner::full_pipeline(&config)).await?
        }
    };

    if !report.is_success() {
        error!("Run {} failed", report.run_id);
        bail!("run {} failed: {:?}", report.run_id, report.status);
    }
    Ok(())
}
