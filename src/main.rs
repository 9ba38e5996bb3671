use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use delivery_calculator::{
    infra::calculator_from_config,
    util::config::{load_config, save_config, EngineConfig},
    CalculationRequest, SnapshotStore,
};

#[derive(Parser, Debug)]
#[command(name = "delivery-calculator")]
#[command(about = "Price a delivery from a supplier through the nearest distribution center")]
struct Args {
    /// Engine config file; defaults to the platform config directory
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one calculation and print the result as JSON
    Calculate {
        /// Snapshot with regions, facilities, sectors and delivery points
        snapshot: PathBuf,
        /// Calculation request
        request: PathBuf,
    },
    /// Write the effective config (defaults plus environment) to the config file
    InitConfig,
    /// Add the polygons of a GeoJSON FeatureCollection to a snapshot as sectors of a region
    ImportSectors {
        snapshot: PathBuf,
        #[arg(long, short = 'r')]
        region: i64,
        geojson: PathBuf,
        /// Write the updated snapshot here instead of over the input
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Calculate { snapshot, request } => {
            let config = load_config(args.config.as_deref()).context("loading engine config")?;
            let calculator = calculator_from_config(&config)?;
            let store = SnapshotStore::load(&snapshot)
                .with_context(|| format!("loading snapshot {}", snapshot.display()))?;

            let raw = fs::read_to_string(&request)
                .with_context(|| format!("reading request {}", request.display()))?;
            let request: CalculationRequest = serde_json::from_str(&raw)?;

            let result = calculator.calculate(&store, &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::InitConfig => {
            let config = match load_config(args.config.as_deref()) {
                Ok(config) => config,
                Err(error) => {
                    tracing::warn!(%error, "existing config unreadable, writing defaults");
                    EngineConfig::default()
                }
            };
            let path = save_config(&config, args.config.as_deref())?;
            println!("{}", path.display());
        }
        Command::ImportSectors {
            snapshot,
            region,
            geojson,
            output,
        } => {
            let mut store = SnapshotStore::load(&snapshot)
                .with_context(|| format!("loading snapshot {}", snapshot.display()))?;
            let raw = fs::read_to_string(&geojson)
                .with_context(|| format!("reading {}", geojson.display()))?;
            let added = store.import_sectors(region, &raw)?;

            let target = output.unwrap_or(snapshot);
            store
                .save(&target)
                .with_context(|| format!("writing snapshot {}", target.display()))?;
            println!(
                "{added} sectors imported into region {region}, saved to {}",
                target.display()
            );
        }
    }

    Ok(())
}
