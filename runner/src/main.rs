use clap::Parser;
use harvest_ingest::Unpacker;
use harvest_runner::{Catalogs, Collector, ConfigErrors, HarvestConfig};
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Pull, verify and merge run results from a remote catalog
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the harvest config file
    #[arg(short, long, default_value = "harvest.yaml")]
    config: PathBuf,

    /// Number of concurrent pulls, overrides `workers` of the config
    #[arg(short, long)]
    workers: Option<usize>,

    /// Only collect the named runs, may be repeated
    #[arg(short, long = "run")]
    runs: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match HarvestConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {e}");
            exit(1)
        }
    };

    if args.workers.is_some() {
        config.workers = args.workers;
    }

    if config.preflight_checks() {
        error!("The config contains errors, see above");
        exit(1)
    }

    let runs = match config.select_runs(&args.runs) {
        Ok(runs) => runs,
        Err(e) => {
            error!("{e}");
            exit(1)
        }
    };

    let collector = match Unpacker::load(&config.classify)
        .map_err(ConfigErrors::from)
        .and_then(|unpacker| {
            Collector::new(Catalogs::load(&config.catalog), unpacker, config.workers())
        }) {
        Ok(collector) => collector,
        Err(e) => {
            error!("Failed to set up the collector: {e}");
            exit(1)
        }
    };

    let reports = collector.collect_all(&runs);

    for report in reports.iter() {
        info!(
            "{}: {} pulled, {} already present, {} corrupted, {} failed, {} malformed names",
            report.run, report.pulled, report.present, report.corrupted, report.failed, report.invalid
        );
    }

    let missing: usize = reports.iter().map(|report| report.missing.len()).sum();
    if missing > 0 {
        warn!("{missing} expected seeds are not collected yet, run again once they are available");
    }
}
