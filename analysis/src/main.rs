use clap::{ArgAction, Parser};
use harvest_analysis::{
    compile_time_info, discover, discover::DEFAULT_ROOT, discover::PARTITIONS, report,
    runcard_directories, Filters,
};
use harvest_runner::HarvestConfig;
use std::{
    io::{self, Write},
    path::PathBuf,
    process::exit,
};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Generate timing information from a directory of log files
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directories to search, discovered below --root if omitted
    #[arg(value_name = "DIR")]
    directories: Vec<PathBuf>,

    /// Harvest config whose runs' log directories are added.
    /// Also accepted as --rc, the single dash form -rc is not supported
    #[arg(long, visible_alias = "rc")]
    runcard: Option<PathBuf>,

    /// Outputs a much longer summary
    #[arg(short, long)]
    verbose: bool,

    /// Search for specific string(s) in runcard dir
    #[arg(short, long, short_alias = 'f', num_args = 1.., action = ArgAction::Append)]
    search: Vec<String>,

    /// Reject specific string(s) in runcard dir
    #[arg(short, long, num_args = 1.., action = ArgAction::Append)]
    reject: Vec<String>,

    /// Case insensitive search/reject
    #[arg(short = 'i', long, visible_alias = "case_insensitive")]
    case_insensitive: bool,

    /// Histogram output for verbose mode
    #[arg(long, visible_alias = "hs")]
    histogram: bool,

    /// Root holding the result directories for discovery
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let filters = Filters {
        search: args.search.clone(),
        reject: args.reject.clone(),
        case_insensitive: args.case_insensitive,
    };

    let mut directories = args.directories.clone();

    if let Some(runcard) = &args.runcard {
        match HarvestConfig::load(runcard) {
            Ok(config) => directories.extend(runcard_directories(&config)),
            Err(e) => {
                error!("Failed to load runcard {}: {e}", runcard.display());
                exit(1)
            }
        }
    } else if directories.is_empty() {
        match discover(&args.root, &PARTITIONS, &filters) {
            Ok(found) => directories = found,
            Err(e) => {
                error!("Failed to discover result directories: {e}");
                exit(1)
            }
        }
    }

    if let Err(e) = print_report(&args, &directories) {
        error!("Failed to write report: {e}");
        exit(1)
    }
}

fn print_report(args: &Args, directories: &[PathBuf]) -> io::Result<()> {
    let mut out = io::stdout().lock();

    if !args.verbose {
        report::write_short_header(&mut out)?;
    }

    for directory in directories {
        let info = match compile_time_info(directory) {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping {}: {e}", directory.display());
                continue;
            }
        };

        if args.verbose {
            report::write_full(&mut out, directory, &info, args.histogram)?;
        } else {
            report::write_short(&mut out, directory, &info)?;
        }
    }

    out.flush()
}
