use crate::AnalysisError;
use ignore::WalkBuilder;
use itertools::Itertools;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, trace, warn};

const ELAPSED: &str = "Elapsed";
const LOG_SUFFIX: &str = ".log";

/// Result of looking for the elapsed time of a single log
#[derive(Debug, Clone, PartialEq)]
pub enum Elapsed {
    Hours(f64),
    /// no line carries the `Elapsed` token
    Missing,
    /// the first `Elapsed` line has no numeric `<value> <unit>` ending
    Malformed(String),
}

/// Samples gathered from the logs of one directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeInfo {
    pub samples: Vec<f64>,
    pub skipped: usize,
    pub total: usize,
}

/// Convert the trailing `<value> <unit>` of an `Elapsed` line to hours
pub fn parse_elapsed(line: &str) -> Elapsed {
    let tokens = line.split_whitespace().collect_vec();

    let (value, unit) = match tokens.as_slice() {
        [.., value, unit] => (value, unit),
        _ => return Elapsed::Malformed(line.to_string()),
    };

    match value.parse::<f64>() {
        Ok(value) if unit.contains("minutes") => Elapsed::Hours(value / 60.0),
        Ok(value) if unit.contains("second") => Elapsed::Hours(value / 3600.0),
        Ok(value) => Elapsed::Hours(value),
        Err(_) => Elapsed::Malformed(line.to_string()),
    }
}

/// Elapsed time of the first `Elapsed` line in `reader`
pub fn time_hours<R: BufRead>(reader: R) -> std::io::Result<Elapsed> {
    for line in reader.split(b'\n') {
        let line = line?;
        let line = String::from_utf8_lossy(&line);

        if line.contains(ELAPSED) {
            return Ok(parse_elapsed(&line));
        }
    }

    Ok(Elapsed::Missing)
}

/// `.log` files directly inside `directory`, sorted by name
pub fn log_files(directory: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    if !directory.is_dir() {
        return Err(AnalysisError::NotADirectory(directory.to_path_buf()));
    }

    WalkBuilder::new(directory)
        .standard_filters(false)
        .max_depth(Some(1))
        .build()
        .filter_map_ok(|entry| {
            let is_log = entry.depth() == 1
                && entry.file_type().map(|kind| kind.is_file()).unwrap_or(false)
                && entry.file_name().to_string_lossy().ends_with(LOG_SUFFIX);

            is_log.then(|| entry.into_path())
        })
        .map(|entry| entry.map_err(AnalysisError::from))
        .collect::<Result<Vec<_>, _>>()
        .map(|paths| paths.into_iter().sorted().collect_vec())
}

/// Gather the elapsed time of every log in `directory`.
///
/// Logs without a usable, non-negative elapsed time are counted as skipped.
/// Only a directory that can't be listed is an error.
pub fn compile_time_info(directory: &Path) -> Result<TimeInfo, AnalysisError> {
    let mut info = TimeInfo::default();

    for path in log_files(directory)? {
        info.total += 1;

        let elapsed = File::open(&path)
            .map(BufReader::new)
            .and_then(time_hours);

        match elapsed {
            Ok(Elapsed::Hours(hours)) if hours >= 0.0 => {
                trace!(path = ?path, hours = hours, "Elapsed time");
                info.samples.push(hours);
            }
            Ok(Elapsed::Hours(hours)) => {
                debug!(path = ?path, hours = hours, "Skipping negative elapsed time");
                info.skipped += 1;
            }
            Ok(Elapsed::Missing) => {
                debug!(path = ?path, "No elapsed time found");
                info.skipped += 1;
            }
            Ok(Elapsed::Malformed(line)) => {
                debug!(path = ?path, line = %line.trim(), "Malformed elapsed time");
                info.skipped += 1;
            }
            Err(error) => {
                warn!(path = ?path, error = ?error, "Failed to read log");
                info.skipped += 1;
            }
        }
    }

    Ok(info)
}
