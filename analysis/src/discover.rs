use crate::AnalysisError;
use harvest_runner::config::{result_directory, HarvestConfig};
use itertools::Itertools;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

/// Default root holding the result directories
pub const DEFAULT_ROOT: &str = "/ResultsRunGrids";

/// Folders below the root that group result directories one level deeper
pub const PARTITIONS: [&str; 7] = ["LO", "V", "R", "VV", "RV", "RRa", "RRb"];

/// Substring filters applied to candidate result directories
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub search: Vec<String>,
    pub reject: Vec<String>,
    pub case_insensitive: bool,
}

impl Filters {
    /// true iff `path` contains every search string and none of the reject strings
    pub fn matches(&self, path: &str) -> bool {
        let fold = |value: &str| {
            if self.case_insensitive {
                value.to_lowercase()
            } else {
                value.to_string()
            }
        };
        let path = fold(path);

        self.search
            .iter()
            .all(|search| path.contains(fold(search).as_str()))
            && !self
                .reject
                .iter()
                .any(|reject| path.contains(fold(reject).as_str()))
    }
}

/// Every `log/` directory of a result directory below `root` accepted by `filters`.
///
/// Result directories either sit directly below `root` or one level deeper in
/// one of the `partitions` folders.
pub fn discover(
    root: &Path,
    partitions: &[&str],
    filters: &Filters,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut directories = Vec::new();

    for path in subdirectories(root)? {
        let is_partition = path
            .file_name()
            .map(|name| partitions.iter().any(|partition| name == *partition))
            .unwrap_or(false);

        if is_partition {
            for nested in subdirectories(&path)? {
                directories.extend(accept(&nested, filters));
            }
        } else {
            directories.extend(accept(&path, filters));
        }
    }

    debug!("Discovered {} log directories below {}", directories.len(), root.display());

    Ok(directories)
}

/// `log/` directory of every run of a harvest config
pub fn runcard_directories(config: &HarvestConfig) -> Vec<PathBuf> {
    config
        .runs()
        .iter()
        .map(|run| result_directory(&config.results_dir, &run.run_tag()).join("log"))
        .collect_vec()
}

fn accept(path: &Path, filters: &Filters) -> Option<PathBuf> {
    if !filters.matches(&path.to_string_lossy()) {
        trace!(path = ?path, "Rejected by filters");

        return None;
    }

    let log = path.join("log");

    log.is_dir().then_some(log)
}

fn subdirectories(directory: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let entries = fs::read_dir(directory).map_err(|source| AnalysisError::ReadDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    Ok(entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .sorted()
        .collect_vec())
}
