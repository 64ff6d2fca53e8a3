use harvest_ingest::{ClassifyConfig, IngestError, Seed, Unpacker};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, warn};

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound(path.to_path_buf()))
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file {path:?}: {source}")]
    ReadConfig { path: PathBuf, source: Error },
    #[error("Failed to parse config file")]
    ParseConfig(#[from] serde_yaml::Error),
    #[error("Classification globs were invalid")]
    InvalidGlobs(#[from] IngestError),
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Metadata not found")]
    MetadataNotFound(#[source] Error),
    #[error("Failed to build the worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Run {0} is not defined")]
    UnknownRun(String),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct HarvestConfig {
    // root under which every `results_<runtag>` directory lives
    pub results_dir: PathBuf,
    // size of the pull pool, defaults to the number of CPUs
    #[serde(default)]
    pub workers: Option<usize>,
    // written as `catalog: { lfc: {...} }` rather than a `!lfc` tag
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
    // runcard name -> run definition
    #[serde(alias = "runcards")]
    pub runs: BTreeMap<String, RunConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, rename_all = "lowercase")]
pub enum CatalogConfig {
    /// LFC catalog driven through the lfc-ls/ lcg-cp/ lcg-del command line tools
    Lfc {
        host: String,
        #[serde(default = "default_catalog_type")]
        catalog_type: String,
        home: String,
        #[serde(default = "default_catalog_directory")]
        directory: String,
        // per command timeout in seconds, unbounded if absent
        timeout: Option<u64>,
    },
    /// a plain directory standing in for the catalog
    Local { path: PathBuf },
}

/// A run is either given by its tag alone or by a full definition
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum RunConfig {
    Tag(String),
    Full(RunDefinition),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct RunDefinition {
    pub tag: String,
    pub seeds: Option<SeedRange>,
    pub finalise: Option<FinaliseConfig>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SeedRange {
    pub base: u64,
    pub count: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct FinaliseConfig {
    pub exec: PathBuf,
    #[serde(default)]
    pub params: Vec<String>,
    // milliseconds
    #[serde(default = "default_hook_timeout")]
    pub timeout: u64,
}

/// A run resolved against the config, immutable during a collection pass
#[derive(Clone, Debug)]
pub struct Run {
    pub name: String,
    pub tag: String,
    pub directory: PathBuf,
    pub seeds: Option<SeedRange>,
    pub finalise: Option<FinaliseConfig>,
}

impl Run {
    /// `<name>-<tag>`, the part shared by the result directory and archive names
    pub fn run_tag(&self) -> String {
        format!("{}-{}", self.name, self.tag)
    }

    /// substring that every output archive of this run contains
    pub fn archive_prefix(&self) -> String {
        format!("output{}-", self.run_tag())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.directory.join("log")
    }

    pub fn expected_seeds(&self) -> Vec<Seed> {
        self.seeds
            .map(|range| {
                (range.base..range.base.saturating_add(range.count))
                    .filter_map(|seed| Seed::new(&seed.to_string()))
                    .collect_vec()
            })
            .unwrap_or_default()
    }
}

impl RunConfig {
    fn definition(&self) -> RunDefinition {
        match self {
            Self::Tag(tag) => RunDefinition {
                tag: tag.clone(),
                seeds: None,
                finalise: None,
            },
            Self::Full(definition) => definition.clone(),
        }
    }
}

/// directory holding the results of `run_tag` below `results_dir`
pub fn result_directory(results_dir: &Path, run_tag: &str) -> PathBuf {
    results_dir.join(format!("results_{run_tag}"))
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let file = File::open(path).map_err(|source| ConfigErrors::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// resolve all runs in name order
    pub fn runs(&self) -> Vec<Run> {
        self.runs
            .iter()
            .map(|(name, config)| self.resolve(name, config))
            .collect_vec()
    }

    /// resolve only the named runs, every run if `names` is empty
    pub fn select_runs(&self, names: &[String]) -> Result<Vec<Run>, ConfigErrors> {
        if names.is_empty() {
            return Ok(self.runs());
        }

        names
            .iter()
            .map(|name| {
                self.runs
                    .get(name)
                    .map(|config| self.resolve(name, config))
                    .ok_or_else(|| ConfigErrors::UnknownRun(name.clone()))
            })
            .collect()
    }

    fn resolve(&self, name: &str, config: &RunConfig) -> Run {
        let definition = config.definition();
        let run_tag = format!("{name}-{}", definition.tag);

        Run {
            name: name.to_string(),
            directory: result_directory(&self.results_dir, &run_tag),
            tag: definition.tag,
            seeds: definition.seeds,
            finalise: definition.finalise,
        }
    }

    /// Validate the config, logging every problem found instead of stopping at the first.
    /// Returns true if the config contains errors.
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if self.results_dir.as_os_str().is_empty() {
            error!("results_dir must not be empty");
            contains_error = true;
        } else if self.results_dir.exists() && !self.results_dir.is_dir() {
            error!(
                "results_dir {} exists but is not a directory",
                self.results_dir.to_string_lossy()
            );
            contains_error = true;
        }

        if self.workers == Some(0) {
            error!("workers cannot be 0, omit it to use one worker per CPU");
            contains_error = true;
        }

        match &self.catalog {
            CatalogConfig::Lfc { host, home, .. } => {
                if host.is_empty() || home.is_empty() {
                    error!("catalog.lfc requires both host and home to be set");
                    contains_error = true;
                }
            }
            CatalogConfig::Local { path } => {
                if !path.is_dir() {
                    error!(
                        "catalog.local.path {} is not a directory",
                        path.to_string_lossy()
                    );
                    contains_error = true;
                }
            }
        }

        if let Err(e) = Unpacker::load(&self.classify) {
            error!("classify globs failed to compile: {e}");
            contains_error = true;
        }

        if self.runs.is_empty() {
            error!("No run was defined, there is nothing to collect");
            contains_error = true;
        }

        for (name, config) in self.runs.iter() {
            let definition = config.definition();

            if name.is_empty() || name.contains('/') {
                error!("Run name {name:?} must be non-empty and must not contain '/'");
                contains_error = true;
            }

            if definition.tag.is_empty() || definition.tag.contains('/') {
                error!("runs.{name}.tag must be non-empty and must not contain '/'");
                contains_error = true;
            }

            if let Some(SeedRange { count: 0, .. }) = definition.seeds {
                warn!("runs.{name}.seeds has a count of 0, no seeds will be expected");
            }

            if let Some(finalise) = definition.finalise {
                match check_executable(&finalise.exec) {
                    Ok(true) => {}
                    Ok(false) => {
                        error!(
                            "runs.{name}.finalise.exec {} is not executable",
                            finalise.exec.to_string_lossy()
                        );
                        contains_error = true;
                    }
                    Err(e) => {
                        error!(
                            "Failed to determine if runs.{name}.finalise.exec ({}) is an executable: {e}",
                            finalise.exec.to_string_lossy()
                        );
                        contains_error = true;
                    }
                }

                if finalise.timeout == 0 {
                    error!("runs.{name}.finalise.timeout cannot be 0");
                    contains_error = true;
                }
            }
        }

        contains_error
    }
}

fn default_catalog_type() -> String {
    String::from("lfc")
}

fn default_catalog_directory() -> String {
    String::from("output")
}

fn default_hook_timeout() -> u64 {
    60_000
}
