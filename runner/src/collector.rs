use crate::{
    catalog::Catalog,
    config::{ConfigErrors, Run},
    executors::LocalExecutor,
    hooks::FinaliseHook,
    scratch::{is_scratch_name, ScratchDir},
};
use harvest_ingest::{has_seed, Seed, Unpacked, Unpacker};
use itertools::Itertools;
use parking_lot::Mutex;
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

/// What happened to a single archive during a collection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// the seed was already collected before this pass
    Present,
    /// another archive of this pass carries the same seed
    Claimed,
    /// log and data files were merged into the result tree
    Pulled { logs: usize, data: usize },
    /// the archive could not be copied, unpacked or verified, a delete was requested
    Corrupted { deleted: bool },
    /// no scratch directory or the merge failed, the remote archive is left alone
    Failed(String),
}

/// Per run tally of a collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub run: String,
    pub archives: usize,
    pub invalid: usize,
    pub present: usize,
    pub claimed: usize,
    pub pulled: usize,
    pub corrupted: usize,
    pub failed: usize,
    /// seeds of the configured range that are still not collected
    pub missing: Vec<Seed>,
}

impl CollectionReport {
    fn new(run: &Run) -> Self {
        Self {
            run: run.name.clone(),
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &PullOutcome) {
        match outcome {
            PullOutcome::Present => self.present += 1,
            PullOutcome::Claimed => self.claimed += 1,
            PullOutcome::Pulled { .. } => self.pulled += 1,
            PullOutcome::Corrupted { .. } => self.corrupted += 1,
            PullOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Pulls output archives from a catalog, verifies them and merges them into
/// the result tree of their run
#[derive(Debug)]
pub struct Collector<C> {
    catalog: C,
    unpacker: Unpacker,
    executor: LocalExecutor,
}

impl<C: Catalog> Collector<C> {
    pub fn new(catalog: C, unpacker: Unpacker, workers: usize) -> Result<Self, ConfigErrors> {
        Ok(Self {
            catalog,
            unpacker,
            executor: LocalExecutor::new(workers)?,
        })
    }

    /// Collect every run in order against a single catalog listing.
    /// A failing listing is logged and treated as an empty catalog.
    #[instrument(skip_all, level = "info")]
    pub fn collect_all(&self, runs: &[Run]) -> Vec<CollectionReport> {
        let listing = match self.catalog.list() {
            Ok(listing) => listing,
            Err(e) => {
                error!("Failed to list the catalog, nothing will be pulled: {e}");

                Vec::new()
            }
        };

        debug!("Catalog lists {} archives", listing.len());

        runs.iter()
            .enumerate()
            .map(|(index, run)| {
                info!(
                    "> Checking output for {} [{}/{}]",
                    run.name,
                    index + 1,
                    runs.len()
                );

                match self.collect(run, &listing) {
                    Ok(report) => report,
                    Err(e) => {
                        error!(run = %run.name, "Failed to prepare result directory: {e}");

                        CollectionReport::new(run)
                    }
                }
            })
            .collect_vec()
    }

    /// Pull every archive of `run` found in `listing` that is not collected yet
    #[instrument(skip_all, fields(run = %run.name), level = "info")]
    pub fn collect(&self, run: &Run, listing: &[String]) -> io::Result<CollectionReport> {
        let snapshot = prepare_directories(run)?;
        let prefix = run.archive_prefix();
        let mut report = CollectionReport::new(run);

        let tasks = listing
            .iter()
            .filter(|name| name.contains(prefix.as_str()))
            .filter_map(|name| {
                report.archives += 1;

                match Seed::from_archive_name(name) {
                    Ok(seed) => Some((name.as_str(), seed)),
                    Err(e) => {
                        error!("Skipping archive with malformed name: {e}");
                        report.invalid += 1;

                        None
                    }
                }
            })
            .collect_vec();

        let claims = Mutex::new(HashSet::new());

        let outcomes = self.executor.execute(&run.name, tasks, |(name, seed)| {
            self.pull_one(name, &seed, run, &snapshot, &claims)
        });

        outcomes.iter().for_each(|outcome| report.record(outcome));

        if run.seeds.is_some() {
            let collected = list_file_names(&run.log_dir())?;

            report.missing = run
                .expected_seeds()
                .into_iter()
                .filter(|seed| !has_seed(&collected, seed))
                .collect_vec();

            if !report.missing.is_empty() {
                warn!(
                    "{} of {} expected seeds are still missing: {}",
                    report.missing.len(),
                    run.expected_seeds().len(),
                    report.missing.iter().join(", ")
                );
            }
        }

        info!(
            archives = report.archives,
            pulled = report.pulled,
            present = report.present,
            corrupted = report.corrupted,
            failed = report.failed,
            invalid = report.invalid,
            "Collection finished"
        );

        if let Some(finalise) = &run.finalise {
            if let Err(e) = FinaliseHook::load(finalise).run(&run.directory) {
                warn!("Finalise hook failed to run: {e}");
            }
        }

        Ok(report)
    }

    /// Pull a single archive, verify it carries `seed` and merge it.
    /// `snapshot` is the log listing taken before the pass started.
    pub fn pull_one(
        &self,
        name: &str,
        seed: &Seed,
        run: &Run,
        snapshot: &[String],
        claims: &Mutex<HashSet<Seed>>,
    ) -> PullOutcome {
        if has_seed(snapshot, seed) {
            debug!(seed = %seed, "Seed already collected");

            return PullOutcome::Present;
        }

        if !claims.lock().insert(seed.clone()) {
            warn!(archive = name, seed = %seed, "Seed is already pulled from another archive in this pass");

            return PullOutcome::Claimed;
        }

        let outcome = self.fetch(name, seed, run);

        // a later archive of the same seed may still succeed
        if !matches!(outcome, PullOutcome::Pulled { .. }) {
            claims.lock().remove(seed);
        }

        outcome
    }

    fn fetch(&self, name: &str, seed: &Seed, run: &Run) -> PullOutcome {
        // removed on every return below
        let scratch = match ScratchDir::create(&run.directory) {
            Ok(scratch) => scratch,
            Err(e) => {
                error!("Failed to create scratch directory: {e}");

                return PullOutcome::Failed(e.to_string());
            }
        };

        info!("Pulling {}, seed {seed}", run.name);

        let local = scratch.join(name);

        let unpacked = match self.catalog.copy(name, &local) {
            Ok(()) => match self.unpacker.unpack(&local, scratch.path()) {
                Ok(unpacked) => Some(unpacked),
                Err(e) => {
                    warn!(archive = name, "Failed to unpack archive: {e}");

                    None
                }
            },
            Err(e) => {
                warn!(archive = name, "Failed to copy archive: {e}");

                None
            }
        };

        match unpacked {
            Some(unpacked) if has_seed(unpacked.file_names(), seed) => {
                match merge(&unpacked, seed, run) {
                    Ok((logs, data)) => PullOutcome::Pulled { logs, data },
                    Err(e) => {
                        error!(archive = name, "Failed to merge archive content: {e}");

                        PullOutcome::Failed(e.to_string())
                    }
                }
            }
            _ => {
                warn!("Deleting {}, seed {seed}. Corrupted output", run.name);

                let deleted = match self.catalog.delete(name) {
                    Ok(()) => true,
                    Err(e) => {
                        error!(archive = name, "Failed to delete corrupted archive: {e}");

                        false
                    }
                };

                PullOutcome::Corrupted { deleted }
            }
        }
    }
}

/// Create the run directory and its `log/` directory, then snapshot the
/// names of the logs collected so far
fn prepare_directories(run: &Run) -> io::Result<Vec<String>> {
    fs::create_dir_all(run.log_dir())?;

    let stale = list_file_names(&run.directory)
        .unwrap_or_default()
        .into_iter()
        .filter(|name| is_scratch_name(name))
        .collect_vec();

    if !stale.is_empty() {
        warn!(
            "Found {} scratch directories of an interrupted pass in {}: {}",
            stale.len(),
            run.directory.display(),
            stale.join(", ")
        );
    }

    list_file_names(&run.log_dir())
}

fn list_file_names(directory: &Path) -> io::Result<Vec<String>> {
    Ok(fs::read_dir(directory)?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect_vec())
}

/// Move data files into the run root and the seed's logs into `log/`.
/// Logs go last, so a collected log always implies its data was merged.
fn merge(unpacked: &Unpacked, seed: &Seed, run: &Run) -> io::Result<(usize, usize)> {
    for path in unpacked.data.iter() {
        move_into(path, &run.directory)?;
    }

    let logs = unpacked.logs_for(seed).collect_vec();

    if logs.len() < unpacked.logs.len() {
        debug!(
            "Ignoring {} log files without the marker of seed {seed}",
            unpacked.logs.len() - logs.len()
        );
    }

    let log_dir = run.log_dir();
    for path in logs.iter() {
        move_into(path, &log_dir)?;
    }

    Ok((logs.len(), unpacked.data.len()))
}

fn move_into(path: &Path, directory: &Path) -> io::Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let target = directory.join(file_name);

    fs::rename(path, &target)?;
    debug!(target = ?target, "Moved file");

    Ok(target)
}
