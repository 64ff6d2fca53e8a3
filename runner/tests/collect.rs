use flate2::{write::GzEncoder, Compression};
use harvest_ingest::{ClassifyConfig, Seed, Unpacker};
use harvest_runner::{
    catalog::LocalCatalog, Catalog, CatalogError, CollectionReport, Collector, HarvestConfig,
    PullOutcome, Run,
};
use parking_lot::Mutex;
use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Local catalog that records every copy and delete request
struct RecordingCatalog {
    inner: LocalCatalog,
    // names listed although no archive exists for them
    phantom: Vec<String>,
    copies: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
}

impl RecordingCatalog {
    fn new(root: &Path) -> Self {
        Self {
            inner: LocalCatalog::new(root),
            phantom: Vec::new(),
            copies: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    fn copies(&self) -> Vec<String> {
        self.copies.lock().clone()
    }

    fn deletes(&self) -> Vec<String> {
        self.deletes.lock().clone()
    }
}

impl Catalog for RecordingCatalog {
    fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut listing = self.phantom.clone();
        listing.extend(self.inner.list()?);

        Ok(listing)
    }

    fn copy(&self, name: &str, destination: &Path) -> Result<(), CatalogError> {
        self.copies.lock().push(name.to_string());
        self.inner.copy(name, destination)
    }

    fn delete(&self, name: &str) -> Result<(), CatalogError> {
        self.deletes.lock().push(name.to_string());
        self.inner.delete(name)
    }
}

struct Fixture {
    catalog_dir: TempDir,
    results_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            catalog_dir: tempfile::tempdir().unwrap(),
            results_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self, runs: &str) -> HarvestConfig {
        let config: HarvestConfig = serde_yaml::from_str(&format!(
            "results_dir: {:?}\nworkers: 2\ncatalog:\n  local:\n    path: {:?}\nruns:\n{runs}",
            self.results_dir.path(),
            self.catalog_dir.path()
        ))
        .unwrap();
        assert!(!config.preflight_checks());

        config
    }

    fn run(&self) -> Run {
        self.config("  june: run1\n").runs().remove(0)
    }

    fn archive(&self, name: &str, members: &[(&str, &str)]) {
        let file = fs::File::create(self.catalog_dir.path().join(name)).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        for (member, content) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, member, content.as_bytes())
                .unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
    }
}

fn collector(catalog: &RecordingCatalog) -> Collector<&RecordingCatalog> {
    collector_with(catalog, 2)
}

fn collector_with(catalog: &RecordingCatalog, workers: usize) -> Collector<&RecordingCatalog> {
    Collector::new(
        catalog,
        Unpacker::load(&ClassifyConfig::default()).unwrap(),
        workers,
    )
    .unwrap()
}

fn names(directory: &Path) -> Vec<String> {
    let mut names = fs::read_dir(directory)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();

    names
}

fn tree(directory: &Path) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    let mut stack = vec![directory.to_path_buf()];

    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push((path.clone(), fs::read_to_string(&path).unwrap()));
            }
        }
    }
    files.sort();

    files
}

#[test]
fn verified_archive_is_merged_and_corrupted_one_deleted() {
    let fixture = Fixture::new();
    fixture.archive(
        "outputjune-run1-s1.tar.gz",
        &[
            ("june.s1.log", "Elapsed 2.0 hours\n"),
            ("data1.dat", "1 2 3\n"),
        ],
    );
    fixture.archive(
        "outputjune-run1-s2.tar.gz",
        &[("june.log", "no seed here\n"), ("data2.dat", "4 5 6\n")],
    );

    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture.run();
    let reports = collector(&catalog).collect_all(std::slice::from_ref(&run));

    assert_eq!(names(&run.log_dir()), vec!["june.s1.log"]);
    // nothing but the merged result is left, scratch directories included
    assert_eq!(names(&run.directory), vec!["data1.dat", "log"]);
    assert_eq!(catalog.deletes(), vec!["outputjune-run1-s2.tar.gz"]);
    assert_eq!(
        reports,
        vec![CollectionReport {
            run: "june".to_string(),
            archives: 2,
            pulled: 1,
            corrupted: 1,
            ..CollectionReport::default()
        }]
    );
}

#[test]
fn second_pass_downloads_nothing() {
    let fixture = Fixture::new();
    fixture.archive("outputjune-run1-1.tar.gz", &[("june.s1.log", "a\n"), ("a.dat", "a\n")]);
    fixture.archive("outputjune-run1-2.tar.gz", &[("june.s2.log", "b\n")]);

    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture.run();
    let collector = collector(&catalog);

    collector.collect_all(std::slice::from_ref(&run));
    let first = tree(&run.directory);
    assert_eq!(catalog.copies().len(), 2);

    let reports = collector.collect_all(std::slice::from_ref(&run));
    assert_eq!(tree(&run.directory), first);
    assert_eq!(catalog.copies().len(), 2);
    assert!(catalog.deletes().is_empty());
    assert_eq!(reports[0].present, 2);
    assert_eq!(reports[0].pulled, 0);
}

#[test]
fn failed_copy_is_handled_as_corrupted() {
    let fixture = Fixture::new();
    let mut catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    catalog.phantom.push("outputjune-run1-5.tar.gz".to_string());

    let run = fixture.run();
    let reports = collector(&catalog).collect_all(std::slice::from_ref(&run));

    assert_eq!(reports[0].corrupted, 1);
    assert_eq!(reports[0].failed, 0);
    assert_eq!(catalog.deletes(), vec!["outputjune-run1-5.tar.gz"]);
    assert!(names(&run.log_dir()).is_empty());
    assert_eq!(names(&run.directory), vec!["log"]);
}

#[test]
fn seed_is_released_after_a_failed_copy() {
    let fixture = Fixture::new();
    fixture.archive("outputjune-run1-s3.tar.gz", &[("june.s3.log", "Elapsed 1 hours\n")]);

    let mut catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    // listed first and never copyable
    catalog.phantom.push("outputjune-run1-3.tar.gz".to_string());

    let run = fixture.run();
    let reports = collector_with(&catalog, 1).collect_all(std::slice::from_ref(&run));

    assert_eq!(reports[0].pulled, 1);
    assert_eq!(names(&run.log_dir()), vec!["june.s3.log"]);
    assert!(!catalog
        .deletes()
        .contains(&"outputjune-run1-s3.tar.gz".to_string()));
}

#[test]
fn unreadable_archive_is_corrupted() {
    let fixture = Fixture::new();
    fs::write(
        fixture.catalog_dir.path().join("outputjune-run1-9.tar.gz"),
        "definitely not a tarball",
    )
    .unwrap();

    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture.run();
    let reports = collector(&catalog).collect_all(std::slice::from_ref(&run));

    assert_eq!(reports[0].corrupted, 1);
    assert_eq!(catalog.deletes(), vec!["outputjune-run1-9.tar.gz"]);
    assert!(!fixture
        .catalog_dir
        .path()
        .join("outputjune-run1-9.tar.gz")
        .exists());
}

#[test]
fn malformed_names_and_other_runs_are_not_pulled() {
    let fixture = Fixture::new();
    fixture.archive("outputjune-run1-final.tar.gz", &[("june.s1.log", "")]);
    fixture.archive("outputother-run1-1.tar.gz", &[("other.s1.log", "")]);

    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture.run();
    let reports = collector(&catalog).collect_all(std::slice::from_ref(&run));

    assert_eq!(reports[0].archives, 1);
    assert_eq!(reports[0].invalid, 1);
    assert!(catalog.copies().is_empty());
}

#[test]
fn one_seed_is_pulled_once_per_pass() {
    let fixture = Fixture::new();
    fixture.archive("outputjune-run1-3.tar.gz", &[("june.s3.log", "first\n")]);
    fixture.archive("outputjune-run1-s3.tar.gz", &[("june.s3.log", "second\n")]);

    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture.run();
    let reports = collector(&catalog).collect_all(std::slice::from_ref(&run));

    assert_eq!(reports[0].pulled, 1);
    assert_eq!(reports[0].claimed, 1);
    assert_eq!(catalog.copies().len(), 1);
    assert_eq!(names(&run.log_dir()), vec!["june.s3.log"]);
}

#[test]
fn missing_seeds_are_reported() {
    let fixture = Fixture::new();
    fixture.archive("outputjune-run1-1.tar.gz", &[("june.s1.log", "")]);

    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture
        .config("  june:\n    tag: run1\n    seeds: { base: 1, count: 3 }\n")
        .runs()
        .remove(0);
    let reports = collector(&catalog).collect_all(std::slice::from_ref(&run));

    assert_eq!(
        reports[0].missing,
        vec![Seed::new("2").unwrap(), Seed::new("3").unwrap()]
    );
}

#[test]
fn pull_one_skips_present_seed() {
    let fixture = Fixture::new();
    let catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    let run = fixture.run();
    fs::create_dir_all(run.log_dir()).unwrap();

    let outcome = collector(&catalog).pull_one(
        "outputjune-run1-4.tar.gz",
        &Seed::new("4").unwrap(),
        &run,
        &["june.s4.log".to_string()],
        &Mutex::new(HashSet::new()),
    );

    assert_eq!(outcome, PullOutcome::Present);
    assert!(catalog.copies().is_empty());
}

#[test]
fn claim_is_kept_only_for_a_pulled_seed() {
    let fixture = Fixture::new();
    fixture.archive("outputjune-run1-s7.tar.gz", &[("june.s7.log", "")]);

    let mut catalog = RecordingCatalog::new(fixture.catalog_dir.path());
    catalog.phantom.push("outputjune-run1-7.tar.gz".to_string());

    let run = fixture.run();
    fs::create_dir_all(run.log_dir()).unwrap();

    let collector = collector(&catalog);
    let seed = Seed::new("7").unwrap();
    let claims = Mutex::new(HashSet::new());

    let failed = collector.pull_one("outputjune-run1-7.tar.gz", &seed, &run, &[], &claims);
    assert_eq!(failed, PullOutcome::Corrupted { deleted: false });
    assert!(claims.lock().is_empty());

    let pulled = collector.pull_one("outputjune-run1-s7.tar.gz", &seed, &run, &[], &claims);
    assert_eq!(pulled, PullOutcome::Pulled { logs: 1, data: 0 });
    assert!(claims.lock().contains(&seed));

    let again = collector.pull_one("outputjune-run1-s7.tar.gz", &seed, &run, &[], &claims);
    assert_eq!(again, PullOutcome::Claimed);
}
