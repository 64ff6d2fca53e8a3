use super::{Catalog, CatalogError};
use itertools::Itertools;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// A plain directory used in place of a remote catalog, e.g. a mirror of the
/// grid output directory
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
}

impl LocalCatalog {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl Catalog for LocalCatalog {
    fn list(&self) -> Result<Vec<String>, CatalogError> {
        Ok(fs::read_dir(&self.root)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .sorted()
            .collect_vec())
    }

    fn copy(&self, name: &str, destination: &Path) -> Result<(), CatalogError> {
        let bytes = fs::copy(self.root.join(name), destination)?;
        debug!(name = name, bytes = bytes, "Copied archive");

        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), CatalogError> {
        Ok(fs::remove_file(self.root.join(name))?)
    }
}
