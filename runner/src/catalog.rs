mod lfc;
mod local;

pub use lfc::LfcCatalog;
pub use local::LocalCatalog;

use crate::{config::CatalogConfig, process::ProcessError};
use std::{path::Path, process::ExitStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog command failed to run")]
    Process(#[from] ProcessError),
    #[error("{command} exited with {status}: {stderr}")]
    Status {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Catalog I/O failed")]
    Io(#[from] std::io::Error),
}

/// Remote store holding the output archives of finished jobs
pub trait Catalog: Sync {
    /// names of every archive currently stored
    fn list(&self) -> Result<Vec<String>, CatalogError>;

    /// copy the archive `name` to the local file `destination`
    fn copy(&self, name: &str, destination: &Path) -> Result<(), CatalogError>;

    /// remove the archive `name` from the catalog
    fn delete(&self, name: &str) -> Result<(), CatalogError>;
}

/// All supported catalog backends, initialized from `Catalogs::load`
#[derive(Debug, Clone)]
pub enum Catalogs {
    Lfc(LfcCatalog),
    Local(LocalCatalog),
}

impl Catalogs {
    pub fn load(config: &CatalogConfig) -> Self {
        match config {
            CatalogConfig::Lfc {
                host,
                catalog_type,
                home,
                directory,
                timeout,
            } => Self::Lfc(LfcCatalog::new(
                host,
                catalog_type,
                home,
                directory,
                *timeout,
            )),
            CatalogConfig::Local { path } => Self::Local(LocalCatalog::new(path)),
        }
    }
}

impl Catalog for Catalogs {
    fn list(&self) -> Result<Vec<String>, CatalogError> {
        match self {
            Self::Lfc(catalog) => catalog.list(),
            Self::Local(catalog) => catalog.list(),
        }
    }

    fn copy(&self, name: &str, destination: &Path) -> Result<(), CatalogError> {
        match self {
            Self::Lfc(catalog) => catalog.copy(name, destination),
            Self::Local(catalog) => catalog.copy(name, destination),
        }
    }

    fn delete(&self, name: &str) -> Result<(), CatalogError> {
        match self {
            Self::Lfc(catalog) => catalog.delete(name),
            Self::Local(catalog) => catalog.delete(name),
        }
    }
}

impl<C: Catalog> Catalog for &C {
    fn list(&self) -> Result<Vec<String>, CatalogError> {
        (**self).list()
    }

    fn copy(&self, name: &str, destination: &Path) -> Result<(), CatalogError> {
        (**self).copy(name, destination)
    }

    fn delete(&self, name: &str) -> Result<(), CatalogError> {
        (**self).delete(name)
    }
}
