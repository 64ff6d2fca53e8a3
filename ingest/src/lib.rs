//! Unpacking and verification of result archives pulled from a remote catalog

pub mod seed;
pub mod unpack;


use std::path::PathBuf;
use thiserror::Error;

pub use seed::{has_seed, Seed, SeedError};
pub use unpack::{ClassifyConfig, Unpacked, Unpacker};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Classification globs were invalid")]
    InvalidGlob(#[from] globset::Error),
    #[error("Failed to extract {archive:?}: {source}")]
    Extract {
        archive: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read extracted files")]
    Io(#[from] std::io::Error),
}
