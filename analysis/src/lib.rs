//! Timing statistics over the logs of collected runs

pub mod discover;
pub mod report;
pub mod stats;
pub mod timing;

use std::path::PathBuf;
use thiserror::Error;

pub use discover::{discover, runcard_directories, Filters};
pub use stats::{histogram, summarize, Summary};
pub use timing::{compile_time_info, TimeInfo};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("Failed to read directory {path:?}: {source}")]
    ReadDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to walk log directory")]
    Walk(#[from] ignore::Error),
}
