//! Collection of batch job results from a remote catalog into per run result trees

pub mod catalog;
pub mod collector;
pub mod config;
pub mod executors;
pub mod hooks;
pub mod process;
pub mod scratch;

pub use catalog::{Catalog, CatalogError, Catalogs};
pub use collector::{CollectionReport, Collector, PullOutcome};
pub use config::{ConfigErrors, HarvestConfig, Run};
