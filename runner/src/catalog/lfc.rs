use super::{Catalog, CatalogError};
use crate::process::{self, CommandOutput};
use itertools::Itertools;
use std::{path::Path, process::Command, time::Duration};
use tracing::{debug, instrument};

const LIST: &str = "lfc-ls";
const COPY: &str = "lcg-cp";
const DELETE: &str = "lcg-del";

/// LFC file catalog, driven through the grid command line tools
#[derive(Debug, Clone)]
pub struct LfcCatalog {
    host: String,
    catalog_type: String,
    home: String,
    directory: String,
    timeout: Option<Duration>,
}

impl LfcCatalog {
    pub fn new(
        host: &str,
        catalog_type: &str,
        home: &str,
        directory: &str,
        timeout: Option<u64>,
    ) -> Self {
        Self {
            host: host.to_string(),
            catalog_type: catalog_type.to_string(),
            home: home.to_string(),
            directory: directory.trim_end_matches('/').to_string(),
            timeout: timeout.map(Duration::from_secs),
        }
    }

    /// command with the catalog environment set
    fn command(&self, program: &str) -> Command {
        let mut command = Command::new(program);
        command
            .env("LFC_HOST", &self.host)
            .env("LCG_CATALOG_TYPE", &self.catalog_type)
            .env("LFC_HOME", &self.home);

        command
    }

    fn lfn(&self, name: &str) -> String {
        format!("lfn:{}/{name}", self.directory)
    }

    fn checked(&self, mut command: Command) -> Result<CommandOutput, CatalogError> {
        let output = process::run(&mut command, self.timeout)?;

        if output.status.success() {
            Ok(output)
        } else {
            debug!(stderr = %output.stderr, "Catalog command failed");

            Err(CatalogError::Status {
                command: format!("{command:?}"),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// one archive name per non-empty line
fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect_vec()
}

impl Catalog for LfcCatalog {
    #[instrument(skip(self), level = "debug")]
    fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut command = self.command(LIST);
        command.arg(&self.directory);

        self.checked(command).map(|output| parse_listing(&output.stdout))
    }

    #[instrument(skip(self), level = "debug")]
    fn copy(&self, name: &str, destination: &Path) -> Result<(), CatalogError> {
        let mut command = self.command(COPY);
        command.arg(self.lfn(name)).arg(destination);

        self.checked(command).map(|_| ())
    }

    #[instrument(skip(self), level = "debug")]
    fn delete(&self, name: &str) -> Result<(), CatalogError> {
        let mut command = self.command(DELETE);
        command.arg("-a").arg(self.lfn(name));

        self.checked(command).map(|_| ())
    }
}
