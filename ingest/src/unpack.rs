use crate::{seed::Seed, IngestError};
use flate2::read::GzDecoder;
use globset::{GlobBuilder, GlobMatcher};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};
use tar::Archive;
use tracing::{debug, trace};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ClassifyConfig {
    /// glob selecting the log member of an archive
    #[serde(default = "default_log_glob")]
    pub log: String,
    /// glob selecting data members, these land in the run root
    #[serde(default = "default_data_glob")]
    pub data: String,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            log: default_log_glob(),
            data: default_data_glob(),
        }
    }
}

fn default_log_glob() -> String {
    String::from("*.log")
}

fn default_data_glob() -> String {
    String::from("*.dat")
}

/// Files found at the top level of an extracted archive
#[derive(Debug, Default, Clone)]
pub struct Unpacked {
    pub logs: Vec<PathBuf>,
    pub data: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
}

impl Unpacked {
    /// names of every extracted file, the listing the seed check runs against
    pub fn file_names(&self) -> Vec<String> {
        self.logs
            .iter()
            .chain(self.data.iter())
            .chain(self.other.iter())
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect_vec()
    }

    /// log files carrying the marker of `seed`
    pub fn logs_for<'a>(&'a self, seed: &Seed) -> impl Iterator<Item = &'a PathBuf> {
        let marker = seed.marker();

        self.logs.iter().filter(move |path| {
            path.file_name()
                .map(|name| name.to_string_lossy().contains(marker.as_str()))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone)]
pub struct Unpacker {
    log: GlobMatcher,
    data: GlobMatcher,
}

impl Unpacker {
    pub fn load(config: &ClassifyConfig) -> Result<Self, IngestError> {
        Ok(Self {
            log: GlobBuilder::new(&config.log).build()?.compile_matcher(),
            data: GlobBuilder::new(&config.data).build()?.compile_matcher(),
        })
    }

    /// Extract `archive` into `destination` and classify what came out of it
    pub fn unpack(&self, archive: &Path, destination: &Path) -> Result<Unpacked, IngestError> {
        extract(archive, destination).map_err(|source| IngestError::Extract {
            archive: archive.to_path_buf(),
            source,
        })?;

        self.classify(destination, archive.file_name())
    }

    /// Sort the regular files directly inside `directory` into logs, data and the rest.
    /// A file named `skip` (usually the archive itself) is left out.
    pub fn classify(
        &self,
        directory: &Path,
        skip: Option<&OsStr>,
    ) -> Result<Unpacked, IngestError> {
        let mut unpacked = Unpacked::default();

        let entries = fs::read_dir(directory)?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .sorted();

        for path in entries {
            let name = match path.file_name() {
                Some(name) if Some(name) != skip => name,
                _ => continue,
            };

            if self.log.is_match(name) {
                unpacked.logs.push(path);
            } else if self.data.is_match(name) {
                unpacked.data.push(path);
            } else {
                trace!(path = ?path, "Unclassified archive member");
                unpacked.other.push(path);
            }
        }

        debug!(
            logs = unpacked.logs.len(),
            data = unpacked.data.len(),
            other = unpacked.other.len(),
            "Classified archive members"
        );

        Ok(unpacked)
    }
}

/// unpack a tar archive, gzip compressed or not, detected by magic bytes
fn extract(archive: &Path, destination: &Path) -> std::io::Result<()> {
    let mut file = File::open(archive)?;
    let mut magic = [0u8; 2];
    let read = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    let reader = BufReader::new(file);

    if read == GZIP_MAGIC.len() && magic == GZIP_MAGIC {
        Archive::new(GzDecoder::new(reader)).unpack(destination)
    } else {
        Archive::new(reader).unpack(destination)
    }
}
