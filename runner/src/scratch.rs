use once_cell::sync::Lazy;
use std::{
    fs, io,
    ops::Deref,
    path::{Path, PathBuf},
};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub const SCRATCH_PREFIX: &str = ".process_";
pub const SCRATCH_SUFFIX: &str = "_tmp";

/// host name of this node, part of every scratch directory name so that
/// collectors on different nodes sharing a result directory never collide
static HOSTNAME: Lazy<String> = Lazy::new(|| match nix::unistd::gethostname() {
    Ok(hostname) => hostname.to_string_lossy().replace('/', "_"),
    Err(error) => {
        warn!(error = ?error, "Failed to retrieve hostname for scratch directories");

        String::from("localhost")
    }
});

/// Directory exclusive to a single pull, removed with all its content on drop
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// create a fresh, uniquely named scratch directory below `parent`
    pub fn create(parent: &Path) -> io::Result<Self> {
        let token = Uuid::new_v4().simple();
        let path = parent.join(format!(
            "{SCRATCH_PREFIX}{}_{token}{SCRATCH_SUFFIX}",
            *HOSTNAME
        ));

        fs::create_dir(&path)?;
        debug!(path = ?path, "Created scratch directory");

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for ScratchDir {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Removed scratch directory"),
            Err(error) => error!(path = ?self.path, error = ?error, "Failed to clean up scratch directory"),
        }
    }
}

/// true for names produced by `ScratchDir::create`
pub fn is_scratch_name(name: &str) -> bool {
    name.starts_with(SCRATCH_PREFIX) && name.ends_with(SCRATCH_SUFFIX)
}
