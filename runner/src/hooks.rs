use crate::{
    config::FinaliseConfig,
    process::{self, ProcessError},
};
use std::{
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};
use tracing::{debug, info, warn};

/// Executable run once per run after its archives were pulled, receiving the
/// result directory as its last argument
#[derive(Debug, Clone)]
pub struct FinaliseHook {
    pub exec: PathBuf,
    pub params: Vec<String>,
    pub timeout: Duration,
}

impl FinaliseHook {
    pub fn load(config: &FinaliseConfig) -> Self {
        Self {
            exec: config.exec.clone(),
            params: config.params.clone(),
            timeout: Duration::from_millis(config.timeout),
        }
    }

    /// Returns whether the hook exited successfully
    #[tracing::instrument(level = "debug")]
    pub fn run(&self, directory: &Path) -> Result<bool, ProcessError> {
        let output = process::run(
            Command::new(&self.exec).args(&self.params).arg(directory),
            Some(self.timeout),
        )?;

        debug!("Output from finalise hook: {}", output.stdout);

        if output.status.success() {
            info!(exec = ?self.exec, "Finalise hook succeeded");
        } else {
            warn!(
                exec = ?self.exec,
                status = %output.status,
                stderr = %output.stderr,
                "Finalise hook failed, attempting to continue"
            );
        }

        Ok(output.status.success())
    }
}
