use std::{
    io::Read,
    process::{Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("Failed to wait for a child proccess")]
    ChildError(#[from] std::io::Error),
    #[error("{program} did not finish within {timeout:?}")]
    ChildTimeout { program: String, timeout: Duration },
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Both output pipes are drained on their own threads so that a chatty child
/// never blocks on a full pipe while we wait for it.
pub fn run(command: &mut Command, timeout: Option<Duration>) -> Result<CommandOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    debug!(program = %program, pid = child.id(), "Waiting on child");

    let status = match timeout {
        Some(timeout) => match child.wait_timeout(timeout)? {
            Some(status) => status,
            None => {
                // child hasn't exited yet
                if let Err(error) = child.kill() {
                    warn!(program = %program, error = ?error, "Failed to kill child after timeout");
                }
                let _ = child.wait();

                return Err(ProcessError::ChildTimeout { program, timeout });
            }
        },
        None => child.wait()?,
    };

    Ok(CommandOutput {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);

        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
