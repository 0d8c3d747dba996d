/*
 * process.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Subprocess helper with a wall-clock bound.
 */

//! Subprocess helper shared by the process-backed collaborators.
//!
//! Each call drives its child on a private current-thread tokio runtime so
//! callers stay synchronous. The child is killed if the bound elapses.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum ProcessFailure {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `program` to completion, feeding it `stdin` and collecting its output.
pub fn run_with_timeout<I, S>(
    program: &Path,
    args: I,
    cwd: Option<&Path>,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessFailure>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!(program = %program.display(), "Spawning process");
        let mut child = cmd.spawn().map_err(|source| ProcessFailure::Spawn {
            program: program.display().to_string(),
            source,
        })?;

        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(input)) = (pipe, stdin) {
                // A child that exits without reading its input is not an error here.
                match pipe.write_all(input).await {
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                let _ = pipe.shutdown().await;
            }
            Ok::<(), std::io::Error>(())
        };

        let run = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(output) => {
                let output = output?;
                Ok(ProcessOutput {
                    status: output.status,
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Err(_) => Err(ProcessFailure::Timeout(timeout)),
        }
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_collects_stdout_from_stdin() {
        let output = run_with_timeout(
            Path::new("cat"),
            Vec::<&str>::new(),
            None,
            Some(b"SELECT 1"),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout_lossy(), "SELECT 1");
    }

    #[test]
    fn test_timeout_kills_child() {
        let err = run_with_timeout(
            Path::new("sleep"),
            ["5"],
            None,
            None,
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessFailure::Timeout(_)));
    }

    #[test]
    fn test_missing_program() {
        let err = run_with_timeout(
            Path::new("sqlnb-definitely-not-installed"),
            ["--version"],
            None,
            None,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessFailure::Spawn { .. }));
    }
}
