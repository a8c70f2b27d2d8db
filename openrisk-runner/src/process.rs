//! Local process execution
//!
//! Spawns one external program, drains stdout and stderr concurrently into a
//! shared tail buffer and waits for exit without blocking the runtime. Every
//! line is also shown to the step's failure policy before it can be dropped
//! from the tail.

use openrisk_core::domain::pipeline::StepCommand;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, StepError};
use crate::output::SharedTailBuffer;
use crate::step::FailurePolicy;

/// What a finished process left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Combined stdout/stderr tail
    pub output: String,
    /// Some line of the full output satisfied the failure policy
    pub benign: bool,
}

/// Runs `command` in `working_dir` and captures its combined output
///
/// Output is kept to the trailing `limit` characters, but `policy` sees every
/// line. There is no timeout: a process that never exits keeps the returned
/// future pending.
pub async fn run_process(
    command: &StepCommand,
    working_dir: &Path,
    limit: usize,
    policy: &dyn FailurePolicy,
) -> Result<ProcessOutput> {
    debug!(
        "Spawning '{}' in {}",
        command,
        working_dir.display()
    );

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| StepError::Spawn {
            program: command.program.clone(),
            source,
        })?;

    let buffer = SharedTailBuffer::new(limit);
    let benign = AtomicBool::new(false);
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout_res, stderr_res) = tokio::join!(
        pump(stdout, buffer.clone(), policy, &benign),
        pump(stderr, buffer.clone(), policy, &benign)
    );
    stdout_res?;
    stderr_res?;

    let status = child.wait().await?;

    debug!(
        "Process '{}' exited with {:?}",
        command.program,
        status.code()
    );

    Ok(ProcessOutput {
        exit_code: status.code(),
        success: status.success(),
        output: buffer.snapshot(),
        benign: benign.load(Ordering::Relaxed),
    })
}

/// Copies a pipe into the buffer line by line until EOF
///
/// Whole lines are decoded at once so multi-byte characters are never split.
/// `benign` is sticky: once a line matches, later lines are not checked.
async fn pump<R>(
    reader: Option<R>,
    buffer: SharedTailBuffer,
    policy: &dyn FailurePolicy,
    benign: &AtomicBool,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(());
    };

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).await?;
        if read == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        if !benign.load(Ordering::Relaxed) && policy.is_benign(&text) {
            benign.store(true, Ordering::Relaxed);
        }
        buffer.push_str(&text);
    }

    Ok(())
}
