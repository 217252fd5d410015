//! Script execution through an external interpreter process.

use std::io;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::engine::script::{ScriptExecutor, ScriptRequest};
use crate::io::config::ScriptConfig;

pub const FILE_ENV: &str = "REQBRIDGE_SCRIPT_FILE";
pub const VARIABLES_ENV: &str = "REQBRIDGE_SCRIPT_VARIABLES";
pub const LINE_OFFSET_ENV: &str = "REQBRIDGE_SCRIPT_LINE_OFFSET";

/// Captured interpreter output. At most the configured limit is kept per
/// stream; the `*_truncated` counters hold the discarded byte counts.
#[derive(Debug)]
pub struct ScriptOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl ScriptOutput {
    pub fn stderr_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stderr).into_owned();
        if self.stderr_truncated > 0 {
            text.push_str(&format!("\n[stderr truncated {} bytes]", self.stderr_truncated));
        }
        text
    }
}

/// Runs scripts by piping them into an interpreter (default `node -`).
///
/// The script's origin, initial variables (JSON) and line offset reach the
/// interpreter through environment variables. No timeout is applied.
#[derive(Debug, Clone)]
pub struct ProcessScriptExecutor {
    command: Vec<String>,
    output_limit_bytes: usize,
}

impl ProcessScriptExecutor {
    pub fn new(config: &ScriptConfig) -> Self {
        Self {
            command: config.command.clone(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    #[instrument(skip_all, fields(file = %request.file_name))]
    pub async fn run(&self, request: &ScriptRequest) -> Result<ScriptOutput> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("script command is empty"))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env(FILE_ENV, request.file_name.as_str())
            .env(
                VARIABLES_ENV,
                serde_json::to_string(&request.variables).context("serialize script variables")?,
            )
            .env(LINE_OFFSET_ENV, request.line_offset.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = request.file_name.to_file_path().as_deref().and_then(|p| p.parent()) {
            cmd.current_dir(dir);
        }

        debug!("spawning script interpreter");
        let mut child = cmd.spawn().with_context(|| format!("spawn {program}"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;

        // Feed stdin and drain both pipes concurrently so neither side blocks
        // on a full pipe.
        let limit = self.output_limit_bytes;
        let stdin_task = tokio::spawn(write_script(stdin, request.script.clone().into_bytes()));
        let stdout_task = tokio::spawn(read_stream_limited(stdout, limit));
        let stderr_task = tokio::spawn(read_stream_limited(stderr, limit));

        let status = child
            .wait()
            .await
            .with_context(|| format!("wait for {program}"))?;

        join_task(stdin_task).await.context("join stdin")?;
        let (stdout, stdout_truncated) = join_task(stdout_task).await.context("join stdout")?;
        let (stderr, stderr_truncated) = join_task(stderr_task).await.context("join stderr")?;

        if stdout_truncated > 0 || stderr_truncated > 0 {
            warn!(stdout_truncated, stderr_truncated, "script output truncated");
        }
        debug!(exit_code = ?status.code(), "script interpreter finished");
        Ok(ScriptOutput {
            status,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        })
    }
}

/// Write the script and close stdin. An interpreter that exits without
/// reading everything is judged by its exit status, not by the broken pipe.
async fn write_script(mut stdin: ChildStdin, script: Vec<u8>) -> Result<()> {
    match stdin.write_all(&script).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!("interpreter closed stdin early");
            Ok(())
        }
        Err(err) => Err(err).context("write script to stdin"),
    }
}

/// Keep at most `limit` bytes; the rest is counted and discarded while the
/// pipe is still drained.
async fn read_stream_limited<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await.context("read output")?;
        if n == 0 {
            break;
        }
        let keep = n.min(limit.saturating_sub(buf.len()));
        buf.extend_from_slice(&chunk[..keep]);
        truncated += n - keep;
    }

    Ok((buf, truncated))
}

async fn join_task<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    match handle.await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("pipe task panicked or was cancelled")),
    }
}

#[async_trait]
impl ScriptExecutor for ProcessScriptExecutor {
    async fn execute_script(&self, request: ScriptRequest) -> Result<()> {
        let output = self.run(&request).await?;
        if !output.stdout.is_empty() {
            debug!(stdout = %String::from_utf8_lossy(&output.stdout), "script output");
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "script failed");
            return Err(anyhow!(
                "script {} exited with status {:?}: {}",
                request.file_name,
                output.status.code(),
                output.stderr_text().trim()
            ));
        }
        Ok(())
    }
}
