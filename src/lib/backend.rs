//! External image backend: the process that performs pixel work for tool jobs.

use std::{
    io,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use serde_json::Value;
use tokio::{io::AsyncWriteExt, process::Command, time};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    lib::{errors::BackendError, telemetry::BackendJobSpan, BoxFuture},
    server::config::BackendConfig,
};

const LOG_EXCERPT_LIMIT: usize = 5_000;

/// A unit of work handed to the backend.
#[derive(Debug, Clone)]
pub struct BackendJob {
    pub job_id: Uuid,
    pub tool: &'static str,
    pub payload: Value,
}

impl BackendJob {
    pub fn new(tool: &'static str, payload: Value) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            tool,
            payload,
        }
    }
}

/// Executes image jobs and returns their JSON result.
pub trait ImageBackend: Send + Sync {
    fn execute(&self, job: BackendJob) -> BoxFuture<'_, Result<Value, BackendError>>;
}

/// Backend that spawns a configured program once per job.
///
/// The program receives `<args..> <tool>` on its command line and the job payload as JSON
/// on stdin, and must print a single JSON document on stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: Option<PathBuf>,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(program: Option<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn run(&self, job: BackendJob) -> Result<Value, BackendError> {
        let program = self.program.as_ref().ok_or(BackendError::Unavailable)?;
        let span = BackendJobSpan::start(job.job_id, job.tool);

        let mut command = build_backend_command(program, &self.args, &job);
        info!(
            target: "imagesorcery::backend",
            job_id = %job.job_id,
            tool = job.tool,
            program = %program.display(),
            "Dispatching job to image backend"
        );
        let mut child = command.spawn().map_err(|source| BackendError::Spawn {
            program: program.clone(),
            source,
        })?;

        let input = job.payload.to_string().into_bytes();
        let stdin = child.stdin.take();
        let exchange = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&input).await {
                    Ok(()) => {}
                    // The backend may not read its stdin at all.
                    Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                    Err(err) => return Err(err),
                }
            }
            child.wait_with_output().await
        };

        let output = match time::timeout(self.timeout, exchange).await {
            Ok(result) => result.map_err(|source| BackendError::Io { source })?,
            Err(_) => {
                span.finish("timeout", None);
                return Err(BackendError::Timeout {
                    duration_secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            span.finish("failed", output.status.code());
            return Err(BackendError::Failed {
                exit_code: output.status.code(),
                message: collect_log_excerpt(&output.stdout, &output.stderr, LOG_EXCERPT_LIMIT),
            });
        }
        if !output.stderr.is_empty() {
            debug!(
                target: "imagesorcery::backend",
                job_id = %job.job_id,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Image backend wrote to stderr"
            );
        }

        let result: Result<Value, _> = serde_json::from_slice(&output.stdout);
        span.finish(
            if result.is_ok() { "succeeded" } else { "invalid_output" },
            output.status.code(),
        );
        result.map_err(|source| BackendError::InvalidOutput { source })
    }
}

impl ImageBackend for CommandBackend {
    fn execute(&self, job: BackendJob) -> BoxFuture<'_, Result<Value, BackendError>> {
        Box::pin(self.run(job))
    }
}

/// Build the backend command for a job.
pub fn build_backend_command(program: &Path, args: &[String], job: &BackendJob) -> Command {
    let mut command = Command::new(program);
    command.kill_on_drop(true);
    command.args(args);
    command.arg(job.tool);
    command.env("IMAGESORCERY_JOB_ID", job.job_id.to_string());
    command.env("IMAGESORCERY_TOOL", job.tool);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

/// Merge stdout/stderr and take at most `limit` characters from the end.
pub fn collect_log_excerpt(stdout: &[u8], stderr: &[u8], limit: usize) -> String {
    let mut combined = Vec::with_capacity(stdout.len() + stderr.len());
    combined.extend_from_slice(stdout);
    combined.extend_from_slice(stderr);
    let text = String::from_utf8_lossy(&combined);
    if text.chars().count() <= limit {
        return text.trim_end().to_string();
    }
    text.chars()
        .rev()
        .take(limit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect()
}
