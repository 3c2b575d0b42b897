//! Tracing initialization, backend job spans and runtime-mode logging.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Initialize `tracing` and format developer logs.
///
/// Logs always go to stderr; stdout belongs to the stdio transport.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper to record start and finish of an image backend job.
pub struct BackendJobSpan {
    span: Span,
    started_at: Instant,
    job_id: Uuid,
}

impl BackendJobSpan {
    /// Start a job span.
    pub fn start(job_id: Uuid, tool: &str) -> Self {
        let span = info_span!(
            target: "imagesorcery::backend",
            "backend_job",
            %job_id,
            tool
        );
        Self {
            span,
            started_at: Instant::now(),
            job_id,
        }
    }

    /// Close the span while recording status and completion info.
    pub fn finish(self, status: &'static str, exit_code: Option<i32>) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "imagesorcery::backend",
            job_id = %self.job_id,
            status = status,
            exit_code = exit_code,
            elapsed_ms = elapsed_ms,
            "Completed image backend job"
        );
    }
}

/// Payload for logging MCP runtime state as structured telemetry.
#[derive(Debug, Serialize)]
pub struct RuntimeModeTelemetry<'a> {
    pub version: &'a str,
    pub transport: &'a str,
    pub bind_addr: Option<&'a str>,
    pub path: Option<&'a str>,
    pub config_path: &'a str,
    pub tools: usize,
    pub resources: usize,
    pub prompts: usize,
    pub middlewares: &'a [&'static str],
    pub launch_args: &'a [String],
}

/// Emit runtime mode to `tracing`.
pub fn emit_runtime_mode(telemetry: &RuntimeModeTelemetry<'_>) {
    info!(
        target: "imagesorcery::runtime",
        version = telemetry.version,
        transport = telemetry.transport,
        bind_addr = telemetry.bind_addr.unwrap_or(""),
        path = telemetry.path.unwrap_or(""),
        config_path = telemetry.config_path,
        tools = telemetry.tools,
        resources = telemetry.resources,
        prompts = telemetry.prompts,
        middlewares = ?telemetry.middlewares,
        launch_args = ?telemetry.launch_args,
        "Starting MCP server"
    );
}
