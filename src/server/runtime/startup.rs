use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Error};
use rmcp::{
    transport::{
        sse_server::{SseServer, SseServerConfig},
        streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
        },
    },
    ServiceExt,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    cli::{LaunchProfile, TransportMode},
    lib::telemetry::{emit_runtime_mode, RuntimeModeTelemetry},
    server::{config::ServerConfig, runtime::compose_server},
};

use super::handler::ImageSorceryServer;

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Bundles a runtime error message with the process exit code.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
}

impl RuntimeExit {
    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: ExitCode::FAILURE,
        }
    }

    pub fn report(self) -> ExitCode {
        eprintln!("{}", self.message);
        self.exit_code
    }
}

/// Compose the server and serve it over the transport selected by the launch profile.
pub async fn run_server(profile: LaunchProfile, config: ServerConfig) -> Result<(), RuntimeExit> {
    let server = compose_server(&config).map_err(RuntimeExit::from_error)?;

    let (tools, resources, prompts) = server.registry().counts();
    let middlewares = server.middleware_names();
    let bind_addr = profile.bind_address();
    let endpoint_path = profile.endpoint_path();
    let http = profile.transport.is_http();
    emit_runtime_mode(&RuntimeModeTelemetry {
        version: env!("CARGO_PKG_VERSION"),
        transport: profile.transport.as_str(),
        bind_addr: http.then_some(bind_addr.as_str()),
        path: http.then_some(endpoint_path.as_str()),
        config_path: config.source_path.to_string_lossy().as_ref(),
        tools,
        resources,
        prompts,
        middlewares: &middlewares,
        launch_args: &profile.launch_args,
    });

    match profile.transport {
        TransportMode::Stdio => run_stdio(server).await,
        TransportMode::StreamableHttp => run_http(server, &bind_addr, &endpoint_path).await,
        TransportMode::Sse => run_sse(server, &bind_addr, &endpoint_path).await,
    }
}

async fn run_stdio(server: ImageSorceryServer) -> Result<(), RuntimeExit> {
    let running = server
        .clone()
        .serve(rmcp::transport::stdio())
        .await
        .map_err(RuntimeExit::from_error)?;
    running.waiting().await.map_err(RuntimeExit::from_error)?;
    server.log_request_summary();
    Ok(())
}

async fn bind(addr: &str) -> Result<TcpListener, RuntimeExit> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener {addr}"))
        .map_err(RuntimeExit::from_error)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: "imagesorcery::runtime",
            error = %err,
            "Failed to listen for shutdown signal"
        );
    }
}

async fn run_http(server: ImageSorceryServer, addr: &str, path: &str) -> Result<(), RuntimeExit> {
    let summary = server.clone();
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: true,
            ..Default::default()
        },
    );
    // axum refuses to nest at the root.
    let router = if path == "/" {
        axum::Router::new().fallback_service(service)
    } else {
        axum::Router::new().nest_service(path, service)
    };

    let listener = bind(addr).await?;
    info!(
        target: "imagesorcery::runtime",
        bind_addr = %addr,
        path = %path,
        "Started listening for MCP HTTP clients"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("HTTP server on {addr} failed"))
        .map_err(RuntimeExit::from_error)?;
    info!(target: "imagesorcery::runtime", "HTTP server stopped");
    summary.log_request_summary();
    Ok(())
}

/// Path clients POST messages to, announced in the SSE `endpoint` event.
fn sse_post_path(path: &str) -> String {
    format!("{}/messages", path.trim_end_matches('/'))
}

async fn run_sse(server: ImageSorceryServer, addr: &str, path: &str) -> Result<(), RuntimeExit> {
    let listener = bind(addr).await?;
    let local_addr = listener
        .local_addr()
        .context("failed to read SSE listener address")
        .map_err(RuntimeExit::from_error)?;
    let post_path = sse_post_path(path);
    let (sse_server, router) = SseServer::new(SseServerConfig {
        bind: local_addr,
        sse_path: path.to_string(),
        post_path: post_path.clone(),
        ct: CancellationToken::new(),
        sse_keep_alive: Some(SSE_KEEP_ALIVE),
    });
    let summary = server.clone();
    let sessions = sse_server.with_service(move || server.clone());
    info!(
        target: "imagesorcery::runtime",
        bind_addr = %local_addr,
        sse_path = %path,
        post_path = %post_path,
        "Started listening for MCP SSE clients"
    );

    let shutdown = sessions.clone();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .with_context(|| format!("SSE server on {addr} failed"))
        .map_err(RuntimeExit::from_error);
    sessions.cancel();
    served?;
    info!(target: "imagesorcery::runtime", "SSE server stopped");
    summary.log_request_summary();
    Ok(())
}
