//! Entry point for ImageSorcery MCP.
use std::process::ExitCode;

use anyhow::Error;
use clap::Parser;
use imagesorcery_mcp::{
    cli::{LaunchProfile, LaunchProfileArgs, ParsedCommand},
    lib::telemetry,
    server::{
        config::ServerConfig,
        provision,
        runtime::{self, RuntimeExit},
    },
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    telemetry::init_tracing().map_err(RuntimeExit::from_error)?;
    let args = LaunchProfileArgs::parse();
    info!(
        target: "imagesorcery::runtime",
        version = env!("CARGO_PKG_VERSION"),
        "imagesorcery-mcp starting"
    );
    let command = args.into_command().map_err(RuntimeExit::from_error)?;

    match command {
        ParsedCommand::RunServer(profile) => run_server(profile).await,
        ParsedCommand::PostInstall(profile) => post_install(profile),
    }
}

fn load_config(profile: &LaunchProfile) -> Result<ServerConfig, RuntimeExit> {
    ServerConfig::load(profile.config_path.clone(), profile.config_explicit)
        .map_err(|err| RuntimeExit::from_error(Error::new(err)))
}

async fn run_server(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    let config = load_config(&profile)?;
    runtime::run_server(profile, config).await
}

fn post_install(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    // The starter config is what provisioning writes, so it may not exist yet.
    let config = ServerConfig::load(profile.config_path.clone(), false)
        .map_err(|err| RuntimeExit::from_error(Error::new(err)))?;
    match provision::run_post_install(&config) {
        Ok(report) => {
            let rendered = serde_json::to_string_pretty(&report)
                .map_err(|err| RuntimeExit::from_error(Error::new(err)))?;
            println!("{rendered}");
            info!(target: "imagesorcery::provision", "Post-install completed");
            Ok(())
        }
        Err(err) => {
            error!(
                target: "imagesorcery::provision",
                reason = %err,
                "Post-install failed"
            );
            Err(RuntimeExit::from_error(Error::new(err)))
        }
    }
}
