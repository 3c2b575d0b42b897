//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use super::{
    build_launch_args, normalize_endpoint_path, resolve_config_path, LaunchProfile,
    TransportMode, DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT,
};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    RunServer(LaunchProfile),
    PostInstall(LaunchProfile),
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "imagesorcery-mcp",
    author,
    version,
    about = "ImageSorcery MCP: image processing tools for AI assistants",
    long_about = None
)]
pub struct LaunchProfileArgs {
    /// Prepare the models directory and starter files, then exit.
    #[arg(long, default_value_t = false)]
    pub post_install: bool,
    /// Serve over stdio (default), streamable HTTP, or SSE.
    #[arg(long, value_enum, default_value_t = TransportMode::Stdio)]
    pub transport: TransportMode,
    /// Bind address for HTTP-based transports.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Bind port for HTTP-based transports.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Endpoint path for HTTP-based transports.
    #[arg(long, default_value = DEFAULT_PATH)]
    pub path: String,
    /// Path to config.toml (overrides IMAGESORCERY_CONFIG).
    #[arg(long = "config")]
    pub config_override: Option<PathBuf>,
}

impl LaunchProfileArgs {
    /// Build a `LaunchProfile` from CLI args and environment variables.
    pub fn build(self) -> Result<LaunchProfile> {
        let (config_path, config_explicit) = resolve_config_path(self.config_override)?;
        let path = normalize_endpoint_path(&self.path);
        let launch_args =
            build_launch_args(self.transport, &self.host, self.port, &path, &config_path);

        Ok(LaunchProfile {
            config_path,
            config_explicit,
            transport: self.transport,
            host: self.host,
            port: self.port,
            path,
            launch_args,
        })
    }

    /// Parse CLI args into either provisioning or server launch mode.
    pub fn into_command(self) -> Result<ParsedCommand> {
        let post_install = self.post_install;
        let profile = self.build()?;
        if post_install {
            Ok(ParsedCommand::PostInstall(profile))
        } else {
            Ok(ParsedCommand::RunServer(profile))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedCommand {
        let argv = std::iter::once("imagesorcery-mcp").chain(args.iter().copied());
        LaunchProfileArgs::try_parse_from(argv)
            .expect("arguments parse")
            .into_command()
            .expect("profile builds")
    }

    #[test]
    fn defaults_to_stdio() {
        let ParsedCommand::RunServer(profile) = parse(&[]) else {
            panic!("expected server launch");
        };
        assert_eq!(profile.transport, TransportMode::Stdio);
        assert_eq!(profile.bind_address(), "127.0.0.1:8000");
        assert_eq!(profile.endpoint_path(), "/mcp");
    }

    #[test]
    fn streamable_http_on_custom_port() {
        let ParsedCommand::RunServer(profile) =
            parse(&["--transport", "streamable-http", "--port", "9090"])
        else {
            panic!("expected server launch");
        };
        assert_eq!(profile.transport, TransportMode::StreamableHttp);
        assert_eq!(profile.port, 9090);
        assert_eq!(profile.bind_address(), "127.0.0.1:9090");
        assert!(profile.launch_args.contains(&"--port=9090".to_string()));
    }

    #[test]
    fn post_install_is_its_own_command() {
        let command = parse(&["--post-install", "--config", "/tmp/sorcery/config.toml"]);
        let ParsedCommand::PostInstall(profile) = command else {
            panic!("expected post-install");
        };
        assert!(profile.config_explicit);
        assert_eq!(profile.config_path, PathBuf::from("/tmp/sorcery/config.toml"));
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let result =
            LaunchProfileArgs::try_parse_from(["imagesorcery-mcp", "--transport", "websocket"]);
        assert!(result.is_err());
    }
}
