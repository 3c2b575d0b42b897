//! LaunchProfile and config path resolution.
use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;

const DEFAULT_CONFIG: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "IMAGESORCERY_CONFIG";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PATH: &str = "/mcp";

/// MCP transport mode.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    StreamableHttp,
    Sse,
}

impl TransportMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Stdio => "stdio",
            TransportMode::StreamableHttp => "streamable-http",
            TransportMode::Sse => "sse",
        }
    }

    pub const fn is_http(&self) -> bool {
        !matches!(self, TransportMode::Stdio)
    }
}

/// Resolved launch profile.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    pub config_path: PathBuf,
    /// The path came from `--config` or the environment, so it must exist.
    pub config_explicit: bool,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub launch_args: Vec<String>,
}

impl LaunchProfile {
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn endpoint_path(&self) -> String {
        normalize_endpoint_path(&self.path)
    }
}

/// Resolve config path in the order: CLI override → env var → default.
///
/// Returns the absolute path and whether it was given explicitly.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<(PathBuf, bool)> {
    let explicit = override_path
        .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .filter(|path| !path.as_os_str().is_empty());
    let is_explicit = explicit.is_some();
    let path = explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    if path.is_absolute() {
        return Ok((path, is_explicit));
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok((cwd.join(path), is_explicit))
}

pub fn normalize_endpoint_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path
    }
}

/// Build launch arguments suitable for reproduction/logging.
pub fn build_launch_args(
    transport: TransportMode,
    host: &str,
    port: u16,
    path: &str,
    config: &Path,
) -> Vec<String> {
    let mut args = vec![format!("--transport={}", transport.as_str())];
    if transport.is_http() {
        args.push(format!("--host={host}"));
        args.push(format!("--port={port}"));
        args.push(format!("--path={path}"));
    }
    args.push(format!("--config={}", config.display()));
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_path_gets_leading_slash() {
        assert_eq!(normalize_endpoint_path("mcp"), "/mcp");
        assert_eq!(normalize_endpoint_path("/mcp/"), "/mcp");
        assert_eq!(normalize_endpoint_path(""), "/");
        assert_eq!(normalize_endpoint_path("/"), "/");
    }

    #[test]
    fn stdio_launch_args_omit_http_flags() {
        let args = build_launch_args(
            TransportMode::Stdio,
            DEFAULT_HOST,
            DEFAULT_PORT,
            DEFAULT_PATH,
            Path::new("/etc/imagesorcery/config.toml"),
        );
        assert_eq!(
            args,
            vec![
                "--transport=stdio".to_string(),
                "--config=/etc/imagesorcery/config.toml".to_string()
            ]
        );
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let profile = LaunchProfile {
            config_path: PathBuf::from("/tmp/config.toml"),
            config_explicit: false,
            transport: TransportMode::Sse,
            host: "::1".into(),
            port: 8000,
            path: "/mcp".into(),
            launch_args: vec![],
        };
        assert_eq!(profile.bind_address(), "[::1]:8000");
    }
}
