use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 300;
const MAX_BACKEND_TIMEOUT_SECS: u64 = 3_600;

/// External image backend settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Program performing pixel work; tools report `backend_unavailable` when unset.
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawBackendSection {
    pub program: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

pub fn parse_backend_section(
    raw: Option<RawBackendSection>,
    path: &Path,
) -> Result<BackendConfig, ConfigError> {
    let backend_raw = raw.unwrap_or_default();
    let program = backend_raw
        .program
        .filter(|program| !program.as_os_str().is_empty());
    let timeout_secs = backend_raw
        .timeout_secs
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS);
    if !(1..=MAX_BACKEND_TIMEOUT_SECS).contains(&timeout_secs) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "backend.timeout_secs",
            message: format!("Use a value in the range 1-{MAX_BACKEND_TIMEOUT_SECS}"),
        });
    }

    Ok(BackendConfig {
        program,
        args: backend_raw.args.unwrap_or_default(),
        timeout_secs,
    })
}
