//! Load and validate server configuration.
use std::path::PathBuf;

use serde::Deserialize;
use tracing::error;

use crate::lib::errors::ConfigError;

pub mod backend;
pub mod defaults;
pub mod middleware;
pub mod models;
pub mod server;
pub mod telemetry;

pub use backend::{parse_backend_section, BackendConfig, RawBackendSection};
pub use defaults::{Interpolation, SettingsError, ToolSettings};
pub use middleware::{
    parse_middleware_sections, MiddlewareConfig, RawErrorsSection, RawTelemetrySection,
};
pub use models::{parse_models_section, ModelsConfig, RawModelsSection, MODEL_DESCRIPTIONS_FILE};
pub use server::{
    parse_server_section, RawServerSection, ServerSection, DEFAULT_INSTRUCTIONS,
    DEFAULT_SERVER_NAME,
};

/// Environment overrides use `IMAGESORCERY__<SECTION>__<KEY>`.
pub const ENV_OVERRIDE_PREFIX: &str = "IMAGESORCERY";
const ENV_OVERRIDE_SEPARATOR: &str = "__";

/// Top-level configuration container.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub backend: BackendConfig,
    pub models: ModelsConfig,
    pub middleware: MiddlewareConfig,
    pub defaults: ToolSettings,
    pub source_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawServerConfig {
    server: Option<RawServerSection>,
    backend: Option<RawBackendSection>,
    models: Option<RawModelsSection>,
    telemetry: Option<RawTelemetrySection>,
    errors: Option<RawErrorsSection>,
    defaults: Option<ToolSettings>,
}

impl ServerConfig {
    /// Load configuration from a path that must exist.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        Self::load(path, true)
    }

    /// Load configuration; when `required` is false a missing file yields built-in defaults
    /// (still layered with environment overrides).
    pub fn load(path: PathBuf, required: bool) -> Result<Self, ConfigError> {
        let present = path.is_file();
        telemetry::log_load_start(&path, present, required);

        let builder = config::Config::builder()
            .add_source(config::File::from(path.clone()).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_OVERRIDE_PREFIX)
                    .separator(ENV_OVERRIDE_SEPARATOR),
            );
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "imagesorcery::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawServerConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "imagesorcery::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            error!(
                target: "imagesorcery::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config, present);
        Ok(config)
    }

    /// Built-in defaults anchored at `source_path` (no file or environment is read).
    pub fn defaults_at(source_path: PathBuf) -> Self {
        Self {
            server: ServerSection::default(),
            backend: BackendConfig::default(),
            models: parse_models_section(None, &source_path),
            middleware: MiddlewareConfig::default(),
            defaults: ToolSettings::default(),
            source_path,
        }
    }

    fn from_raw(raw: RawServerConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let server = parse_server_section(raw.server, &path)?;
        let backend = parse_backend_section(raw.backend, &path)?;
        let models = parse_models_section(raw.models, &path);
        let middleware = parse_middleware_sections(raw.telemetry, raw.errors);
        let defaults = raw.defaults.unwrap_or_default();
        defaults
            .validate()
            .map_err(|err| ConfigError::InvalidField {
                path: path.clone(),
                field: "defaults",
                message: err.to_string(),
            })?;

        Ok(Self {
            server,
            backend,
            models,
            middleware,
            defaults,
            source_path: path,
        })
    }
}
