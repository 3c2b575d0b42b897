use std::path::Path;

use tracing::{debug, info};

use super::ServerConfig;

pub fn log_load_start(path: &Path, present: bool, required: bool) {
    if present || required {
        info!(
            target: "imagesorcery::config",
            path = %path.display(),
            "Starting configuration load"
        );
    } else {
        debug!(
            target: "imagesorcery::config",
            path = %path.display(),
            "Configuration file not found; using built-in defaults and environment overrides"
        );
    }
}

pub fn log_loaded(config: &ServerConfig, from_file: bool) {
    info!(
        target: "imagesorcery::config",
        path = %config.source_path.display(),
        from_file = from_file,
        server_name = %config.server.name,
        backend_configured = config.backend.program.is_some(),
        backend_timeout_secs = config.backend.timeout_secs,
        models_dir = %config.models.dir.display(),
        telemetry_enabled = config.middleware.telemetry_enabled,
        "Configuration loaded successfully"
    );
}
