//! `--post-install`: prepare the models directory, starter files and check the backend.
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    lib::{
        errors::ProvisionError,
        fs::{write_file_if_missing, FileWriteStatus},
    },
    server::config::{
        defaults::{DEFAULT_DETECTION_MODEL, DEFAULT_FIND_MODEL},
        ServerConfig, MODEL_DESCRIPTIONS_FILE,
    },
};

/// Starter configuration written when the resolved config file does not exist.
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../../config.default.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Written,
    SkippedExisting,
}

impl From<FileWriteStatus> for FileOutcome {
    fn from(value: FileWriteStatus) -> Self {
        match value {
            FileWriteStatus::Written => FileOutcome::Written,
            FileWriteStatus::SkippedExisting => FileOutcome::SkippedExisting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackendCheck {
    NotConfigured,
    Found { program: PathBuf },
}

/// Summary printed as JSON after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PostInstallReport {
    pub status: &'static str,
    pub config_path: PathBuf,
    pub config_file: FileOutcome,
    pub models_dir: PathBuf,
    pub model_descriptions: FileOutcome,
    pub backend: BackendCheck,
}

/// Provision everything the server expects to find on disk.
///
/// Existing files are never overwritten.
pub fn run_post_install(config: &ServerConfig) -> Result<PostInstallReport, ProvisionError> {
    let models_dir = config.models.dir.clone();
    info!(
        target: "imagesorcery::provision",
        models_dir = %models_dir.display(),
        "Creating models directory"
    );
    fs::create_dir_all(&models_dir).map_err(|source| ProvisionError::ModelsDir {
        path: models_dir.clone(),
        source,
    })?;

    let descriptions_path = models_dir.join(MODEL_DESCRIPTIONS_FILE);
    let model_descriptions = write_starter(&descriptions_path, &default_model_descriptions())?;

    let config_path = config.source_path.clone();
    let config_file = write_starter(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

    let backend = match &config.backend.program {
        None => {
            warn!(
                target: "imagesorcery::provision",
                "No image backend configured; image tools will report backend_unavailable"
            );
            BackendCheck::NotConfigured
        }
        Some(program) => {
            let resolved = resolve_program(program).ok_or_else(|| {
                ProvisionError::BackendMissing {
                    program: program.clone(),
                }
            })?;
            info!(
                target: "imagesorcery::provision",
                program = %resolved.display(),
                "Image backend found"
            );
            BackendCheck::Found { program: resolved }
        }
    };

    Ok(PostInstallReport {
        status: "ok",
        config_path,
        config_file,
        models_dir,
        model_descriptions,
        backend,
    })
}

fn write_starter(path: &Path, content: &str) -> Result<FileOutcome, ProvisionError> {
    let status =
        write_file_if_missing(path, content, false).map_err(|source| ProvisionError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        target: "imagesorcery::provision",
        path = %path.display(),
        status = ?status,
        "Provisioned file"
    );
    Ok(status.into())
}

fn default_model_descriptions() -> String {
    let descriptions = json!({
        DEFAULT_DETECTION_MODEL: "YOLOE-11 large prompt-free segmentation model (detect)",
        DEFAULT_FIND_MODEL: "YOLOE-11 large text-promptable segmentation model (find)",
    });
    format!("{descriptions:#}\n")
}

/// Locate `program` either as a path or by searching `PATH`.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    })
}
