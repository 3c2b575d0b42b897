use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::lib::paths::resolve_relative_to;

pub const DEFAULT_MODELS_DIR: &str = "models";
/// Optional JSON object mapping model file names to human-readable descriptions.
pub const MODEL_DESCRIPTIONS_FILE: &str = "model_descriptions.json";

/// Model storage settings.
#[derive(Debug, Clone)]
pub struct ModelsConfig {
    /// Absolute models directory.
    pub dir: PathBuf,
}

impl ModelsConfig {
    pub fn descriptions_path(&self) -> PathBuf {
        self.dir.join(MODEL_DESCRIPTIONS_FILE)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawModelsSection {
    pub dir: Option<PathBuf>,
}

/// Relative directories resolve against the directory holding the config file.
pub fn parse_models_section(raw: Option<RawModelsSection>, config_path: &Path) -> ModelsConfig {
    let dir = raw
        .unwrap_or_default()
        .dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR));
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    ModelsConfig {
        dir: resolve_relative_to(base, &dir),
    }
}
