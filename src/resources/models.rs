//! `models://list`: model files available to `detect` and `find`.
use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use serde::Serialize;
use tracing::warn;

use crate::{
    lib::{
        errors::{CapabilityError, ToolError},
        fs::scan_model_files,
        BoxFuture,
    },
    server::{
        config::MODEL_DESCRIPTIONS_FILE,
        registry::{CapabilityContext, RegistryError, ResourceHandler},
        runtime::ServerBuilder,
    },
};

pub const MODELS_RESOURCE_URI: &str = "models://list";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    pub path: String,
    pub size_mb: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelListing {
    pub models_dir: String,
    pub models: Vec<ModelEntry>,
}

pub struct ModelsResource;

impl ResourceHandler for ModelsResource {
    fn definition(&self) -> Resource {
        let mut raw = RawResource::new(MODELS_RESOURCE_URI, "models");
        raw.description = Some(
            "Model files in the models directory with their sizes and descriptions".to_string(),
        );
        raw.mime_type = Some("application/json".to_string());
        raw.no_annotation()
    }

    fn read<'a>(
        &'a self,
        ctx: &'a CapabilityContext,
    ) -> BoxFuture<'a, Result<ReadResourceResult, CapabilityError>> {
        Box::pin(async move {
            let listing = list_models(&ctx.models_dir)?;
            let text = serde_json::to_string_pretty(&listing).map_err(|err| {
                CapabilityError::Internal {
                    message: format!("failed to encode model listing: {err}"),
                }
            })?;
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(text, MODELS_RESOURCE_URI)],
            })
        })
    }
}

pub fn list_models(models_dir: &Path) -> Result<ModelListing, ToolError> {
    let files = scan_model_files(models_dir).map_err(|source| ToolError::Io {
        path: models_dir.to_path_buf(),
        source,
    })?;
    let descriptions = load_descriptions(models_dir);
    let models = files
        .into_iter()
        .map(|file| {
            let description = descriptions
                .get(&file.name)
                .cloned()
                .unwrap_or_else(|| format!("Model file {}", file.name));
            ModelEntry {
                size_mb: (file.size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
                path: file.path.to_string_lossy().into_owned(),
                name: file.name,
                description,
            }
        })
        .collect();
    Ok(ModelListing {
        models_dir: models_dir.to_string_lossy().into_owned(),
        models,
    })
}

/// Missing or malformed description files yield no descriptions.
fn load_descriptions(models_dir: &Path) -> BTreeMap<String, String> {
    let path = models_dir.join(MODEL_DESCRIPTIONS_FILE);
    let Ok(raw) = fs::read_to_string(&path) else {
        return BTreeMap::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(
            target: "imagesorcery::resources",
            path = %path.display(),
            error = %err,
            "Ignoring malformed model descriptions"
        );
        BTreeMap::new()
    })
}

pub fn register_resource(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    builder.register_resource(Arc::new(ModelsResource))
}
