use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{
    common::{check_confidence, require_input, resolve_model, GeometryFormat},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Text description of the object to find, e.g. "red car".
    pub description: String,
    /// Minimum confidence (0.0 to 1.0); defaults to `find.confidence_threshold`.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Text-promptable model in the models directory; defaults to `find.default_model`.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Return every match instead of only the best one.
    #[serde(default)]
    pub return_all_matches: bool,
    #[serde(default)]
    pub return_geometry: bool,
    #[serde(default)]
    pub geometry_format: GeometryFormat,
}

pub struct FindTool;

impl BackendTool for FindTool {
    const NAME: &'static str = "find";
    const DESCRIPTION: &'static str =
        "Find objects matching a text description and return their bounding boxes (optionally masks or polygons)";
    type Request = FindRequest;

    fn prepare(
        request: FindRequest,
        settings: &ToolSettings,
        models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        let description = request.description.trim();
        if description.is_empty() {
            return Err(ToolError::InvalidArgument {
                field: "description",
                message: "must not be blank".to_string(),
            });
        }
        let confidence = check_confidence(
            request
                .confidence
                .unwrap_or(settings.find.confidence_threshold),
        )?;
        let model_name = request
            .model_name
            .clone()
            .unwrap_or_else(|| settings.find.default_model.clone());
        let model_path = resolve_model(models_dir, &model_name)?;
        Ok(PreparedJob::new(json!({
            "input_path": request.input_path,
            "description": description,
            "confidence": confidence,
            "model_name": model_name,
            "model_path": model_path,
            "return_all_matches": request.return_all_matches,
            "return_geometry": request.return_geometry,
            "geometry_format": request.geometry_format,
        })))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<FindTool>(builder)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::tools::test_support::touch;

    #[test]
    fn blank_description_is_rejected() {
        let temp = tempdir().unwrap();
        let request: FindRequest = serde_json::from_value(json!({
            "input_path": touch(temp.path(), "room.png"),
            "description": "   "
        }))
        .unwrap();
        let err = FindTool::prepare(request, &ToolSettings::default(), temp.path()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { field: "description", .. }));
    }

    #[test]
    fn explicit_model_and_geometry_are_forwarded() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("custom")).unwrap();
        fs::write(temp.path().join("custom/open-vocab.pt"), b"weights").unwrap();
        let request: FindRequest = serde_json::from_value(json!({
            "input_path": touch(temp.path(), "room.png"),
            "description": "lamp",
            "model_name": "custom/open-vocab.pt",
            "return_all_matches": true,
            "return_geometry": true,
            "geometry_format": "polygon"
        }))
        .unwrap();

        let job = FindTool::prepare(request, &ToolSettings::default(), temp.path()).unwrap();

        assert_eq!(job.payload["model_path"], json!(temp.path().join("custom/open-vocab.pt")));
        assert_eq!(job.payload["return_all_matches"], true);
        assert_eq!(job.payload["geometry_format"], "polygon");
        assert_eq!(job.payload["confidence"], 0.75);
    }
}
