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
pub struct DetectRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Minimum confidence (0.0 to 1.0); defaults to `detection.confidence_threshold`.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Model file in the models directory; defaults to `detection.default_model`.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Include segmentation geometry for every detection.
    #[serde(default)]
    pub return_geometry: bool,
    #[serde(default)]
    pub geometry_format: GeometryFormat,
}

pub struct DetectTool;

impl BackendTool for DetectTool {
    const NAME: &'static str = "detect";
    const DESCRIPTION: &'static str =
        "Detect objects in an image and return their classes, confidences and bounding boxes (optionally masks or polygons)";
    type Request = DetectRequest;

    fn prepare(
        request: DetectRequest,
        settings: &ToolSettings,
        models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        let confidence = check_confidence(
            request
                .confidence
                .unwrap_or(settings.detection.confidence_threshold),
        )?;
        let model_name = request
            .model_name
            .unwrap_or_else(|| settings.detection.default_model.clone());
        let model_path = resolve_model(models_dir, &model_name)?;
        Ok(PreparedJob::new(json!({
            "input_path": request.input_path,
            "confidence": confidence,
            "model_name": model_name,
            "model_path": model_path,
            "return_geometry": request.return_geometry,
            "geometry_format": request.geometry_format,
        })))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<DetectTool>(builder)
}
