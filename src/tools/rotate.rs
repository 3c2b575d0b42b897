use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{
    common::{require_input, resolve_output},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RotateRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Degrees, counter-clockwise. The canvas grows to fit the rotated image.
    pub angle: f64,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct RotateTool;

impl BackendTool for RotateTool {
    const NAME: &'static str = "rotate";
    const DESCRIPTION: &'static str =
        "Rotate an image by the given angle in degrees (counter-clockwise) and return the path to the rotated image";
    type Request = RotateRequest;

    fn prepare(
        request: RotateRequest,
        _settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        if !request.angle.is_finite() {
            return Err(ToolError::InvalidArgument {
                field: "angle",
                message: "must be a finite number".to_string(),
            });
        }
        let output = resolve_output(&request.input_path, request.output_path, "rotated")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "angle": request.angle,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<RotateTool>(builder)
}
