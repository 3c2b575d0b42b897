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
pub struct CropRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Left edge in pixels.
    pub x1: u32,
    /// Top edge in pixels.
    pub y1: u32,
    /// Right edge in pixels (exclusive).
    pub x2: u32,
    /// Bottom edge in pixels (exclusive).
    pub y2: u32,
    /// Full path for the result; defaults to `<input>_cropped.<ext>`.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct CropTool;

impl BackendTool for CropTool {
    const NAME: &'static str = "crop";
    const DESCRIPTION: &'static str =
        "Crop an image to the rectangle (x1, y1)-(x2, y2) and return the path to the cropped image";
    type Request = CropRequest;

    fn prepare(
        request: CropRequest,
        _settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        if request.x2 <= request.x1 || request.y2 <= request.y1 {
            return Err(ToolError::InvalidArgument {
                field: "x2/y2",
                message: format!(
                    "crop box ({},{})-({},{}) must have x2 > x1 and y2 > y1",
                    request.x1, request.y1, request.x2, request.y2
                ),
            });
        }
        let output = resolve_output(&request.input_path, request.output_path, "cropped")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "x1": request.x1,
                "y1": request.y1,
                "x2": request.x2,
                "y2": request.y2,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<CropTool>(builder)
}
