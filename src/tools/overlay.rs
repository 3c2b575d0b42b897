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
pub struct OverlayRequest {
    /// Full path to the background image.
    pub base_image_path: PathBuf,
    /// Full path to the image placed on top; its alpha channel is honoured.
    pub overlay_image_path: PathBuf,
    /// Left edge of the overlay on the base image (may be negative).
    pub x: i32,
    /// Top edge of the overlay on the base image (may be negative).
    pub y: i32,
    /// Defaults to `<base>_overlaid.<ext>`.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct OverlayTool;

impl BackendTool for OverlayTool {
    const NAME: &'static str = "overlay";
    const DESCRIPTION: &'static str =
        "Place one image on top of another at (x, y), respecting transparency, and return the path to the result";
    type Request = OverlayRequest;

    fn prepare(
        request: OverlayRequest,
        _settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("base_image_path", &request.base_image_path)?;
        require_input("overlay_image_path", &request.overlay_image_path)?;
        let output = resolve_output(&request.base_image_path, request.output_path, "overlaid")?;
        Ok(PreparedJob::with_output(
            json!({
                "base_image_path": request.base_image_path,
                "overlay_image_path": request.overlay_image_path,
                "x": request.x,
                "y": request.y,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<OverlayTool>(builder)
}
