use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    common::{require_input, require_non_empty, require_positive, resolve_output, Bgr},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

fn default_tip_length() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Arrow {
    /// Tail.
    pub x1: i32,
    pub y1: i32,
    /// Head.
    pub x2: i32,
    pub y2: i32,
    #[serde(default)]
    pub color: Option<Bgr>,
    #[serde(default)]
    pub thickness: Option<u32>,
    /// Head length relative to the arrow length.
    #[serde(default = "default_tip_length")]
    pub tip_length: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DrawArrowsRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub arrows: Vec<Arrow>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct DrawArrowsTool;

impl BackendTool for DrawArrowsTool {
    const NAME: &'static str = "draw_arrows";
    const DESCRIPTION: &'static str = "Draw arrows on an image and return the path to the result";
    type Request = DrawArrowsRequest;

    fn prepare(
        request: DrawArrowsRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("arrows", &request.arrows)?;
        let arrows = request
            .arrows
            .into_iter()
            .map(|arrow| -> Result<Arrow, ToolError> {
                if !(arrow.tip_length > 0.0 && arrow.tip_length <= 1.0) {
                    return Err(ToolError::InvalidArgument {
                        field: "tip_length",
                        message: format!("{} is outside (0.0, 1.0]", arrow.tip_length),
                    });
                }
                Ok(Arrow {
                    color: Some(arrow.color.unwrap_or(settings.drawing.color)),
                    thickness: Some(require_positive(
                        "thickness",
                        arrow.thickness.unwrap_or(settings.drawing.thickness),
                    )?),
                    ..arrow
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        let output = resolve_output(&request.input_path, request.output_path, "with_arrows")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "arrows": arrows,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<DrawArrowsTool>(builder)
}
