use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    common::{require_input, require_non_empty, require_positive, resolve_output, Bgr, Shape},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Rectangle {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    #[serde(default)]
    pub color: Option<Bgr>,
    #[serde(default)]
    pub thickness: Option<u32>,
    #[serde(default)]
    pub filled: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DrawRectanglesRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub rectangles: Vec<Rectangle>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct DrawRectanglesTool;

impl BackendTool for DrawRectanglesTool {
    const NAME: &'static str = "draw_rectangles";
    const DESCRIPTION: &'static str =
        "Draw outlined or filled rectangles on an image and return the path to the result";
    type Request = DrawRectanglesRequest;

    fn prepare(
        request: DrawRectanglesRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("rectangles", &request.rectangles)?;
        let rectangles = request
            .rectangles
            .into_iter()
            .map(|rect| -> Result<Rectangle, ToolError> {
                Shape::Rectangle {
                    x1: rect.x1,
                    y1: rect.y1,
                    x2: rect.x2,
                    y2: rect.y2,
                }
                .validate("rectangles")?;
                Ok(Rectangle {
                    color: Some(rect.color.unwrap_or(settings.drawing.color)),
                    thickness: Some(require_positive(
                        "thickness",
                        rect.thickness.unwrap_or(settings.drawing.thickness),
                    )?),
                    ..rect
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        let output =
            resolve_output(&request.input_path, request.output_path, "with_rectangles")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "rectangles": rectangles,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<DrawRectanglesTool>(builder)
}
