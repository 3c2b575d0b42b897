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

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Circle {
    pub center_x: i32,
    pub center_y: i32,
    pub radius: u32,
    #[serde(default)]
    pub color: Option<Bgr>,
    /// Ignored when `filled` is true.
    #[serde(default)]
    pub thickness: Option<u32>,
    #[serde(default)]
    pub filled: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DrawCirclesRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub circles: Vec<Circle>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct DrawCirclesTool;

impl BackendTool for DrawCirclesTool {
    const NAME: &'static str = "draw_circles";
    const DESCRIPTION: &'static str =
        "Draw outlined or filled circles on an image and return the path to the result";
    type Request = DrawCirclesRequest;

    fn prepare(
        request: DrawCirclesRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("circles", &request.circles)?;
        let circles = request
            .circles
            .into_iter()
            .map(|circle| -> Result<Circle, ToolError> {
                require_positive("radius", circle.radius)?;
                Ok(Circle {
                    color: Some(circle.color.unwrap_or(settings.drawing.color)),
                    thickness: Some(require_positive(
                        "thickness",
                        circle.thickness.unwrap_or(settings.drawing.thickness),
                    )?),
                    ..circle
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        let output = resolve_output(&request.input_path, request.output_path, "with_circles")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "circles": circles,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<DrawCirclesTool>(builder)
}
