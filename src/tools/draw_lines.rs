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
pub struct Line {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// BGR color; defaults to `drawing.color`.
    #[serde(default)]
    pub color: Option<Bgr>,
    /// Defaults to `drawing.thickness`.
    #[serde(default)]
    pub thickness: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DrawLinesRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub lines: Vec<Line>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct DrawLinesTool;

impl BackendTool for DrawLinesTool {
    const NAME: &'static str = "draw_lines";
    const DESCRIPTION: &'static str =
        "Draw straight lines on an image and return the path to the result";
    type Request = DrawLinesRequest;

    fn prepare(
        request: DrawLinesRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("lines", &request.lines)?;
        let lines = request
            .lines
            .into_iter()
            .map(|line| -> Result<Line, ToolError> {
                Ok(Line {
                    color: Some(line.color.unwrap_or(settings.drawing.color)),
                    thickness: Some(require_positive(
                        "thickness",
                        line.thickness.unwrap_or(settings.drawing.thickness),
                    )?),
                    ..line
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        let output = resolve_output(&request.input_path, request.output_path, "with_lines")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "lines": lines,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<DrawLinesTool>(builder)
}
