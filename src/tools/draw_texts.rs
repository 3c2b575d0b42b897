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

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FontFace {
    #[default]
    FontHersheySimplex,
    FontHersheyPlain,
    FontHersheyDuplex,
    FontHersheyComplex,
    FontHersheyTriplex,
    FontHersheyComplexSmall,
    FontHersheyScriptSimplex,
    FontHersheyScriptComplex,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TextItem {
    pub text: String,
    /// Left edge of the text baseline.
    pub x: i32,
    /// Baseline position.
    pub y: i32,
    /// Defaults to `text.font_scale`.
    #[serde(default)]
    pub font_scale: Option<f64>,
    #[serde(default)]
    pub color: Option<Bgr>,
    #[serde(default)]
    pub thickness: Option<u32>,
    #[serde(default)]
    pub font_face: FontFace,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DrawTextsRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub texts: Vec<TextItem>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct DrawTextsTool;

impl BackendTool for DrawTextsTool {
    const NAME: &'static str = "draw_texts";
    const DESCRIPTION: &'static str = "Draw text on an image and return the path to the result";
    type Request = DrawTextsRequest;

    fn prepare(
        request: DrawTextsRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("texts", &request.texts)?;
        let texts = request
            .texts
            .into_iter()
            .map(|item| -> Result<TextItem, ToolError> {
                if item.text.is_empty() {
                    return Err(ToolError::InvalidArgument {
                        field: "text",
                        message: "must not be empty".to_string(),
                    });
                }
                let font_scale = item.font_scale.unwrap_or(settings.text.font_scale);
                if !(font_scale.is_finite() && font_scale > 0.0) {
                    return Err(ToolError::InvalidArgument {
                        field: "font_scale",
                        message: format!("{font_scale} must be greater than 0"),
                    });
                }
                Ok(TextItem {
                    font_scale: Some(font_scale),
                    color: Some(item.color.unwrap_or(settings.drawing.color)),
                    thickness: Some(require_positive(
                        "thickness",
                        item.thickness.unwrap_or(settings.drawing.thickness),
                    )?),
                    ..item
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        let output = resolve_output(&request.input_path, request.output_path, "with_text")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "texts": texts,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<DrawTextsTool>(builder)
}
