use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    common::{require_input, require_non_empty, resolve_output, Bgr, Shape},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::{errors::ToolError, paths},
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

fn default_fill_color() -> Option<Bgr> {
    Some([0, 0, 0])
}

fn default_opacity() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FillArea {
    #[serde(flatten)]
    pub shape: Shape,
    /// BGR fill color; `null` makes the area transparent.
    #[serde(default = "default_fill_color")]
    pub color: Option<Bgr>,
    /// 0.0 (invisible) to 1.0 (opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FillRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub areas: Vec<FillArea>,
    /// Fill everything except the given areas.
    #[serde(default)]
    pub invert_areas: bool,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ResolvedArea<'a> {
    #[serde(flatten)]
    shape: &'a Shape,
    color: Option<Bgr>,
    opacity: f64,
}

pub struct FillTool;

impl BackendTool for FillTool {
    const NAME: &'static str = "fill";
    const DESCRIPTION: &'static str =
        "Fill rectangular or polygonal areas of an image with a color and opacity, or make them transparent (color = null), and return the path to the result";
    type Request = FillRequest;

    fn prepare(
        request: FillRequest,
        _settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("areas", &request.areas)?;
        let areas = request
            .areas
            .iter()
            .map(|area| {
                area.shape.validate("areas")?;
                if !(0.0..=1.0).contains(&area.opacity) {
                    return Err(ToolError::InvalidArgument {
                        field: "opacity",
                        message: format!("{} is outside 0.0..=1.0", area.opacity),
                    });
                }
                Ok(ResolvedArea {
                    shape: &area.shape,
                    color: area.color,
                    opacity: area.opacity,
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;

        // Transparency needs an alpha channel, so derived outputs switch to PNG.
        let transparent = request.areas.iter().any(|area| area.color.is_none());
        let output = match (&request.output_path, transparent) {
            (None, true) => paths::derive_output_path(&request.input_path, "filled")
                .with_extension("png"),
            _ => resolve_output(&request.input_path, request.output_path.clone(), "filled")?,
        };
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "areas": areas,
                "invert_areas": request.invert_areas,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<FillTool>(builder)
}
