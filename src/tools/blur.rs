use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    common::{require_input, require_non_empty, resolve_output, Shape},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BlurArea {
    #[serde(flatten)]
    pub shape: Shape,
    /// Kernel size; even values are rounded up. Defaults to `blur.strength`.
    #[serde(default)]
    pub blur_strength: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BlurRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Rectangles or polygons to blur.
    pub areas: Vec<BlurArea>,
    /// Blur everything except the given areas.
    #[serde(default)]
    pub invert_areas: bool,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ResolvedArea<'a> {
    #[serde(flatten)]
    shape: &'a Shape,
    blur_strength: u32,
}

pub struct BlurTool;

impl BackendTool for BlurTool {
    const NAME: &'static str = "blur";
    const DESCRIPTION: &'static str =
        "Blur rectangular or polygonal areas of an image (or everything outside them with invert_areas) and return the path to the result";
    type Request = BlurRequest;

    fn prepare(
        request: BlurRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        require_non_empty("areas", &request.areas)?;
        let areas = request
            .areas
            .iter()
            .map(|area| {
                area.shape.validate("areas")?;
                let strength = area.blur_strength.unwrap_or(settings.blur.strength);
                if strength == 0 {
                    return Err(ToolError::InvalidArgument {
                        field: "blur_strength",
                        message: "must be at least 1".to_string(),
                    });
                }
                Ok(ResolvedArea {
                    shape: &area.shape,
                    blur_strength: odd_kernel(strength),
                })
            })
            .collect::<Result<Vec<_>, ToolError>>()?;

        let output = resolve_output(&request.input_path, request.output_path.clone(), "blurred")?;
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

/// Gaussian kernels need an odd size.
pub fn odd_kernel(strength: u32) -> u32 {
    if strength % 2 == 0 {
        strength + 1
    } else {
        strength
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<BlurTool>(builder)
}
