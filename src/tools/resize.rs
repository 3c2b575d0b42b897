use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{
    common::{require_input, require_positive, resolve_output},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{
        config::{Interpolation, ToolSettings},
        registry::RegistryError,
        runtime::ServerBuilder,
    },
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResizeRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Target width; when only one of width/height is given the aspect ratio is kept.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Uniform scale; takes precedence over width and height.
    #[serde(default)]
    pub scale_factor: Option<f64>,
    /// Defaults to `resize.interpolation`.
    #[serde(default)]
    pub interpolation: Option<Interpolation>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct ResizeTool;

impl BackendTool for ResizeTool {
    const NAME: &'static str = "resize";
    const DESCRIPTION: &'static str =
        "Resize an image by width/height (keeping aspect ratio when one is omitted) or by scale_factor, and return the path to the result";
    type Request = ResizeRequest;

    fn prepare(
        request: ResizeRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        let mut width = request.width.map(|w| require_positive("width", w)).transpose()?;
        let mut height = request
            .height
            .map(|h| require_positive("height", h))
            .transpose()?;
        match request.scale_factor {
            Some(scale) if !(scale.is_finite() && scale > 0.0) => {
                return Err(ToolError::InvalidArgument {
                    field: "scale_factor",
                    message: format!("{scale} must be greater than 0"),
                });
            }
            Some(_) => {
                width = None;
                height = None;
            }
            None if width.is_none() && height.is_none() => {
                return Err(ToolError::InvalidArgument {
                    field: "width/height",
                    message: "give scale_factor or at least one of width and height".to_string(),
                });
            }
            None => {}
        }

        let interpolation = request
            .interpolation
            .unwrap_or(settings.resize.interpolation);
        let output = resolve_output(&request.input_path, request.output_path, "resized")?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "width": width,
                "height": height,
                "scale_factor": request.scale_factor,
                "interpolation": interpolation,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<ResizeTool>(builder)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use super::*;
    use crate::tools::test_support::touch;

    fn request(input: PathBuf) -> ResizeRequest {
        ResizeRequest {
            input_path: input,
            width: None,
            height: None,
            scale_factor: None,
            interpolation: None,
            output_path: None,
        }
    }

    #[test]
    fn needs_a_target_size() {
        let temp = tempdir().unwrap();
        let input = touch(temp.path(), "big.png");
        let err = ResizeTool::prepare(request(input), &ToolSettings::default(), temp.path())
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument { .. }));
    }

    #[test]
    fn scale_factor_wins_and_interpolation_defaults() {
        let temp = tempdir().unwrap();
        let input = touch(temp.path(), "big.png");
        let mut req = request(input);
        req.width = Some(100);
        req.scale_factor = Some(0.5);

        let job = ResizeTool::prepare(req, &ToolSettings::default(), temp.path()).unwrap();

        assert_eq!(job.payload["width"], Value::Null);
        assert_eq!(job.payload["scale_factor"], 0.5);
        assert_eq!(job.payload["interpolation"], json!("linear"));
        assert_eq!(job.output_path, Some(temp.path().join("big_resized.png")));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let temp = tempdir().unwrap();
        let input = touch(temp.path(), "big.png");
        let mut req = request(input);
        req.scale_factor = Some(0.0);
        assert!(ResizeTool::prepare(req, &ToolSettings::default(), temp.path()).is_err());
    }
}
