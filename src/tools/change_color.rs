use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{
    common::{require_input, resolve_output},
    register_backend_tool, BackendTool, PreparedJob,
};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Grayscale,
    Sepia,
}

impl Palette {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Palette::Grayscale => "grayscale",
            Palette::Sepia => "sepia",
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChangeColorRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    pub palette: Palette,
    /// Defaults to `<input>_<palette>.<ext>`.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

pub struct ChangeColorTool;

impl BackendTool for ChangeColorTool {
    const NAME: &'static str = "change_color";
    const DESCRIPTION: &'static str =
        "Change the color palette of an image (grayscale or sepia) and return the path to the result";
    type Request = ChangeColorRequest;

    fn prepare(
        request: ChangeColorRequest,
        _settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        let output = resolve_output(
            &request.input_path,
            request.output_path,
            request.palette.as_str(),
        )?;
        Ok(PreparedJob::with_output(
            json!({
                "input_path": request.input_path,
                "palette": request.palette,
                "output_path": output,
            }),
            output,
        ))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<ChangeColorTool>(builder)
}
