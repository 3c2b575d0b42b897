use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{common::require_input, register_backend_tool, BackendTool, PreparedJob};
use crate::{
    lib::errors::ToolError,
    server::{config::ToolSettings, registry::RegistryError, runtime::ServerBuilder},
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct OcrRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
    /// Language code such as `en`; defaults to `ocr.language`.
    #[serde(default)]
    pub language: Option<String>,
}

pub struct OcrTool;

impl BackendTool for OcrTool {
    const NAME: &'static str = "ocr";
    const DESCRIPTION: &'static str =
        "Recognise text in an image and return each text segment with its confidence and bounding box";
    type Request = OcrRequest;

    fn prepare(
        request: OcrRequest,
        settings: &ToolSettings,
        _models_dir: &Path,
    ) -> Result<PreparedJob, ToolError> {
        require_input("input_path", &request.input_path)?;
        let language = match request.language {
            Some(language) if language.trim().is_empty() => {
                return Err(ToolError::InvalidArgument {
                    field: "language",
                    message: "must not be blank".to_string(),
                })
            }
            Some(language) => language,
            None => settings.ocr.language.clone(),
        };
        Ok(PreparedJob::new(json!({
            "input_path": request.input_path,
            "language": language,
        })))
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_backend_tool::<OcrTool>(builder)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::tools::test_support::touch;

    #[test]
    fn language_defaults_from_settings() {
        let temp = tempdir().unwrap();
        let input = touch(temp.path(), "receipt.png");
        let mut settings = ToolSettings::default();
        settings.ocr.language = "de".into();

        let job = OcrTool::prepare(
            OcrRequest {
                input_path: input,
                language: None,
            },
            &settings,
            temp.path(),
        )
        .unwrap();

        assert_eq!(job.payload["language"], "de");
        assert_eq!(job.output_path, None);
    }
}
