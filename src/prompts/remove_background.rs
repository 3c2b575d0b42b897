//! `remove-background`: walks the client through `find` then `fill` with inverted areas.
use std::sync::Arc;

use rmcp::model::{GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole};
use serde_json::{json, Value};

use crate::{
    lib::errors::CapabilityError,
    server::{
        registry::{PromptHandler, RegistryError},
        runtime::ServerBuilder,
    },
};

pub const PROMPT_NAME: &str = "remove-background";
const DEFAULT_TARGET: &str = "the main foreground object";

pub struct RemoveBackgroundPrompt;

fn argument(name: &str, description: &str, required: bool) -> Result<PromptArgument, CapabilityError> {
    serde_json::from_value(json!({
        "name": name,
        "description": description,
        "required": required,
    }))
    .map_err(|err| CapabilityError::Internal {
        message: format!("invalid prompt argument `{name}`: {err}"),
    })
}

fn prompt_arguments() -> Vec<PromptArgument> {
    [
        ("image_path", "Full path to the image", true),
        (
            "target_objects",
            "Objects to keep, e.g. \"person\" or \"red car\"",
            false,
        ),
        (
            "output_path",
            "Full path for the result (PNG keeps transparency)",
            false,
        ),
    ]
    .into_iter()
    .filter_map(|(name, description, required)| argument(name, description, required).ok())
    .collect()
}

fn string_argument<'a>(arguments: &'a JsonObject, name: &str) -> Option<&'a str> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Render the guidance text for the given arguments.
pub fn render_text(image_path: &str, target_objects: Option<&str>, output_path: Option<&str>) -> String {
    let target = target_objects.unwrap_or(DEFAULT_TARGET);
    let output = output_path
        .map(|path| format!("Save the result to `{path}`."))
        .unwrap_or_else(|| {
            "Let `fill` choose the output path; it switches to PNG for transparency.".to_string()
        });
    format!(
        "Remove the background from the image at `{image_path}`, keeping {target}.\n\n\
         1. Call `find` with input_path=`{image_path}`, description=\"{target}\", \
         return_geometry=true and geometry_format=\"polygon\". Use return_all_matches=true \
         if several objects should be kept.\n\
         2. Call `fill` on the same image with one area per returned polygon, \
         color=null (transparent) and invert_areas=true so that everything except the \
         found objects becomes transparent.\n\
         3. {output}\n\n\
         If `find` returns nothing, lower `confidence` or rephrase the description before \
         trying again."
    )
}

impl PromptHandler for RemoveBackgroundPrompt {
    fn definition(&self) -> Prompt {
        Prompt::new(
            PROMPT_NAME,
            Some("Remove the background of an image using find and fill"),
            Some(prompt_arguments()),
        )
    }

    fn render(&self, arguments: &JsonObject) -> Result<GetPromptResult, CapabilityError> {
        let image_path = string_argument(arguments, "image_path").ok_or_else(|| {
            CapabilityError::InvalidArguments {
                target: PROMPT_NAME.to_string(),
                violations: vec!["`image_path` must be a non-empty string".to_string()],
            }
        })?;
        let text = render_text(
            image_path,
            string_argument(arguments, "target_objects"),
            string_argument(arguments, "output_path"),
        );
        Ok(GetPromptResult {
            description: Some(format!("Remove the background from {image_path}")),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
        })
    }
}

pub fn register_prompt(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    builder.register_prompt(Arc::new(RemoveBackgroundPrompt))
}
