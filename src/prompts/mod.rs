//! MCP prompts.
use crate::server::{registry::RegistryError, runtime::ServerBuilder};

pub mod remove_background;

pub fn register_prompts(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    remove_background::register_prompt(builder)
}
