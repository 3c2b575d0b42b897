use std::path::Path;

use serde::Deserialize;

use crate::lib::errors::ConfigError;

pub const DEFAULT_SERVER_NAME: &str = "imagesorcery-mcp";
pub const DEFAULT_INSTRUCTIONS: &str = "An MCP server providing tools for image processing operations. Input images must be specified with full paths.";

/// Identity advertised to MCP clients.
#[derive(Debug, Clone)]
pub struct ServerSection {
    pub name: String,
    pub instructions: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawServerSection {
    pub name: Option<String>,
    pub instructions: Option<String>,
}

pub fn parse_server_section(
    raw: Option<RawServerSection>,
    path: &Path,
) -> Result<ServerSection, ConfigError> {
    let server_raw = raw.unwrap_or_default();
    let name = server_raw
        .name
        .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "server.name",
            message: "Server name must not be blank".into(),
        });
    }
    let instructions = server_raw
        .instructions
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
    Ok(ServerSection { name, instructions })
}
