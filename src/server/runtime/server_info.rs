use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};

use crate::server::config::ServerSection;

/// Build the `initialize` response advertised to MCP clients.
pub fn build_server_info(section: &ServerSection) -> ServerInfo {
    ServerInfo {
        capabilities: ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .enable_prompts()
            .build(),
        server_info: Implementation {
            name: section.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Implementation::from_build_env()
        },
        instructions: Some(section.instructions.clone()),
        ..ServerInfo::default()
    }
}
