//! MCP resources.
use crate::server::{registry::RegistryError, runtime::ServerBuilder};

pub mod models;

pub fn register_resources(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    models::register_resource(builder)
}
