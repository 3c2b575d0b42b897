//! MCP server: configuration, capability registry, middleware chain and runtime.
pub mod config;
pub mod middleware;
pub mod provision;
pub mod registry;
pub mod runtime;
