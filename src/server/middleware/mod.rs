//! Request/response interceptors composed around capability dispatch.
//!
//! Middlewares run in registration order: the first one added is the outermost and sees
//! every request first and every response last. The capability endpoint sits innermost.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rmcp::model::{
    CallToolResult, GetPromptResult, JsonObject, Prompt, ReadResourceResult, Resource, Tool,
};
use uuid::Uuid;

use crate::{
    lib::{errors::CapabilityError, BoxFuture},
    server::registry::CapabilityRegistry,
};

pub mod error_handling;
pub mod telemetry;
pub mod validation;

pub use error_handling::ErrorHandlingMiddleware;
pub use telemetry::{CapabilityStats, TelemetryMiddleware};
pub use validation::ValidationMiddleware;

pub type MiddlewareResult = Result<CapabilityOutput, CapabilityError>;

/// MCP operation being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
    ListPrompts,
    GetPrompt,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::ListTools => "tools/list",
            Operation::CallTool => "tools/call",
            Operation::ListResources => "resources/list",
            Operation::ReadResource => "resources/read",
            Operation::ListPrompts => "prompts/list",
            Operation::GetPrompt => "prompts/get",
        }
    }
}

/// Result produced by the endpoint, one variant per operation.
#[derive(Debug, Clone)]
pub enum CapabilityOutput {
    Tools(Vec<Tool>),
    ToolResult(CallToolResult),
    Resources(Vec<Resource>),
    ResourceContents(ReadResourceResult),
    Prompts(Vec<Prompt>),
    Prompt(GetPromptResult),
}

/// Per-request data visible to middlewares.
#[derive(Clone)]
pub struct MiddlewareContext {
    pub request_id: Uuid,
    pub operation: Operation,
    /// Tool name, resource URI or prompt name; `None` for list operations.
    pub target: Option<String>,
    pub arguments: JsonObject,
    pub received_at: DateTime<Utc>,
    registry: Arc<CapabilityRegistry>,
}

impl MiddlewareContext {
    pub fn new(
        operation: Operation,
        target: Option<String>,
        arguments: JsonObject,
        registry: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            operation,
            target,
            arguments,
            received_at: Utc::now(),
            registry,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// `operation` or `operation:target`, used in logs and statistics.
    pub fn label(&self) -> String {
        match &self.target {
            Some(target) => format!("{}:{target}", self.operation.as_str()),
            None => self.operation.as_str().to_string(),
        }
    }
}

pub trait Middleware: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult>;
}

/// Innermost handler reached once every middleware has called `next`.
pub trait Endpoint: Send + Sync {
    fn dispatch<'a>(&'a self, ctx: &'a MiddlewareContext) -> BoxFuture<'a, MiddlewareResult>;
}

/// The rest of the chain after the current middleware.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(chain: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self {
            remaining: chain,
            endpoint,
        }
    }

    pub fn run(self, ctx: &'a MiddlewareContext) -> BoxFuture<'a, MiddlewareResult> {
        match self.remaining.split_first() {
            Some((current, rest)) => current.handle(
                ctx,
                Next {
                    remaining: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => self.endpoint.dispatch(ctx),
        }
    }
}
