use std::{collections::BTreeMap, sync::Arc};

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, ErrorData, GetPromptRequestParam, GetPromptResult,
        JsonObject, ListPromptsResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerInfo,
    },
    service::RequestContext,
    RoleServer, ServerHandler,
};
use tracing::info;

use crate::{
    lib::{errors::CapabilityError, BoxFuture},
    server::{
        config::ServerSection,
        middleware::{
            CapabilityOutput, CapabilityStats, Endpoint, ErrorHandlingMiddleware, Middleware,
            MiddlewareContext, MiddlewareResult, Next, Operation, TelemetryMiddleware,
        },
        registry::{CapabilityContext, CapabilityRegistry},
    },
};

use super::server_info::build_server_info;

/// Innermost handler: looks the capability up and invokes it.
struct CapabilityEndpoint {
    registry: Arc<CapabilityRegistry>,
    context: CapabilityContext,
}

impl Endpoint for CapabilityEndpoint {
    fn dispatch<'a>(&'a self, ctx: &'a MiddlewareContext) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let target = ctx.target.clone().unwrap_or_default();
            match ctx.operation {
                Operation::ListTools => Ok(CapabilityOutput::Tools(self.registry.tools())),
                Operation::ListResources => {
                    Ok(CapabilityOutput::Resources(self.registry.resources()))
                }
                Operation::ListPrompts => Ok(CapabilityOutput::Prompts(self.registry.prompts())),
                Operation::CallTool => {
                    let tool = self
                        .registry
                        .tool(&target)
                        .ok_or(CapabilityError::UnknownTool { name: target.clone() })?;
                    let result = tool
                        .handler
                        .call(&self.context, ctx.arguments.clone())
                        .await?;
                    Ok(CapabilityOutput::ToolResult(result))
                }
                Operation::ReadResource => {
                    let resource = self
                        .registry
                        .resource(&target)
                        .ok_or(CapabilityError::UnknownResource { uri: target.clone() })?;
                    let contents = resource.handler.read(&self.context).await?;
                    Ok(CapabilityOutput::ResourceContents(contents))
                }
                Operation::GetPrompt => {
                    let prompt = self
                        .registry
                        .prompt(&target)
                        .ok_or(CapabilityError::UnknownPrompt { name: target.clone() })?;
                    let rendered = prompt.handler.render(&ctx.arguments)?;
                    Ok(CapabilityOutput::Prompt(rendered))
                }
            }
        })
    }
}

/// Typed handles on chain members whose state the server reads back.
#[derive(Default)]
pub(super) struct Observers {
    pub(super) telemetry: Option<Arc<TelemetryMiddleware>>,
    pub(super) error_handling: Option<Arc<ErrorHandlingMiddleware>>,
}

struct Inner {
    info: ServerSection,
    middlewares: Arc<[Arc<dyn Middleware>]>,
    observers: Observers,
    registry: Arc<CapabilityRegistry>,
    endpoint: CapabilityEndpoint,
}

/// MCP server routing every request through the middleware chain.
#[derive(Clone)]
pub struct ImageSorceryServer {
    inner: Arc<Inner>,
}

impl ImageSorceryServer {
    pub(super) fn new(
        info: ServerSection,
        middlewares: Arc<[Arc<dyn Middleware>]>,
        observers: Observers,
        registry: Arc<CapabilityRegistry>,
        context: CapabilityContext,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                info,
                middlewares,
                observers,
                endpoint: CapabilityEndpoint {
                    registry: registry.clone(),
                    context,
                },
                registry,
            }),
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.inner.registry
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.inner.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Request counters from the telemetry middleware, keyed by `operation:target`.
    pub fn request_stats(&self) -> BTreeMap<String, CapabilityStats> {
        self.inner
            .observers
            .telemetry
            .as_ref()
            .map(|telemetry| telemetry.snapshot())
            .unwrap_or_default()
    }

    /// Failure counters from the error-handling middleware, keyed by `operation:kind`.
    pub fn error_counts(&self) -> BTreeMap<String, u64> {
        self.inner
            .observers
            .error_handling
            .as_ref()
            .map(|errors| errors.error_counts())
            .unwrap_or_default()
    }

    /// Log the accumulated counters; called once the transport stops.
    pub fn log_request_summary(&self) {
        let stats = self.request_stats();
        let errors = self.error_counts();
        let requests: u64 = stats.values().map(|s| s.requests).sum();
        let failures: u64 = errors.values().sum();
        info!(
            target: "imagesorcery::runtime",
            requests,
            failures,
            "Request summary"
        );
        for (label, entry) in &stats {
            info!(
                target: "imagesorcery::runtime",
                request = %label,
                requests = entry.requests,
                failures = entry.failures,
                total_duration_ms = entry.total_duration_ms,
                "Capability usage"
            );
        }
        for (key, count) in &errors {
            info!(
                target: "imagesorcery::runtime",
                error = %key,
                count,
                "Error count"
            );
        }
    }

    fn to_error_data(&self, err: CapabilityError) -> ErrorData {
        match &self.inner.observers.error_handling {
            Some(errors) => errors.to_error_data(err),
            None => err.into_plain_error_data(),
        }
    }

    /// Run one request through the middleware chain.
    pub async fn handle(
        &self,
        operation: Operation,
        target: Option<String>,
        arguments: JsonObject,
    ) -> Result<CapabilityOutput, ErrorData> {
        let ctx = MiddlewareContext::new(operation, target, arguments, self.inner.registry.clone());
        Next::new(&self.inner.middlewares, &self.inner.endpoint)
            .run(&ctx)
            .await
            .map_err(|err| self.to_error_data(err))
    }
}

fn unexpected_output(operation: Operation) -> ErrorData {
    ErrorData::internal_error(
        format!("unexpected result type for {}", operation.as_str()),
        None,
    )
}

impl ServerHandler for ImageSorceryServer {
    fn get_info(&self) -> ServerInfo {
        build_server_info(&self.inner.info)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        match self.handle(Operation::ListTools, None, JsonObject::new()).await? {
            CapabilityOutput::Tools(tools) => Ok(ListToolsResult::with_all_items(tools)),
            _ => Err(unexpected_output(Operation::ListTools)),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = request.arguments.unwrap_or_default();
        match self
            .handle(Operation::CallTool, Some(request.name.to_string()), arguments)
            .await?
        {
            CapabilityOutput::ToolResult(result) => Ok(result),
            _ => Err(unexpected_output(Operation::CallTool)),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        match self
            .handle(Operation::ListResources, None, JsonObject::new())
            .await?
        {
            CapabilityOutput::Resources(resources) => {
                Ok(ListResourcesResult::with_all_items(resources))
            }
            _ => Err(unexpected_output(Operation::ListResources)),
        }
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        match self
            .handle(Operation::ReadResource, Some(request.uri), JsonObject::new())
            .await?
        {
            CapabilityOutput::ResourceContents(contents) => Ok(contents),
            _ => Err(unexpected_output(Operation::ReadResource)),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        match self
            .handle(Operation::ListPrompts, None, JsonObject::new())
            .await?
        {
            CapabilityOutput::Prompts(prompts) => Ok(ListPromptsResult::with_all_items(prompts)),
            _ => Err(unexpected_output(Operation::ListPrompts)),
        }
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        let arguments = request.arguments.unwrap_or_default();
        match self
            .handle(Operation::GetPrompt, Some(request.name), arguments)
            .await?
        {
            CapabilityOutput::Prompt(prompt) => Ok(prompt),
            _ => Err(unexpected_output(Operation::GetPrompt)),
        }
    }
}
