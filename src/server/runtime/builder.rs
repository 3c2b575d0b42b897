use std::sync::Arc;

use crate::{
    lib::backend::{CommandBackend, ImageBackend},
    prompts, resources,
    server::{
        config::{ServerConfig, ServerSection},
        middleware::{ErrorHandlingMiddleware, Middleware, TelemetryMiddleware, ValidationMiddleware},
        registry::{
            CapabilityContext, CapabilityRegistry, PromptHandler, RegistryError, ResourceHandler,
            ToolHandler,
        },
    },
    tools,
};

use super::handler::{ImageSorceryServer, Observers};

/// Collects middlewares and capabilities before the server starts serving.
///
/// Everything added here is frozen by [`ServerBuilder::build`].
pub struct ServerBuilder {
    info: ServerSection,
    context: CapabilityContext,
    middlewares: Vec<Arc<dyn Middleware>>,
    observers: Observers,
    registry: CapabilityRegistry,
}

impl ServerBuilder {
    pub fn new(info: ServerSection, context: CapabilityContext) -> Self {
        Self {
            info,
            context,
            middlewares: Vec::new(),
            observers: Observers::default(),
            registry: CapabilityRegistry::new(),
        }
    }

    /// Append a middleware; earlier additions wrap later ones.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Append the telemetry middleware and keep its counters reachable from the server.
    pub fn add_telemetry(&mut self, telemetry: Arc<TelemetryMiddleware>) -> &mut Self {
        self.observers.telemetry = Some(telemetry.clone());
        self.add_middleware(telemetry)
    }

    /// Append the error-handling middleware; its policy also covers errors raised
    /// before it runs.
    pub fn add_error_handling(&mut self, errors: Arc<ErrorHandlingMiddleware>) -> &mut Self {
        self.observers.error_handling = Some(errors.clone());
        self.add_middleware(errors)
    }

    pub fn register_tool(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        self.registry.register_tool(handler)
    }

    pub fn register_resource(
        &mut self,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), RegistryError> {
        self.registry.register_resource(handler)
    }

    pub fn register_prompt(
        &mut self,
        handler: Arc<dyn PromptHandler>,
    ) -> Result<(), RegistryError> {
        self.registry.register_prompt(handler)
    }

    pub fn build(self) -> ImageSorceryServer {
        ImageSorceryServer::new(
            self.info,
            self.middlewares.into(),
            self.observers,
            Arc::new(self.registry),
            self.context,
        )
    }
}

/// Build the fully configured server for `config`.
pub fn compose_server(config: &ServerConfig) -> Result<ImageSorceryServer, RegistryError> {
    let backend = Arc::new(CommandBackend::from_config(&config.backend));
    compose_server_with_backend(config, backend)
}

/// Same as [`compose_server`] with a caller-supplied image backend.
pub fn compose_server_with_backend(
    config: &ServerConfig,
    backend: Arc<dyn ImageBackend>,
) -> Result<ImageSorceryServer, RegistryError> {
    let context = CapabilityContext::new(config, backend);
    let mut builder = ServerBuilder::new(config.server.clone(), context);

    builder
        .add_middleware(Arc::new(ValidationMiddleware::new()))
        .add_telemetry(Arc::new(TelemetryMiddleware::new(
            config.middleware.telemetry_enabled,
        )))
        .add_error_handling(Arc::new(ErrorHandlingMiddleware::new(
            config.middleware.include_traceback,
            config.middleware.transform_errors,
        )));

    tools::register_tools(&mut builder)?;
    resources::register_resources(&mut builder)?;
    prompts::register_prompts(&mut builder)?;

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn composed_server_registers_every_capability() {
        let config = ServerConfig::defaults_at(PathBuf::from("/tmp/imagesorcery/config.toml"));
        let server = compose_server(&config).expect("composition succeeds");

        let registry = server.registry();
        assert_eq!(
            registry.tool_names(),
            vec![
                "blur",
                "change_color",
                "config",
                "crop",
                "detect",
                "draw_arrows",
                "draw_circles",
                "draw_lines",
                "draw_rectangles",
                "draw_texts",
                "fill",
                "find",
                "get_metainfo",
                "ocr",
                "overlay",
                "resize",
                "rotate",
            ]
        );
        assert_eq!(registry.counts(), (17, 1, 1));
        assert!(registry.resource("models://list").is_some());
        assert!(registry.prompt("remove-background").is_some());
        assert_eq!(
            server.middleware_names(),
            vec!["validation", "telemetry", "error_handling"]
        );
    }

    #[test]
    fn registering_a_tool_twice_fails() {
        let config = ServerConfig::defaults_at(PathBuf::from("/tmp/imagesorcery/config.toml"));
        let backend = Arc::new(CommandBackend::from_config(&config.backend));
        let mut builder =
            ServerBuilder::new(config.server.clone(), CapabilityContext::new(&config, backend));

        tools::register_tools(&mut builder).expect("first registration");
        let err = tools::register_tools(&mut builder).expect_err("second registration");

        assert!(matches!(err, RegistryError::Duplicate { kind: "tool", .. }));
    }
}
