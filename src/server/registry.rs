//! Capability registry: named tools, URI-addressed resources and prompts.
//!
//! The registry is filled through `ServerBuilder` and frozen behind an `Arc` when the
//! server is built; nothing reachable from a running server can mutate it.
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use rmcp::model::{
    CallToolResult, GetPromptResult, JsonObject, Prompt, ReadResourceResult, Resource, Tool,
};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    lib::{backend::ImageBackend, errors::CapabilityError, BoxFuture},
    server::config::{ServerConfig, ToolSettings},
};

/// Shared state handed to every capability handler.
#[derive(Clone)]
pub struct CapabilityContext {
    pub settings: Arc<RwLock<ToolSettings>>,
    pub backend: Arc<dyn ImageBackend>,
    pub models_dir: PathBuf,
    /// Config file the `config` tool persists to.
    pub config_path: PathBuf,
}

impl CapabilityContext {
    pub fn new(config: &ServerConfig, backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            settings: Arc::new(RwLock::new(config.defaults.clone())),
            backend,
            models_dir: config.models.dir.clone(),
            config_path: config.source_path.clone(),
        }
    }

    /// Snapshot of the current tool defaults.
    pub async fn settings(&self) -> ToolSettings {
        self.settings.read().await.clone()
    }
}

pub trait ToolHandler: Send + Sync + 'static {
    fn definition(&self) -> Tool;

    fn call<'a>(
        &'a self,
        ctx: &'a CapabilityContext,
        arguments: JsonObject,
    ) -> BoxFuture<'a, Result<CallToolResult, CapabilityError>>;
}

pub trait ResourceHandler: Send + Sync + 'static {
    fn definition(&self) -> Resource;

    fn read<'a>(
        &'a self,
        ctx: &'a CapabilityContext,
    ) -> BoxFuture<'a, Result<ReadResourceResult, CapabilityError>>;
}

pub trait PromptHandler: Send + Sync + 'static {
    fn definition(&self) -> Prompt;

    fn render(&self, arguments: &JsonObject) -> Result<GetPromptResult, CapabilityError>;
}

/// Registration failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} `{name}` is already registered")]
    Duplicate { kind: &'static str, name: String },
    #[error("{kind} name must not be blank")]
    BlankName { kind: &'static str },
}

pub struct RegisteredTool {
    pub definition: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

pub struct RegisteredResource {
    pub definition: Resource,
    pub handler: Arc<dyn ResourceHandler>,
}

pub struct RegisteredPrompt {
    pub definition: Prompt,
    pub handler: Arc<dyn PromptHandler>,
}

#[derive(Default)]
pub struct CapabilityRegistry {
    tools: BTreeMap<String, RegisteredTool>,
    resources: BTreeMap<String, RegisteredResource>,
    prompts: BTreeMap<String, RegisteredPrompt>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let definition = handler.definition();
        let name = checked_name("tool", definition.name.as_ref(), &self.tools)?;
        self.tools.insert(
            name,
            RegisteredTool {
                definition,
                handler,
            },
        );
        Ok(())
    }

    pub fn register_resource(
        &mut self,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), RegistryError> {
        let definition = handler.definition();
        let uri = checked_name("resource", definition.uri.as_str(), &self.resources)?;
        self.resources.insert(
            uri,
            RegisteredResource {
                definition,
                handler,
            },
        );
        Ok(())
    }

    pub fn register_prompt(
        &mut self,
        handler: Arc<dyn PromptHandler>,
    ) -> Result<(), RegistryError> {
        let definition = handler.definition();
        let name = checked_name("prompt", definition.name.as_str(), &self.prompts)?;
        self.prompts.insert(
            name,
            RegisteredPrompt {
                definition,
                handler,
            },
        );
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn resource(&self, uri: &str) -> Option<&RegisteredResource> {
        self.resources.get(uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&RegisteredPrompt> {
        self.prompts.get(name)
    }

    /// Tool definitions sorted by name.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources
            .values()
            .map(|r| r.definition.clone())
            .collect()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.values().map(|p| p.definition.clone()).collect()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// (tools, resources, prompts)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.tools.len(), self.resources.len(), self.prompts.len())
    }
}

fn checked_name<V>(
    kind: &'static str,
    name: &str,
    existing: &BTreeMap<String, V>,
) -> Result<String, RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::BlankName { kind });
    }
    if existing.contains_key(name) {
        return Err(RegistryError::Duplicate {
            kind,
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rmcp::model::{CallToolResult, JsonObject, Tool};
    use serde_json::json;

    use super::*;
    use crate::{
        prompts::remove_background::RemoveBackgroundPrompt, resources::models::ModelsResource,
    };

    struct EchoTool(&'static str);

    impl ToolHandler for EchoTool {
        fn definition(&self) -> Tool {
            Tool::new(self.0, "echo", Arc::new(JsonObject::new()))
        }

        fn call<'a>(
            &'a self,
            _ctx: &'a CapabilityContext,
            arguments: JsonObject,
        ) -> BoxFuture<'a, Result<CallToolResult, CapabilityError>> {
            Box::pin(async move { Ok(CallToolResult::structured(json!(arguments))) })
        }
    }

    #[test]
    fn duplicate_tool_names_are_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_tool(Arc::new(EchoTool("blur")))
            .expect("first registration");

        let err = registry
            .register_tool(Arc::new(EchoTool("blur")))
            .expect_err("duplicate must fail");

        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: "tool",
                name: "blur".into()
            }
        );
        assert_eq!(registry.counts(), (1, 0, 0));
    }

    #[test]
    fn duplicate_resource_uris_are_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_resource(Arc::new(ModelsResource))
            .expect("first registration");

        let err = registry
            .register_resource(Arc::new(ModelsResource))
            .expect_err("duplicate must fail");

        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: "resource",
                name: "models://list".into()
            }
        );
        assert_eq!(registry.counts(), (0, 1, 0));
    }

    #[test]
    fn duplicate_prompt_names_are_rejected() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register_prompt(Arc::new(RemoveBackgroundPrompt))
            .expect("first registration");

        let err = registry
            .register_prompt(Arc::new(RemoveBackgroundPrompt))
            .expect_err("duplicate must fail");

        assert_eq!(
            err,
            RegistryError::Duplicate {
                kind: "prompt",
                name: "remove-background".into()
            }
        );
        assert_eq!(registry.counts(), (0, 0, 1));
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut registry = CapabilityRegistry::new();
        let err = registry
            .register_tool(Arc::new(EchoTool("  ")))
            .expect_err("blank must fail");
        assert_eq!(err, RegistryError::BlankName { kind: "tool" });
    }

    #[test]
    fn tools_are_listed_in_name_order() {
        let mut registry = CapabilityRegistry::new();
        for name in ["rotate", "blur", "crop"] {
            registry
                .register_tool(Arc::new(EchoTool(name)))
                .expect("registration");
        }
        assert_eq!(registry.tool_names(), vec!["blur", "crop", "rotate"]);
        assert!(registry.tool("crop").is_some());
        assert!(registry.tool("resize").is_none());
    }
}
