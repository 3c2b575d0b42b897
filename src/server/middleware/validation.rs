//! Rejects requests that name unknown capabilities or carry arguments that do not match
//! the advertised input schema, before any handler runs.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use jsonschema::Validator;
use serde_json::Value;
use tracing::debug;

use super::{Middleware, MiddlewareContext, MiddlewareResult, Next, Operation};
use crate::lib::{errors::CapabilityError, BoxFuture};

#[derive(Default)]
pub struct ValidationMiddleware {
    validators: Mutex<HashMap<String, Arc<Validator>>>,
}

impl ValidationMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, ctx: &MiddlewareContext) -> Result<(), CapabilityError> {
        let target = ctx.target.clone().unwrap_or_default();
        match ctx.operation {
            Operation::CallTool => {
                let tool = ctx
                    .registry()
                    .tool(&target)
                    .ok_or_else(|| CapabilityError::UnknownTool {
                        name: target.clone(),
                    })?;
                let validator = self.validator_for(&target, &tool.definition.input_schema)?;
                let instance = Value::Object(ctx.arguments.clone());
                let violations: Vec<String> = validator
                    .iter_errors(&instance)
                    .map(|err| err.to_string())
                    .collect();
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(CapabilityError::InvalidArguments { target, violations })
                }
            }
            Operation::ReadResource => {
                if ctx.registry().resource(&target).is_none() {
                    return Err(CapabilityError::UnknownResource { uri: target });
                }
                Ok(())
            }
            Operation::GetPrompt => {
                let prompt = ctx.registry().prompt(&target).ok_or_else(|| {
                    CapabilityError::UnknownPrompt {
                        name: target.clone(),
                    }
                })?;
                let violations: Vec<String> = prompt
                    .definition
                    .arguments
                    .iter()
                    .flatten()
                    .filter(|argument| argument.required == Some(true))
                    .filter(|argument| {
                        ctx.arguments
                            .get(&argument.name)
                            .map_or(true, Value::is_null)
                    })
                    .map(|argument| format!("missing required argument `{}`", argument.name))
                    .collect();
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(CapabilityError::InvalidArguments { target, violations })
                }
            }
            Operation::ListTools | Operation::ListResources | Operation::ListPrompts => Ok(()),
        }
    }

    fn validator_for(
        &self,
        tool: &str,
        schema: &serde_json::Map<String, Value>,
    ) -> Result<Arc<Validator>, CapabilityError> {
        let mut cache = self
            .validators
            .lock()
            .map_err(|_| CapabilityError::Internal {
                message: "validator cache is poisoned".to_string(),
            })?;
        if let Some(validator) = cache.get(tool) {
            return Ok(validator.clone());
        }
        let validator = jsonschema::validator_for(&Value::Object(schema.clone())).map_err(
            |err| CapabilityError::Internal {
                message: format!("input schema for `{tool}` does not compile: {err}"),
            },
        )?;
        let validator = Arc::new(validator);
        cache.insert(tool.to_string(), validator.clone());
        Ok(validator)
    }
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            if let Err(err) = self.check(ctx) {
                debug!(
                    target: "imagesorcery::middleware",
                    request_id = %ctx.request_id,
                    request = %ctx.label(),
                    reason = %err,
                    "Request rejected by validation"
                );
                return Err(err);
            }
            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rmcp::model::{
        CallToolResult, GetPromptResult, JsonObject, Prompt, PromptArgument, Tool,
    };
    use serde_json::json;

    use super::*;
    use crate::server::{
        middleware::{CapabilityOutput, Endpoint},
        registry::{CapabilityContext, CapabilityRegistry, PromptHandler, ToolHandler},
    };

    struct CropLike;

    impl ToolHandler for CropLike {
        fn definition(&self) -> Tool {
            let schema = json!({
                "type": "object",
                "properties": {
                    "input_path": { "type": "string" },
                    "x1": { "type": "integer", "minimum": 0 }
                },
                "required": ["input_path", "x1"]
            });
            let schema = schema.as_object().cloned().unwrap_or_default();
            Tool::new("crop", "crop", Arc::new(schema))
        }

        fn call<'a>(
            &'a self,
            _ctx: &'a CapabilityContext,
            _arguments: JsonObject,
        ) -> BoxFuture<'a, Result<CallToolResult, CapabilityError>> {
            Box::pin(async { Ok(CallToolResult::structured(json!({}))) })
        }
    }

    struct NeedsImage;

    impl PromptHandler for NeedsImage {
        fn definition(&self) -> Prompt {
            let argument: PromptArgument = serde_json::from_value(json!({
                "name": "image_path",
                "required": true
            }))
            .unwrap();
            Prompt::new("needs-image", None::<String>, Some(vec![argument]))
        }

        fn render(&self, _arguments: &JsonObject) -> Result<GetPromptResult, CapabilityError> {
            Ok(GetPromptResult {
                description: None,
                messages: Vec::new(),
            })
        }
    }

    struct Reached;

    impl Endpoint for Reached {
        fn dispatch<'a>(&'a self, _ctx: &'a MiddlewareContext) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async { Ok(CapabilityOutput::Tools(Vec::new())) })
        }
    }

    fn registry() -> Arc<CapabilityRegistry> {
        let mut registry = CapabilityRegistry::new();
        registry.register_tool(Arc::new(CropLike)).unwrap();
        registry.register_prompt(Arc::new(NeedsImage)).unwrap();
        Arc::new(registry)
    }

    async fn run(operation: Operation, target: &str, arguments: serde_json::Value) -> MiddlewareResult {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(ValidationMiddleware::new())];
        let ctx = MiddlewareContext::new(
            operation,
            Some(target.to_string()),
            arguments.as_object().cloned().unwrap_or_default(),
            registry(),
        );
        Next::new(&chain, &Reached).run(&ctx).await
    }

    #[tokio::test]
    async fn valid_arguments_reach_the_endpoint() {
        let result = run(
            Operation::CallTool,
            "crop",
            json!({ "input_path": "/tmp/a.png", "x1": 4 }),
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn schema_violations_are_all_reported() {
        let err = run(Operation::CallTool, "crop", json!({ "x1": -1 }))
            .await
            .expect_err("invalid arguments");
        match err {
            CapabilityError::InvalidArguments { target, violations } => {
                assert_eq!(target, "crop");
                assert_eq!(violations.len(), 2, "{violations:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = run(Operation::CallTool, "sharpen", json!({}))
            .await
            .expect_err("unknown tool");
        assert!(matches!(err, CapabilityError::UnknownTool { name } if name == "sharpen"));
    }

    #[tokio::test]
    async fn unknown_resource_is_rejected() {
        let err = run(Operation::ReadResource, "models://nope", json!({}))
            .await
            .expect_err("unknown resource");
        assert!(matches!(err, CapabilityError::UnknownResource { .. }));
    }

    #[tokio::test]
    async fn missing_prompt_argument_is_rejected() {
        let err = run(Operation::GetPrompt, "needs-image", json!({}))
            .await
            .expect_err("missing argument");
        assert!(matches!(err, CapabilityError::InvalidArguments { .. }));

        let ok = run(
            Operation::GetPrompt,
            "needs-image",
            json!({ "image_path": "/tmp/a.png" }),
        )
        .await;
        assert!(ok.is_ok());
    }
}
