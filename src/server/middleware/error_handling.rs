//! Logs and counts failures, and turns them into structured protocol errors.
use std::{collections::BTreeMap, sync::Mutex};

use rmcp::model::ErrorData;
use tracing::{error, warn};

use super::{Middleware, MiddlewareContext, MiddlewareResult, Next};
use crate::lib::{
    errors::{error_chain, CapabilityError},
    BoxFuture,
};

pub struct ErrorHandlingMiddleware {
    include_traceback: bool,
    transform_errors: bool,
    error_counts: Mutex<BTreeMap<String, u64>>,
}

impl ErrorHandlingMiddleware {
    pub fn new(include_traceback: bool, transform_errors: bool) -> Self {
        Self {
            include_traceback,
            transform_errors,
            error_counts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Failure counts keyed by `operation:error_kind`.
    pub fn error_counts(&self) -> BTreeMap<String, u64> {
        self.error_counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    fn observe(&self, ctx: &MiddlewareContext, err: &CapabilityError) {
        let key = format!("{}:{}", ctx.operation.as_str(), err.kind());
        if let Ok(mut counts) = self.error_counts.lock() {
            *counts.entry(key).or_insert(0) += 1;
        }

        let internal = matches!(
            err,
            CapabilityError::Internal { .. } | CapabilityError::Tool(_)
        );
        let detail = if self.include_traceback {
            error_chain(err).join(" <- ")
        } else {
            err.to_string()
        };
        if internal {
            error!(
                target: "imagesorcery::errors",
                request_id = %ctx.request_id,
                request = %ctx.label(),
                error_kind = err.kind(),
                detail = %detail,
                "Capability failed"
            );
        } else {
            warn!(
                target: "imagesorcery::errors",
                request_id = %ctx.request_id,
                request = %ctx.label(),
                error_kind = err.kind(),
                detail = %detail,
                "Capability rejected request"
            );
        }
    }

    /// Protocol error for `err` under this middleware's settings.
    pub fn to_error_data(&self, err: CapabilityError) -> ErrorData {
        if self.transform_errors {
            err.into_error_data(self.include_traceback)
        } else {
            err.into_plain_error_data()
        }
    }
}

impl Middleware for ErrorHandlingMiddleware {
    fn name(&self) -> &'static str {
        "error_handling"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            match next.run(ctx).await {
                Ok(output) => Ok(output),
                Err(err) => {
                    self.observe(ctx, &err);
                    if self.transform_errors {
                        Err(CapabilityError::Protocol(self.to_error_data(err)))
                    } else {
                        Err(err)
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use rmcp::model::{ErrorCode, JsonObject};
    use serde_json::Value;

    use super::*;
    use crate::{
        lib::errors::ToolError,
        server::{
            middleware::{Endpoint, Operation},
            registry::CapabilityRegistry,
        },
    };

    struct FailingEndpoint;

    impl Endpoint for FailingEndpoint {
        fn dispatch<'a>(&'a self, _ctx: &'a MiddlewareContext) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async {
                Err(CapabilityError::Tool(ToolError::FileNotFound {
                    field: "input_path",
                    path: PathBuf::from("/tmp/missing.png"),
                }))
            })
        }
    }

    fn context() -> MiddlewareContext {
        MiddlewareContext::new(
            Operation::CallTool,
            Some("blur".into()),
            JsonObject::new(),
            Arc::new(CapabilityRegistry::new()),
        )
    }

    #[tokio::test]
    async fn errors_become_structured_protocol_errors() {
        let handler = Arc::new(ErrorHandlingMiddleware::new(true, true));
        let chain: Vec<Arc<dyn Middleware>> = vec![handler.clone()];

        let err = Next::new(&chain, &FailingEndpoint)
            .run(&context())
            .await
            .expect_err("endpoint fails");

        let CapabilityError::Protocol(data) = err else {
            panic!("error was not transformed");
        };
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
        let payload = data.data.expect("structured payload");
        assert_eq!(payload["code"], Value::from("invalid_request"));
        assert!(payload.get("traceback").is_some());
        assert_eq!(handler.error_counts()["tools/call:tool"], 1);
    }

    #[tokio::test]
    async fn transform_can_be_disabled() {
        let chain: Vec<Arc<dyn Middleware>> =
            vec![Arc::new(ErrorHandlingMiddleware::new(false, false))];

        let err = Next::new(&chain, &FailingEndpoint)
            .run(&context())
            .await
            .expect_err("endpoint fails");

        assert!(matches!(err, CapabilityError::Tool(ToolError::FileNotFound { .. })));
    }

    #[test]
    fn errors_raised_outside_the_chain_use_the_same_policy() {
        let rejected = || CapabilityError::InvalidArguments {
            target: "crop".into(),
            violations: vec!["\"x1\" is a required property".into()],
        };

        let structured = ErrorHandlingMiddleware::new(false, true).to_error_data(rejected());
        assert_eq!(structured.code, ErrorCode::INVALID_PARAMS);
        let payload = structured.data.expect("structured payload");
        assert_eq!(payload["code"], Value::from("invalid_arguments"));
        assert_eq!(payload["details"]["violations"].as_array().map(Vec::len), Some(1));
        assert!(payload.get("traceback").is_none());

        let plain = ErrorHandlingMiddleware::new(true, false).to_error_data(rejected());
        assert_eq!(plain.code, ErrorCode::INVALID_PARAMS);
        assert!(plain.data.is_none());
    }
}
