//! Image tools registered on the server and the adapters that turn them into handlers.
//!
//! Most tools validate and normalise a request, then hand a job to the image backend
//! ([`BackendTool`]). `config` and `get_metainfo` are answered in-process ([`NativeTool`]).
use std::{
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

use rmcp::model::{CallToolResult, JsonObject, Tool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    lib::{
        backend::BackendJob,
        errors::{CapabilityError, ToolError},
        BoxFuture,
    },
    server::{
        config::ToolSettings,
        registry::{CapabilityContext, RegistryError, ToolHandler},
        runtime::ServerBuilder,
    },
};

pub mod blur;
pub mod change_color;
pub mod common;
pub mod config;
pub mod crop;
pub mod detect;
pub mod draw_arrows;
pub mod draw_circles;
pub mod draw_lines;
pub mod draw_rectangles;
pub mod draw_texts;
pub mod fill;
pub mod find;
pub mod get_metainfo;
pub mod ocr;
pub mod overlay;
pub mod resize;
pub mod rotate;

/// Register every image tool, in alphabetical order.
pub fn register_tools(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    blur::register_tool(builder)?;
    change_color::register_tool(builder)?;
    config::register_tool(builder)?;
    crop::register_tool(builder)?;
    detect::register_tool(builder)?;
    draw_arrows::register_tool(builder)?;
    draw_circles::register_tool(builder)?;
    draw_lines::register_tool(builder)?;
    draw_rectangles::register_tool(builder)?;
    draw_texts::register_tool(builder)?;
    fill::register_tool(builder)?;
    find::register_tool(builder)?;
    get_metainfo::register_tool(builder)?;
    ocr::register_tool(builder)?;
    overlay::register_tool(builder)?;
    resize::register_tool(builder)?;
    rotate::register_tool(builder)?;
    Ok(())
}

/// Validated job ready for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedJob {
    pub payload: Value,
    /// File the backend is expected to write, reported back to the client.
    pub output_path: Option<PathBuf>,
}

impl PreparedJob {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            output_path: None,
        }
    }

    pub fn with_output(payload: Value, output_path: PathBuf) -> Self {
        Self {
            payload,
            output_path: Some(output_path),
        }
    }

    /// Merge the backend result with what the server already knows about the job.
    pub fn finish(&self, result: Value) -> Value {
        match (result, &self.output_path) {
            (Value::Object(mut map), Some(path)) => {
                map.entry("output_path")
                    .or_insert_with(|| Value::String(path.to_string_lossy().into_owned()));
                Value::Object(map)
            }
            (Value::Object(map), None) => Value::Object(map),
            (other, Some(path)) => serde_json::json!({
                "result": other,
                "output_path": path.to_string_lossy(),
            }),
            (other, None) => serde_json::json!({ "result": other }),
        }
    }
}

/// A tool whose pixel work is done by the image backend.
pub trait BackendTool: Send + Sync + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    type Request: DeserializeOwned + JsonSchema + Send + 'static;

    fn prepare(
        request: Self::Request,
        settings: &ToolSettings,
        models_dir: &Path,
    ) -> Result<PreparedJob, ToolError>;
}

/// A tool answered entirely inside the server process.
pub trait NativeTool: Send + Sync + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    type Request: DeserializeOwned + JsonSchema + Send + 'static;

    fn run(
        request: Self::Request,
        ctx: &CapabilityContext,
    ) -> BoxFuture<'_, Result<Value, CapabilityError>>;
}

pub struct BackendToolHandler<T>(PhantomData<fn() -> T>);

impl<T> Default for BackendToolHandler<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: BackendTool> ToolHandler for BackendToolHandler<T> {
    fn definition(&self) -> Tool {
        Tool::new(T::NAME, T::DESCRIPTION, input_schema::<T::Request>())
    }

    fn call<'a>(
        &'a self,
        ctx: &'a CapabilityContext,
        arguments: JsonObject,
    ) -> BoxFuture<'a, Result<CallToolResult, CapabilityError>> {
        Box::pin(async move {
            let request: T::Request = parse_arguments(T::NAME, arguments)?;
            let settings = ctx.settings().await;
            let job = T::prepare(request, &settings, &ctx.models_dir)?;
            let result = ctx
                .backend
                .execute(BackendJob::new(T::NAME, job.payload.clone()))
                .await?;
            Ok(CallToolResult::structured(job.finish(result)))
        })
    }
}

pub struct NativeToolHandler<T>(PhantomData<fn() -> T>);

impl<T> Default for NativeToolHandler<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: NativeTool> ToolHandler for NativeToolHandler<T> {
    fn definition(&self) -> Tool {
        Tool::new(T::NAME, T::DESCRIPTION, input_schema::<T::Request>())
    }

    fn call<'a>(
        &'a self,
        ctx: &'a CapabilityContext,
        arguments: JsonObject,
    ) -> BoxFuture<'a, Result<CallToolResult, CapabilityError>> {
        Box::pin(async move {
            let request: T::Request = parse_arguments(T::NAME, arguments)?;
            let value = T::run(request, ctx).await?;
            Ok(CallToolResult::structured(value))
        })
    }
}

pub fn register_backend_tool<T: BackendTool>(
    builder: &mut ServerBuilder,
) -> Result<(), RegistryError> {
    builder.register_tool(Arc::new(BackendToolHandler::<T>::default()))
}

pub fn register_native_tool<T: NativeTool>(
    builder: &mut ServerBuilder,
) -> Result<(), RegistryError> {
    builder.register_tool(Arc::new(NativeToolHandler::<T>::default()))
}

/// JSON Schema of a request type as an MCP input schema object.
pub fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(schema)) => Arc::new(schema),
        _ => Arc::new(JsonObject::new()),
    }
}

fn parse_arguments<R: DeserializeOwned>(
    tool: &str,
    arguments: JsonObject,
) -> Result<R, CapabilityError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|err| {
        CapabilityError::InvalidArguments {
            target: tool.to_string(),
            violations: vec![err.to_string()],
        }
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        fs,
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    };

    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::{
        lib::{backend::ImageBackend, errors::BackendError, BoxFuture},
        server::{config::ServerConfig, registry::CapabilityContext},
    };

    use super::BackendJob;

    /// Backend that records jobs and answers `{"status": "ok"}`.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub jobs: Mutex<Vec<(String, Value)>>,
    }

    impl ImageBackend for RecordingBackend {
        fn execute(&self, job: BackendJob) -> BoxFuture<'_, Result<Value, BackendError>> {
            Box::pin(async move {
                self.jobs
                    .lock()
                    .unwrap()
                    .push((job.tool.to_string(), job.payload));
                Ok(json!({ "status": "ok" }))
            })
        }
    }

    pub fn context(temp: &TempDir, backend: Arc<dyn ImageBackend>) -> CapabilityContext {
        let config = ServerConfig::defaults_at(temp.path().join("config.toml"));
        CapabilityContext::new(&config, backend)
    }

    /// Create an (empty) image file and return its absolute path.
    pub fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not really an image").unwrap();
        path
    }
}
