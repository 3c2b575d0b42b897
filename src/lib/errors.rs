use std::{error::Error as StdError, io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use rmcp::model::{ErrorCode, ErrorData};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Errors that can occur while loading, validating or persisting configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
    /// Failed to write the configuration file back to disk.
    #[error("Failed to write configuration file {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Failures reported by the external image backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("No image backend is configured (set [backend].program)")]
    Unavailable,
    #[error("Failed to start image backend `{program}`: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to exchange data with the image backend: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    #[error("Image backend exited abnormally (exit={exit_code:?}): {message}")]
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
    #[error("Image backend timed out after {duration_secs} seconds")]
    Timeout { duration_secs: u64 },
    #[error("Image backend returned invalid JSON: {source}")]
    InvalidOutput {
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by tool handlers before or after the backend runs.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("`{field}` must be a full (absolute) path: {path}")]
    PathNotAbsolute { field: &'static str, path: PathBuf },
    #[error("`{field}` does not exist: {path}")]
    FileNotFound { field: &'static str, path: PathBuf },
    #[error("Invalid `{field}`: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },
    #[error("Model `{model}` was not found in {dir}")]
    ModelNotFound { model: String, dir: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures of the `--post-install` provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to create models directory {path}: {source}")]
    ModelsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Configured image backend `{program}` was not found")]
    BackendMissing { program: PathBuf },
}

/// Error type flowing through the middleware chain.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Unknown tool `{name}`")]
    UnknownTool { name: String },
    #[error("Unknown resource `{uri}`")]
    UnknownResource { uri: String },
    #[error("Unknown prompt `{name}`")]
    UnknownPrompt { name: String },
    #[error("Invalid arguments for `{target}`: {}", violations.join("; "))]
    InvalidArguments {
        target: String,
        violations: Vec<String>,
    },
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("{message}")]
    Internal { message: String },
    /// Already converted into protocol error data by the error-handling middleware.
    #[error("{}", .0.message)]
    Protocol(ErrorData),
}

impl From<BackendError> for CapabilityError {
    fn from(value: BackendError) -> Self {
        CapabilityError::Tool(ToolError::Backend(value))
    }
}

impl CapabilityError {
    /// Stable short label used for logging and error statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            CapabilityError::UnknownTool { .. } => "unknown_tool",
            CapabilityError::UnknownResource { .. } => "unknown_resource",
            CapabilityError::UnknownPrompt { .. } => "unknown_prompt",
            CapabilityError::InvalidArguments { .. } => "invalid_arguments",
            CapabilityError::Tool(ToolError::Backend(_)) => "backend",
            CapabilityError::Tool(_) => "tool",
            CapabilityError::Internal { .. } => "internal",
            CapabilityError::Protocol(_) => "protocol",
        }
    }

    /// Convert into structured MCP error data.
    pub fn into_error_data(self, include_traceback: bool) -> ErrorData {
        let traceback = include_traceback.then(|| error_chain(&self));
        let (descriptor, details, retryable) = match &self {
            CapabilityError::Protocol(data) => return data.clone(),
            CapabilityError::UnknownTool { name } => {
                (&UNKNOWN_TOOL_ERROR, json!({ "tool": name }), false)
            }
            CapabilityError::UnknownResource { uri } => {
                (&UNKNOWN_RESOURCE_ERROR, json!({ "uri": uri }), false)
            }
            CapabilityError::UnknownPrompt { name } => {
                (&UNKNOWN_PROMPT_ERROR, json!({ "prompt": name }), false)
            }
            CapabilityError::InvalidArguments { target, violations } => (
                &INVALID_ARGUMENTS_ERROR,
                json!({ "target": target, "violations": violations }),
                false,
            ),
            CapabilityError::Tool(ToolError::Backend(err)) => match err {
                BackendError::Unavailable => (
                    &BACKEND_UNAVAILABLE_ERROR,
                    json!({ "details": err.to_string() }),
                    false,
                ),
                BackendError::Timeout { duration_secs } => (
                    &BACKEND_TIMEOUT_ERROR,
                    json!({ "duration_secs": duration_secs }),
                    true,
                ),
                _ => (
                    &BACKEND_FAILED_ERROR,
                    json!({ "details": err.to_string() }),
                    true,
                ),
            },
            CapabilityError::Tool(ToolError::ModelNotFound { model, dir }) => (
                &MODEL_NOT_FOUND_ERROR,
                json!({ "model": model, "models_dir": dir.to_string_lossy() }),
                false,
            ),
            CapabilityError::Tool(err @ ToolError::Config(_))
            | CapabilityError::Tool(err @ ToolError::Io { .. }) => (
                &INTERNAL_ERROR,
                json!({ "details": err.to_string() }),
                true,
            ),
            CapabilityError::Tool(err) => (
                &INVALID_TOOL_INPUT_ERROR,
                json!({ "details": err.to_string() }),
                false,
            ),
            CapabilityError::Internal { message } => {
                (&INTERNAL_ERROR, json!({ "details": message }), true)
            }
        };

        let mut builder = descriptor
            .builder()
            .retryable(retryable)
            .details(details)
            .message(self.to_string());
        if let Some(traceback) = traceback {
            builder = builder.with_context_field("traceback", json!(traceback));
        }
        builder.build().unwrap_or_else(|err| ErrorData::internal_error(err.to_string(), None))
    }

    /// Convert into MCP error data without the structured payload.
    pub fn into_plain_error_data(self) -> ErrorData {
        let message = self.to_string();
        let code = match &self {
            CapabilityError::Protocol(data) => return data.clone(),
            CapabilityError::UnknownResource { .. } => ErrorCode::RESOURCE_NOT_FOUND,
            CapabilityError::UnknownTool { .. }
            | CapabilityError::UnknownPrompt { .. }
            | CapabilityError::InvalidArguments { .. } => ErrorCode::INVALID_PARAMS,
            CapabilityError::Tool(_) | CapabilityError::Internal { .. } => {
                ErrorCode::INTERNAL_ERROR
            }
        };
        ErrorData::new(code, message, None)
    }
}

/// Render an error and its `source()` chain, outermost first.
pub fn error_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}

/// Structured error metadata returned by MCP capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorDescriptor {
    /// Error code.
    pub code: &'static str,
    /// User-facing message.
    pub message: &'static str,
    /// Recommended remediation.
    pub remediation: &'static str,
    /// JSON-RPC error code.
    #[serde(skip)]
    pub rpc_code: ErrorCode,
}

impl ToolErrorDescriptor {
    /// Descriptor reported as `invalid_params`.
    pub const fn new(code: &'static str, message: &'static str, remediation: &'static str) -> Self {
        Self::with_rpc_code(code, message, remediation, ErrorCode::INVALID_PARAMS)
    }

    pub const fn with_rpc_code(
        code: &'static str,
        message: &'static str,
        remediation: &'static str,
        rpc_code: ErrorCode,
    ) -> Self {
        Self {
            code,
            message,
            remediation,
            rpc_code,
        }
    }

    /// Create a builder.
    pub fn builder(&self) -> ToolErrorDescriptorBuilder<'_> {
        ToolErrorDescriptorBuilder::new(self)
    }
}

/// Builder for error data that fails if required fields are missing.
pub struct ToolErrorDescriptorBuilder<'a> {
    descriptor: &'a ToolErrorDescriptor,
    message: Option<String>,
    retryable: Option<bool>,
    details: Option<Value>,
    extra_fields: Map<String, Value>,
}

impl<'a> ToolErrorDescriptorBuilder<'a> {
    pub fn new(descriptor: &'a ToolErrorDescriptor) -> Self {
        Self {
            descriptor,
            message: None,
            retryable: None,
            details: None,
            extra_fields: Map::new(),
        }
    }

    /// Override the descriptor's generic message with a specific one.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_context_field(mut self, key: &str, value: Value) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Result<ErrorData, ToolErrorBuilderError> {
        if self.descriptor.remediation.trim().is_empty() {
            return Err(ToolErrorBuilderError::MissingRemediation {
                code: self.descriptor.code,
            });
        }
        let retryable = self
            .retryable
            .ok_or(ToolErrorBuilderError::MissingRetryable {
                code: self.descriptor.code,
            })?;

        let mut data = Map::new();
        data.insert("code".into(), Value::String(self.descriptor.code.into()));
        data.insert(
            "remediation".into(),
            Value::String(self.descriptor.remediation.into()),
        );
        data.insert("retryable".into(), Value::Bool(retryable));
        if let Some(details) = self.details {
            data.insert("details".into(), details);
        }
        for (key, value) in self.extra_fields {
            data.insert(key, value);
        }

        let message = self
            .message
            .unwrap_or_else(|| self.descriptor.message.to_string());
        Ok(ErrorData::new(
            self.descriptor.rpc_code,
            message,
            Some(Value::Object(data)),
        ))
    }
}

/// Errors when required builder fields are missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolErrorBuilderError {
    #[error("retryable is missing (code={code})")]
    MissingRetryable { code: &'static str },
    #[error("remediation is empty (code={code})")]
    MissingRemediation { code: &'static str },
}

pub const UNKNOWN_TOOL_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "unknown_tool",
    "The requested tool is not registered",
    "Call tools/list and use one of the advertised tool names.",
);

pub const UNKNOWN_RESOURCE_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::with_rpc_code(
    "unknown_resource",
    "The requested resource is not registered",
    "Call resources/list and use one of the advertised URIs.",
    ErrorCode::RESOURCE_NOT_FOUND,
);

pub const UNKNOWN_PROMPT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "unknown_prompt",
    "The requested prompt is not registered",
    "Call prompts/list and use one of the advertised prompt names.",
);

pub const INVALID_ARGUMENTS_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "invalid_arguments",
    "Arguments do not match the capability's input schema",
    "Fix every listed violation and retry; parameter paths are JSON pointers.",
);

pub const INVALID_TOOL_INPUT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "invalid_request",
    "The tool request is invalid",
    "Use full paths to existing files and check numeric ranges.",
);

pub const MODEL_NOT_FOUND_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::new(
    "model_not_found",
    "The requested model is not installed",
    "Run `imagesorcery-mcp --post-install` and place the model file in the models directory.",
);

pub const BACKEND_UNAVAILABLE_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::with_rpc_code(
    "backend_unavailable",
    "No image backend is configured",
    "Set [backend].program in config.toml to the image processing executable.",
    ErrorCode::INTERNAL_ERROR,
);

pub const BACKEND_TIMEOUT_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::with_rpc_code(
    "timeout",
    "The image backend exceeded backend.timeout_secs",
    "Use a smaller image or increase backend.timeout_secs.",
    ErrorCode::INTERNAL_ERROR,
);

pub const BACKEND_FAILED_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::with_rpc_code(
    "backend_failed",
    "The image backend exited with an error",
    "Review the details and the backend logs, then retry.",
    ErrorCode::INTERNAL_ERROR,
);

pub const INTERNAL_ERROR: ToolErrorDescriptor = ToolErrorDescriptor::with_rpc_code(
    "internal_error",
    "Internal server error",
    "Retry the request; check the server logs if the error persists.",
    ErrorCode::INTERNAL_ERROR,
);
