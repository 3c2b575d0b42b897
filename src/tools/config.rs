//! `config` tool: read and change the tool defaults at runtime.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{register_native_tool, NativeTool};
use crate::{
    lib::{
        errors::{CapabilityError, ToolError},
        BoxFuture,
    },
    server::{
        config::{ServerConfig, SettingsError, ToolSettings},
        registry::{CapabilityContext, RegistryError},
        runtime::ServerBuilder,
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfigAction {
    #[default]
    Get,
    Set,
    Reset,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ConfigRequest {
    #[serde(default)]
    pub action: ConfigAction,
    /// Dotted key such as `blur.strength`; omit with `get` to read everything.
    #[serde(default)]
    pub key: Option<String>,
    /// New value for `set`.
    #[serde(default)]
    pub value: Option<Value>,
    /// Also write the change to the config file (`set` and `reset`).
    #[serde(default)]
    pub persist: bool,
}

pub struct ConfigTool;

impl NativeTool for ConfigTool {
    const NAME: &'static str = "config";
    const DESCRIPTION: &'static str =
        "Get, set or reset the default values used by the image tools (e.g. detection.confidence_threshold, blur.strength). Changes apply to this session unless persist is true";
    type Request = ConfigRequest;

    fn run(
        request: ConfigRequest,
        ctx: &CapabilityContext,
    ) -> BoxFuture<'_, Result<Value, CapabilityError>> {
        Box::pin(async move {
            match request.action {
                ConfigAction::Get => {
                    let settings = ctx.settings().await;
                    let value = settings
                        .get(request.key.as_deref())
                        .map_err(settings_error)?;
                    Ok(json!({
                        "action": "get",
                        "key": request.key,
                        "value": value,
                    }))
                }
                ConfigAction::Set => {
                    let (key, value) = match (request.key, request.value) {
                        (Some(key), Some(value)) => (key, value),
                        _ => {
                            return Err(settings_error(SettingsError::InvalidValue {
                                key: "key/value".to_string(),
                                message: "`set` needs both key and value".to_string(),
                            }))
                        }
                    };
                    let mut settings = ctx.settings.write().await;
                    let updated = settings.with_value(&key, value).map_err(settings_error)?;
                    if request.persist {
                        updated
                            .persist_to(&ctx.config_path)
                            .map_err(ToolError::from)?;
                    }
                    *settings = updated;
                    let current = settings.get(Some(&key)).map_err(settings_error)?;
                    info!(
                        target: "imagesorcery::config",
                        key = %key,
                        value = %current,
                        persisted = request.persist,
                        "Tool default updated"
                    );
                    Ok(json!({
                        "action": "set",
                        "key": key,
                        "value": current,
                        "persisted": request.persist,
                    }))
                }
                ConfigAction::Reset => {
                    let reloaded = if ctx.config_path.is_file() {
                        ServerConfig::load(ctx.config_path.clone(), false)
                            .map_err(ToolError::from)?
                            .defaults
                    } else {
                        ToolSettings::default()
                    };
                    if request.persist {
                        reloaded
                            .persist_to(&ctx.config_path)
                            .map_err(ToolError::from)?;
                    }
                    let value = reloaded.get(None).map_err(settings_error)?;
                    *ctx.settings.write().await = reloaded;
                    info!(
                        target: "imagesorcery::config",
                        path = %ctx.config_path.display(),
                        "Tool defaults reset"
                    );
                    Ok(json!({
                        "action": "reset",
                        "value": value,
                        "persisted": request.persist,
                    }))
                }
            }
        })
    }
}

fn settings_error(err: SettingsError) -> CapabilityError {
    CapabilityError::InvalidArguments {
        target: ConfigTool::NAME.to_string(),
        violations: vec![err.to_string()],
    }
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_native_tool::<ConfigTool>(builder)
}
