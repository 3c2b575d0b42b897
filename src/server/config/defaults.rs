//! Tool defaults (`[defaults]`), readable and writable at runtime through the `config` tool.

use std::{fs, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::lib::errors::ConfigError;

pub const DEFAULT_DETECTION_MODEL: &str = "yoloe-11l-seg-pf.pt";
pub const DEFAULT_FIND_MODEL: &str = "yoloe-11l-seg.pt";
pub const DEFAULTS_TABLE: &str = "defaults";

/// Interpolation used by `resize`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    Area,
    Cubic,
    Lanczos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionSettings {
    pub confidence_threshold: f64,
    pub default_model: String,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            default_model: DEFAULT_DETECTION_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct FindSettings {
    pub confidence_threshold: f64,
    pub default_model: String,
}

impl Default for FindSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            default_model: DEFAULT_FIND_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct BlurSettings {
    pub strength: u32,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self { strength: 15 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct TextSettings {
    pub font_scale: f64,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self { font_scale: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct DrawingSettings {
    /// BGR color.
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for DrawingSettings {
    fn default() -> Self {
        Self {
            color: [0, 0, 0],
            thickness: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct OcrSettings {
    pub language: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeSettings {
    pub interpolation: Interpolation,
}

/// Defaults applied by tools when a request omits an optional parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub detection: DetectionSettings,
    pub find: FindSettings,
    pub blur: BlurSettings,
    pub text: TextSettings,
    pub drawing: DrawingSettings,
    pub ocr: OcrSettings,
    pub resize: ResizeSettings,
}

/// Errors while reading or updating tool settings by key.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Unknown configuration key `{key}`")]
    UnknownKey { key: String },
    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },
}

impl ToolSettings {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_confidence(
            "detection.confidence_threshold",
            self.detection.confidence_threshold,
        )?;
        check_confidence("find.confidence_threshold", self.find.confidence_threshold)?;
        check_non_blank("detection.default_model", &self.detection.default_model)?;
        check_non_blank("find.default_model", &self.find.default_model)?;
        check_non_blank("ocr.language", &self.ocr.language)?;
        if self.blur.strength == 0 {
            return Err(invalid("blur.strength", "must be at least 1"));
        }
        if self.drawing.thickness == 0 {
            return Err(invalid("drawing.thickness", "must be at least 1"));
        }
        if !(self.text.font_scale.is_finite() && self.text.font_scale > 0.0) {
            return Err(invalid("text.font_scale", "must be greater than 0"));
        }
        Ok(())
    }

    /// Read one dotted key (e.g. `blur.strength`), or everything when `key` is `None`.
    pub fn get(&self, key: Option<&str>) -> Result<Value, SettingsError> {
        let document = self.to_json();
        match key {
            None => Ok(document),
            Some(key) => document
                .pointer(&key_to_pointer(key))
                .cloned()
                .ok_or_else(|| SettingsError::UnknownKey {
                    key: key.to_string(),
                }),
        }
    }

    /// Return a copy with `key` replaced by `value`, validated.
    pub fn with_value(&self, key: &str, value: Value) -> Result<Self, SettingsError> {
        let mut document = self.to_json();
        let slot =
            document
                .pointer_mut(&key_to_pointer(key))
                .ok_or_else(|| SettingsError::UnknownKey {
                    key: key.to_string(),
                })?;
        *slot = value;
        let updated: Self =
            serde_json::from_value(document).map_err(|err| SettingsError::InvalidValue {
                key: key.to_string(),
                message: err.to_string(),
            })?;
        updated.validate()?;
        Ok(updated)
    }

    /// Write these settings as the `[defaults]` table of the TOML file at `path`,
    /// keeping every other table intact.
    pub fn persist_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |message: String| ConfigError::Write {
            path: path.to_path_buf(),
            message,
        };
        let mut document = if path.exists() {
            let raw = fs::read_to_string(path).map_err(|err| write_error(err.to_string()))?;
            raw.parse::<toml::Table>()
                .map_err(|err| write_error(err.to_string()))?
        } else {
            toml::Table::new()
        };
        let defaults = toml::Value::try_from(self).map_err(|err| write_error(err.to_string()))?;
        document.insert(DEFAULTS_TABLE.to_string(), defaults);
        let rendered =
            toml::to_string_pretty(&document).map_err(|err| write_error(err.to_string()))?;
        fs::write(path, rendered).map_err(|err| write_error(err.to_string()))
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn key_to_pointer(key: &str) -> String {
    key.split('.')
        .filter(|segment| !segment.is_empty())
        .fold(String::new(), |mut pointer, segment| {
            pointer.push('/');
            pointer.push_str(segment);
            pointer
        })
}

fn check_confidence(key: &str, value: f64) -> Result<(), SettingsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, "must be between 0.0 and 1.0"))
    }
}

fn check_non_blank(key: &str, value: &str) -> Result<(), SettingsError> {
    if value.trim().is_empty() {
        Err(invalid(key, "must not be blank"))
    } else {
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
