use serde::Deserialize;

/// Settings for the telemetry and error-handling middlewares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiddlewareConfig {
    pub telemetry_enabled: bool,
    pub include_traceback: bool,
    pub transform_errors: bool,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            telemetry_enabled: true,
            include_traceback: true,
            transform_errors: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RawTelemetrySection {
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawErrorsSection {
    pub include_traceback: Option<bool>,
    pub transform_errors: Option<bool>,
}

pub fn parse_middleware_sections(
    telemetry: Option<RawTelemetrySection>,
    errors: Option<RawErrorsSection>,
) -> MiddlewareConfig {
    let defaults = MiddlewareConfig::default();
    let telemetry = telemetry.unwrap_or_default();
    let errors = errors.unwrap_or_default();
    MiddlewareConfig {
        telemetry_enabled: telemetry.enabled.unwrap_or(defaults.telemetry_enabled),
        include_traceback: errors
            .include_traceback
            .unwrap_or(defaults.include_traceback),
        transform_errors: errors.transform_errors.unwrap_or(defaults.transform_errors),
    }
}
