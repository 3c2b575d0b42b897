use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use imagesize::ImageType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{common::require_input, register_native_tool, NativeTool};
use crate::{
    lib::{
        errors::{CapabilityError, ToolError},
        BoxFuture,
    },
    server::{
        registry::{CapabilityContext, RegistryError},
        runtime::ServerBuilder,
    },
};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetMetainfoRequest {
    /// Full path to the input image.
    pub input_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetainfo {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_kb: f64,
    pub size_mb: f64,
    /// Detected from the file header, falling back to the extension.
    pub format: Option<String>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
}

pub struct GetMetainfoTool;

impl NativeTool for GetMetainfoTool {
    const NAME: &'static str = "get_metainfo";
    const DESCRIPTION: &'static str =
        "Return file metadata for an image: name, size, format, dimensions and timestamps";
    type Request = GetMetainfoRequest;

    fn run(
        request: GetMetainfoRequest,
        _ctx: &CapabilityContext,
    ) -> BoxFuture<'_, Result<Value, CapabilityError>> {
        Box::pin(async move {
            let info = read_metainfo(request.input_path)?;
            serde_json::to_value(info).map_err(|err| CapabilityError::Internal {
                message: format!("failed to encode image metadata: {err}"),
            })
        })
    }
}

pub fn read_metainfo(path: PathBuf) -> Result<ImageMetainfo, ToolError> {
    require_input("input_path", &path)?;
    let metadata = fs::metadata(&path).map_err(|source| ToolError::Io {
        path: path.clone(),
        source,
    })?;
    let size_bytes = metadata.len();
    let header = sniff_header(&path);
    let format = header
        .as_ref()
        .map(|(kind, _)| format_name(*kind))
        .or_else(|| {
            path.extension()
                .map(|ext| format_for_extension(&ext.to_string_lossy()))
        });
    let dimensions = header.and_then(|(_, size)| size);
    Ok(ImageMetainfo {
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_bytes,
        size_kb: round2(size_bytes as f64 / 1024.0),
        size_mb: round2(size_bytes as f64 / (1024.0 * 1024.0)),
        format,
        width: dimensions.map(|size| size.width),
        height: dimensions.map(|size| size.height),
        created_at: metadata.created().ok().map(rfc3339),
        modified_at: metadata.modified().ok().map(rfc3339),
        path,
    })
}

/// Image type from the file header, plus dimensions when the header carries them.
fn sniff_header(path: &Path) -> Option<(ImageType, Option<imagesize::ImageSize>)> {
    let mut reader = BufReader::new(File::open(path).ok()?);
    let kind = imagesize::reader_type(&mut reader).ok()?;
    let size = kind.reader_size(&mut reader).ok();
    Some((kind, size))
}

fn format_name(kind: ImageType) -> String {
    match kind {
        ImageType::Jpeg => "JPEG".to_string(),
        ImageType::Png => "PNG".to_string(),
        ImageType::Gif => "GIF".to_string(),
        ImageType::Bmp => "BMP".to_string(),
        ImageType::Tiff => "TIFF".to_string(),
        ImageType::Webp => "WEBP".to_string(),
        ImageType::Heif(_) => "HEIF".to_string(),
        other => format!("{other:?}").to_ascii_uppercase(),
    }
}

fn format_for_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "jpe" => "JPEG".to_string(),
        "tif" | "tiff" => "TIFF".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn register_tool(builder: &mut ServerBuilder) -> Result<(), RegistryError> {
    register_native_tool::<GetMetainfoTool>(builder)
}
