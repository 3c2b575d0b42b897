//! File utilities for provisioning and the models resource.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Extensions recognised as model weights.
pub const MODEL_EXTENSIONS: &[&str] = &["pt", "onnx", "pth", "bin"];

/// File write status for `write_file_if_missing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileWriteStatus {
    Written,
    SkippedExisting,
}

/// A model file discovered under the models directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    /// Path relative to the models directory, `/`-separated.
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Write `content` to `path` unless the file already exists (or `force` is set).
///
/// Parent directories are created as needed.
pub fn write_file_if_missing(
    path: &Path,
    content: &str,
    force: bool,
) -> Result<FileWriteStatus, io::Error> {
    if path.exists() && !force {
        return Ok(FileWriteStatus::SkippedExisting);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(FileWriteStatus::Written)
}

/// Recursively list model files under `root`, sorted by name.
///
/// A missing directory yields an empty list.
pub fn scan_model_files(root: &Path) -> Result<Vec<ModelFile>, io::Error> {
    let mut models = Vec::new();
    if !root.is_dir() {
        return Ok(models);
    }
    collect_models(root, root, &mut models)?;
    models.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(models)
}

fn collect_models(root: &Path, dir: &Path, out: &mut Vec<ModelFile>) -> Result<(), io::Error> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_models(root, &path, out)?;
            continue;
        }
        let is_model = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| MODEL_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_model {
            continue;
        }
        let name = path
            .strip_prefix(root)
            .unwrap_or(path.as_path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        out.push(ModelFile {
            name,
            size_bytes: entry.metadata()?.len(),
            path,
        });
    }
    Ok(())
}
