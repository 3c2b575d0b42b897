//! Request pieces and checks shared by several image tools.
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::{errors::ToolError, paths};

/// Color in BGR order.
pub type Bgr = [u8; 3];

/// Rectangle or polygon selecting part of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Shape {
    /// Axis-aligned rectangle from the top-left (`x1`, `y1`) to the bottom-right (`x2`, `y2`) corner.
    Rectangle { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// Closed polygon given as `[x, y]` vertices.
    Polygon { polygon: Vec<[i32; 2]> },
}

impl Shape {
    pub fn validate(&self, field: &'static str) -> Result<(), ToolError> {
        match self {
            Shape::Rectangle { x1, y1, x2, y2 } => {
                if x2 <= x1 || y2 <= y1 {
                    return Err(ToolError::InvalidArgument {
                        field,
                        message: format!(
                            "rectangle ({x1},{y1})-({x2},{y2}) must have x2 > x1 and y2 > y1"
                        ),
                    });
                }
                Ok(())
            }
            Shape::Polygon { polygon } => {
                if polygon.len() < 3 {
                    return Err(ToolError::InvalidArgument {
                        field,
                        message: format!(
                            "polygon needs at least 3 points, got {}",
                            polygon.len()
                        ),
                    });
                }
                Ok(())
            }
        }
    }
}

/// How detection geometry is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    #[default]
    Mask,
    Polygon,
}

/// `field` must name an existing file by absolute path.
pub fn require_input(field: &'static str, path: &Path) -> Result<(), ToolError> {
    if !paths::is_nonempty_absolute(path) {
        return Err(ToolError::PathNotAbsolute {
            field,
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(ToolError::FileNotFound {
            field,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Use the requested output path, or derive `<stem>_<suffix>.<ext>` next to the input.
pub fn resolve_output(
    input: &Path,
    output: Option<PathBuf>,
    suffix: &str,
) -> Result<PathBuf, ToolError> {
    match output {
        Some(path) if !paths::is_nonempty_absolute(&path) => Err(ToolError::PathNotAbsolute {
            field: "output_path",
            path,
        }),
        Some(path) => Ok(path),
        None => Ok(paths::derive_output_path(input, suffix)),
    }
}

pub fn check_confidence(value: f64) -> Result<f64, ToolError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ToolError::InvalidArgument {
            field: "confidence",
            message: format!("{value} is outside 0.0..=1.0"),
        })
    }
}

/// Locate a model file inside the models directory.
pub fn resolve_model(models_dir: &Path, model: &str) -> Result<PathBuf, ToolError> {
    let path = models_dir.join(model);
    let escapes = Path::new(model)
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if escapes || !path.is_file() {
        return Err(ToolError::ModelNotFound {
            model: model.to_string(),
            dir: models_dir.to_path_buf(),
        });
    }
    Ok(path)
}

pub fn require_non_empty<T>(field: &'static str, items: &[T]) -> Result<(), ToolError> {
    if items.is_empty() {
        return Err(ToolError::InvalidArgument {
            field,
            message: "at least one entry is required".to_string(),
        });
    }
    Ok(())
}

pub fn require_positive(field: &'static str, value: u32) -> Result<u32, ToolError> {
    if value == 0 {
        return Err(ToolError::InvalidArgument {
            field,
            message: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn shapes_deserialize_from_either_form() {
        let rect: Shape = serde_json::from_value(json!({ "x1": 1, "y1": 2, "x2": 3, "y2": 4 }))
            .expect("rectangle");
        assert!(matches!(rect, Shape::Rectangle { x2: 3, .. }));

        let poly: Shape =
            serde_json::from_value(json!({ "polygon": [[0, 0], [5, 0], [5, 5]] })).expect("polygon");
        assert!(poly.validate("areas").is_ok());
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let rect = Shape::Rectangle {
            x1: 5,
            y1: 0,
            x2: 5,
            y2: 10,
        };
        assert!(rect.validate("areas").is_err());

        let poly = Shape::Polygon {
            polygon: vec![[0, 0], [1, 1]],
        };
        assert!(poly.validate("areas").is_err());
    }

    #[test]
    fn input_must_be_absolute_and_exist() {
        let temp = tempdir().unwrap();
        let err = require_input("input_path", Path::new("relative.png")).unwrap_err();
        assert!(matches!(err, ToolError::PathNotAbsolute { .. }));

        let err = require_input("input_path", &temp.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound { .. }));

        let present = temp.path().join("present.png");
        fs::write(&present, b"x").unwrap();
        assert!(require_input("input_path", &present).is_ok());
    }

    #[test]
    fn relative_output_path_is_rejected() {
        let err = resolve_output(
            Path::new("/data/a.png"),
            Some(PathBuf::from("out.png")),
            "blurred",
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::PathNotAbsolute { field: "output_path", .. }));
    }

    #[test]
    fn models_outside_the_directory_are_not_found() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("yolo.pt"), b"w").unwrap();

        assert!(resolve_model(temp.path(), "yolo.pt").is_ok());
        assert!(matches!(
            resolve_model(temp.path(), "../yolo.pt"),
            Err(ToolError::ModelNotFound { .. })
        ));
        assert!(matches!(
            resolve_model(temp.path(), "other.pt"),
            Err(ToolError::ModelNotFound { .. })
        ));
    }
}
