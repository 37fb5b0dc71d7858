//! Editor configuration loaded from JSON.

use crate::selection::MIN_SIZE;
use crate::shapes::{FontStyle, SerializableColor, TextNode};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the editor. Every field has a default, so partial files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Content of the text node created at startup.
    pub initial_text: String,
    /// Content of nodes created by "Add Text".
    pub new_text: String,
    pub text_origin: Point,
    pub font_size: f64,
    pub fill: SerializableColor,
    pub font_style: FontStyle,
    pub image_origin: Point,
    pub image_size: Size,
    pub video_origin: Point,
    /// Smallest width and height the selection handle accepts.
    pub min_handle_size: f64,
    /// Distance moved by each arrow button.
    pub move_step: f64,
    pub video_url: String,
    /// Frame size requested from the native decoder.
    pub video_decode_size: (u32, u32),
    /// Also detach the video when "Remove Images" is pressed.
    pub remove_images_includes_video: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_text: "Editable Text".to_string(),
            new_text: "New Text".to_string(),
            text_origin: Point::new(150.0, 150.0),
            font_size: TextNode::DEFAULT_FONT_SIZE,
            fill: SerializableColor::black(),
            font_style: FontStyle::Normal,
            image_origin: Point::new(50.0, 50.0),
            image_size: Size::new(200.0, 200.0),
            video_origin: Point::ZERO,
            min_handle_size: MIN_SIZE,
            move_step: 10.0,
            video_url: "https://www.w3schools.com/html/mov_bbb.mp4".to_string(),
            video_decode_size: (640, 360),
            remove_images_includes_video: false,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                log::info!("Loading editor config from {}", path.display());
                Self::from_json(&json)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn min_size(&self) -> Size {
        Size::new(self.min_handle_size, self.min_handle_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.initial_text, "Editable Text");
        assert_eq!(config.new_text, "New Text");
        assert_eq!(config.text_origin, Point::new(150.0, 150.0));
        assert_eq!(config.image_origin, Point::new(50.0, 50.0));
        assert_eq!(config.image_size, Size::new(200.0, 200.0));
        assert!((config.min_handle_size - 30.0).abs() < f64::EPSILON);
        assert!((config.move_step - 10.0).abs() < f64::EPSILON);
        assert!(!config.remove_images_includes_video);
    }

    #[test]
    fn test_partial_json() {
        let config =
            EditorConfig::from_json(r##"{ "move_step": 25.0, "fill": "#ff0000", "font_style": "bold" }"##)
                .unwrap();
        assert!((config.move_step - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.fill, SerializableColor::new(255, 0, 0, 255));
        assert_eq!(config.font_style, FontStyle::Bold);
        assert_eq!(config.new_text, "New Text");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EditorConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EditorConfig::from_json(r#"{ "fill": "nope" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = EditorConfig::default();
        config.remove_images_includes_video = true;
        let json = config.to_json().unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "initial_text": "Hello" }}"#).unwrap();
        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.initial_text, "Hello");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
