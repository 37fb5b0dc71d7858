//! Maps control-panel events onto editor mutations.

use crate::bitmap::{Bitmap, DecodeError};
use crate::editor::{Editor, EditorError};
use crate::shapes::{FontStyle, ParseError, SerializableColor};
use crate::video::{VideoError, VideoSourceFactory};
use kurbo::Vec2;
use thiserror::Error;

/// Errors surfaced to the control panel.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Video(#[from] VideoError),
}

/// A file picked through the image input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Arrow-button directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn all() -> &'static [Direction] {
        &[Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }

    /// Offset for one press, `step` units long. Canvas y grows downward.
    pub fn delta(self, step: f64) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -step),
            Direction::Down => Vec2::new(0.0, step),
            Direction::Left => Vec2::new(-step, 0.0),
            Direction::Right => Vec2::new(step, 0.0),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Direction::Up => "⬆",
            Direction::Down => "⬇",
            Direction::Left => "⬅",
            Direction::Right => "➡",
        }
    }
}

/// One event from the control panel.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// The file input changed. `None` when the selection was cleared.
    ImageFile(Option<ImageFile>),
    SetText(String),
    SetColor(String),
    SetFontStyle(String),
    AddText,
    RemoveText,
    RemoveImages,
    AddVideo,
    TogglePlayback,
    RemoveVideo,
    Move(Direction),
}

/// Applies [`UiAction`]s to an [`Editor`], opening videos through a platform factory.
pub struct InputBridge {
    video_sources: Box<dyn VideoSourceFactory>,
}

impl InputBridge {
    pub fn new(video_sources: impl VideoSourceFactory + 'static) -> Self {
        Self {
            video_sources: Box::new(video_sources),
        }
    }

    /// Apply one action. Failed actions leave the editor untouched.
    pub fn handle(&self, editor: &mut Editor, action: UiAction) -> Result<(), BridgeError> {
        match action {
            UiAction::ImageFile(None) => {
                log::debug!("Image input cleared");
            }
            UiAction::ImageFile(Some(file)) => {
                let bitmap = Bitmap::decode(&file.bytes)?;
                log::info!(
                    "Loaded {} ({}x{})",
                    file.name,
                    bitmap.width(),
                    bitmap.height()
                );
                editor.add_image(bitmap);
            }
            UiAction::SetText(content) => editor.set_text_content(&content),
            UiAction::SetColor(value) => {
                let color = SerializableColor::parse(&value)?;
                editor.set_fill(color);
            }
            UiAction::SetFontStyle(value) => {
                let style: FontStyle = value.parse()?;
                editor.set_font_style(style);
            }
            UiAction::AddText => {
                let content = editor.config().new_text.clone();
                editor.add_text(content);
            }
            UiAction::RemoveText => {
                editor.remove_all_text();
            }
            UiAction::RemoveImages => {
                editor.remove_all_images();
            }
            UiAction::AddVideo => {
                if editor.is_streaming() {
                    return Err(EditorError::VideoAlreadyAttached.into());
                }
                let url = editor.config().video_url.clone();
                let source = self.video_sources.open(&url)?;
                editor.add_video(source)?;
            }
            UiAction::TogglePlayback => {
                if editor.toggle_playback().is_none() {
                    log::debug!("Play/Pause ignored: no video attached");
                }
            }
            UiAction::RemoveVideo => {
                editor.remove_video();
            }
            UiAction::Move(direction) => {
                let step = editor.config().move_step;
                editor.move_text_nodes(direction.delta(step));
            }
        }
        Ok(())
    }
}
