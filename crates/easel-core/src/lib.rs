//! Easel Core Library
//!
//! Platform-agnostic scene graph, selection handle and editing logic for the
//! Easel canvas editor.

pub mod bitmap;
pub mod bridge;
pub mod config;
pub mod editor;
pub mod render_loop;
pub mod scene;
pub mod selection;
pub mod shapes;
pub mod video;

pub use bitmap::{Bitmap, DecodeError};
pub use bridge::{BridgeError, Direction, ImageFile, InputBridge, UiAction};
pub use config::{ConfigError, EditorConfig};
pub use editor::{Editor, EditorError, TextDefaults};
pub use render_loop::{FrameControl, Redraw, RedrawQueue, StreamState};
pub use scene::Scene;
pub use selection::{Anchor, SelectionHandle, TransformKind, TransformSession};
pub use shapes::{
    FontStyle, ImageNode, Node, NodeId, NodeKind, NodeTrait, ParseError, SerializableColor,
    TextNode, VideoNode,
};
pub use video::{
    FrameSequence, FrameSequenceFactory, NoVideo, ReadyState, VideoError, VideoSource,
    VideoSourceFactory,
};
