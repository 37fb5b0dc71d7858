//! Node definitions for the scene graph.

mod image;
mod text;
mod video;

pub use self::image::ImageNode;
pub use text::{FontStyle, TextNode};
pub use video::VideoNode;

use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for nodes.
pub type NodeId = Uuid;

/// Errors produced when parsing user-supplied style values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid color: {0:?}")]
    InvalidColor(String),
    #[error("invalid font style: {0:?} (expected normal, bold or italic)")]
    InvalidFontStyle(String),
}

/// Serializable color representation (RGBA8).
///
/// Serialized as a `#rrggbb` / `#rrggbbaa` string so config files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS-ish color: `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic named color.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        let invalid = || ParseError::InvalidColor(input.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
            return match hex.len() {
                3 => {
                    let mut out = [0u8; 3];
                    for (i, c) in hex.chars().enumerate() {
                        let v = channel(&c.to_string())?;
                        out[i] = v * 17;
                    }
                    Ok(Self::new(out[0], out[1], out[2], 255))
                }
                6 => Ok(Self::new(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                    255,
                )),
                8 => Ok(Self::new(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                    channel(&hex[6..8])?,
                )),
                _ => Err(invalid()),
            };
        }

        let named = match trimmed.to_ascii_lowercase().as_str() {
            "black" => Self::black(),
            "white" => Self::white(),
            "transparent" => Self::transparent(),
            "red" => Self::new(255, 0, 0, 255),
            "green" => Self::new(0, 128, 0, 255),
            "lime" => Self::new(0, 255, 0, 255),
            "blue" => Self::new(0, 0, 255, 255),
            "yellow" => Self::new(255, 255, 0, 255),
            "orange" => Self::new(255, 165, 0, 255),
            "purple" => Self::new(128, 0, 128, 255),
            "gray" | "grey" => Self::new(128, 128, 128, 255),
            _ => return Err(invalid()),
        };
        Ok(named)
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl FromStr for SerializableColor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// The kind of content a node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Text,
    Image,
    Video,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Text => "text",
            NodeKind::Image => "image",
            NodeKind::Video => "video",
        }
    }
}

/// Common behaviour of every scene node.
///
/// A node's on-screen box is its unscaled size multiplied by its scale,
/// anchored at `position` (top-left).
pub trait NodeTrait {
    /// Get the unique identifier.
    fn id(&self) -> NodeId;

    fn kind(&self) -> NodeKind;

    /// Top-left corner in canvas coordinates.
    fn position(&self) -> Point;

    fn set_position(&mut self, position: Point);

    /// Size before scale is applied.
    fn base_size(&self) -> Size;

    fn scale(&self) -> Vec2;

    fn set_scale(&mut self, scale: Vec2);

    fn is_draggable(&self) -> bool;

    /// Get the bounding box in canvas coordinates.
    fn bounds(&self) -> Rect {
        scaled_rect(self.position(), self.base_size(), self.scale())
    }

    /// Check if a point hits this node.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    /// Move by a canvas-space offset.
    fn translate(&mut self, delta: Vec2) {
        let position = self.position();
        self.set_position(position + delta);
    }

    /// Place the node so that its bounds become `rect`, by adjusting position and scale.
    fn apply_box(&mut self, rect: Rect) {
        self.set_position(rect.origin());
        self.set_scale(scale_for_box(self.base_size(), rect));
    }
}

/// Rectangle covering `size * scale` at `position`.
pub(crate) fn scaled_rect(position: Point, size: Size, scale: Vec2) -> Rect {
    Rect::from_origin_size(
        position,
        Size::new(size.width * scale.x, size.height * scale.y),
    )
}

/// Scale that maps `base` onto the size of `rect`. Degenerate axes keep a scale of 1.
pub(crate) fn scale_for_box(base: Size, rect: Rect) -> Vec2 {
    let axis = |base: f64, target: f64| {
        if base.abs() < f64::EPSILON {
            1.0
        } else {
            target / base
        }
    };
    Vec2::new(
        axis(base.width, rect.width()),
        axis(base.height, rect.height()),
    )
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub enum Node {
    Text(TextNode),
    Image(ImageNode),
    Video(VideoNode),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Text(n) => n.id(),
            Node::Image(n) => n.id(),
            Node::Video(n) => n.id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Text(n) => n.kind(),
            Node::Image(n) => n.kind(),
            Node::Video(n) => n.kind(),
        }
    }

    pub fn position(&self) -> Point {
        match self {
            Node::Text(n) => n.position(),
            Node::Image(n) => n.position(),
            Node::Video(n) => n.position(),
        }
    }

    pub fn set_position(&mut self, position: Point) {
        match self {
            Node::Text(n) => n.set_position(position),
            Node::Image(n) => n.set_position(position),
            Node::Video(n) => n.set_position(position),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Node::Text(n) => n.bounds(),
            Node::Image(n) => n.bounds(),
            Node::Video(n) => n.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Node::Text(n) => n.hit_test(point, tolerance),
            Node::Image(n) => n.hit_test(point, tolerance),
            Node::Video(n) => n.hit_test(point, tolerance),
        }
    }

    pub fn is_draggable(&self) -> bool {
        match self {
            Node::Text(n) => n.is_draggable(),
            Node::Image(n) => n.is_draggable(),
            Node::Video(n) => n.is_draggable(),
        }
    }

    pub fn apply_box(&mut self, rect: Rect) {
        match self {
            Node::Text(n) => n.apply_box(rect),
            Node::Image(n) => n.apply_box(rect),
            Node::Video(n) => n.apply_box(rect),
        }
    }

    /// Finish a resize gesture.
    ///
    /// Raster nodes fold their scale into width/height so the scale returns to 1.
    /// Text keeps the scale it was given.
    pub fn commit_resize(&mut self) {
        match self {
            Node::Text(_) => {}
            Node::Image(n) => n.normalize_scale(),
            Node::Video(n) => n.normalize_scale(),
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextNode> {
        match self {
            Node::Text(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageNode> {
        match self {
            Node::Image(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoNode> {
        match self {
            Node::Video(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_video_mut(&mut self) -> Option<&mut VideoNode> {
        match self {
            Node::Video(n) => Some(n),
            _ => None,
        }
    }
}

/// Fold a scale into raster dimensions, returning the new `(width, height)`.
pub(crate) fn fold_scale(width: f64, height: f64, scale: Vec2) -> (f64, f64) {
    (width * scale.x, height * scale.y)
}
