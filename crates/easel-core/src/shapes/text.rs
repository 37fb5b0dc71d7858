//! Text node.

use super::{NodeId, NodeKind, NodeTrait, ParseError, SerializableColor};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use uuid::Uuid;

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
}

impl FontStyle {
    /// Keyword used by the style selector.
    pub fn as_str(&self) -> &'static str {
        match self {
            FontStyle::Normal => "normal",
            FontStyle::Bold => "bold",
            FontStyle::Italic => "italic",
        }
    }

    /// Get display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            FontStyle::Normal => "Normal",
            FontStyle::Bold => "Bold",
            FontStyle::Italic => "Italic",
        }
    }

    /// Get all available font styles.
    pub fn all() -> &'static [FontStyle] {
        &[FontStyle::Normal, FontStyle::Bold, FontStyle::Italic]
    }
}

impl FromStr for FontStyle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(FontStyle::Normal),
            "bold" => Ok(FontStyle::Bold),
            "italic" => Ok(FontStyle::Italic),
            _ => Err(ParseError::InvalidFontStyle(s.to_string())),
        }
    }
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text node.
#[derive(Debug)]
pub struct TextNode {
    pub(crate) id: NodeId,
    /// Position (top-left corner of text bounding box).
    pub position: Point,
    content: String,
    /// Font size in pixels.
    pub font_size: f64,
    fill: SerializableColor,
    font_style: FontStyle,
    /// Scale applied by the selection handle. Text never folds it back into the font size.
    pub scale: Vec2,
    pub draggable: bool,
    /// Layout size (width, height) reported by the renderer.
    /// If None, approximate bounds are used.
    cached_size: RwLock<Option<(f64, f64)>>,
}

impl Clone for TextNode {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            position: self.position,
            content: self.content.clone(),
            font_size: self.font_size,
            fill: self.fill,
            font_style: self.font_style,
            scale: self.scale,
            draggable: self.draggable,
            cached_size: RwLock::new(self.cached_size.read().ok().and_then(|guard| *guard)),
        }
    }
}

impl TextNode {
    pub const DEFAULT_FONT_SIZE: f64 = 30.0;

    /// Create a draggable text node with default styling.
    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content: content.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            fill: SerializableColor::black(),
            font_style: FontStyle::Normal,
            scale: Vec2::new(1.0, 1.0),
            draggable: true,
            cached_size: RwLock::new(None),
        }
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_fill(mut self, fill: SerializableColor) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_font_style(mut self, style: FontStyle) -> Self {
        self.font_style = style;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.invalidate_cache();
    }

    pub fn fill(&self) -> SerializableColor {
        self.fill
    }

    pub fn set_fill(&mut self, fill: SerializableColor) {
        self.fill = fill;
    }

    pub fn font_style(&self) -> FontStyle {
        self.font_style
    }

    pub fn set_font_style(&mut self, style: FontStyle) {
        if self.font_style != style {
            self.font_style = style;
            self.invalidate_cache();
        }
    }

    /// Set the cached layout size (computed by the renderer).
    /// Uses interior mutability so this can be called during rendering.
    pub fn set_cached_size(&self, width: f64, height: f64) {
        if let Ok(mut cache) = self.cached_size.write() {
            *cache = Some((width, height));
        }
    }

    /// Clear the cached size (call when text properties change).
    pub fn invalidate_cache(&self) {
        if let Ok(mut cache) = self.cached_size.write() {
            *cache = None;
        }
    }

    fn approximate_width(&self) -> f64 {
        let max_line_len = self
            .content
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);

        let char_width_factor = match self.font_style {
            FontStyle::Normal => 0.55,
            FontStyle::Bold => 0.6,
            FontStyle::Italic => 0.52,
        };

        max_line_len as f64 * self.font_size * char_width_factor
    }

    fn approximate_height(&self) -> f64 {
        let line_count = self.content.lines().count().max(1);
        let line_count = if self.content.ends_with('\n') {
            line_count + 1
        } else {
            line_count
        };
        line_count as f64 * self.font_size * 1.2
    }
}

impl NodeTrait for TextNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Text
    }

    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    fn base_size(&self) -> Size {
        let (width, height) = self
            .cached_size
            .read()
            .ok()
            .and_then(|guard| *guard)
            .unwrap_or_else(|| (self.approximate_width(), self.approximate_height()));
        Size::new(width, height)
    }

    fn scale(&self) -> Vec2 {
        self.scale
    }

    fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
    }

    fn is_draggable(&self) -> bool {
        self.draggable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    #[test]
    fn test_text_defaults() {
        let text = TextNode::new(Point::new(150.0, 150.0), "Editable Text");
        assert_eq!(text.content(), "Editable Text");
        assert!((text.font_size - 30.0).abs() < f64::EPSILON);
        assert_eq!(text.fill(), SerializableColor::black());
        assert_eq!(text.font_style(), FontStyle::Normal);
        assert!(text.is_draggable());
        assert_eq!(text.scale(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_font_style_parse() {
        assert_eq!("bold".parse::<FontStyle>().unwrap(), FontStyle::Bold);
        assert_eq!(" Italic ".parse::<FontStyle>().unwrap(), FontStyle::Italic);
        assert_eq!(
            "oblique".parse::<FontStyle>(),
            Err(ParseError::InvalidFontStyle("oblique".to_string()))
        );
    }

    #[test]
    fn test_cached_size_drives_bounds() {
        let text = TextNode::new(Point::new(10.0, 20.0), "Hello");
        text.set_cached_size(80.0, 36.0);
        assert_eq!(text.bounds(), Rect::new(10.0, 20.0, 90.0, 56.0));
    }

    #[test]
    fn test_set_content_invalidates_cache() {
        let mut text = TextNode::new(Point::ZERO, "Hi");
        text.set_cached_size(500.0, 500.0);
        text.set_content("Hi");
        assert!(text.bounds().width() < 500.0);
    }

    #[test]
    fn test_scale_multiplies_bounds() {
        let mut text = TextNode::new(Point::ZERO, "Hello");
        text.set_cached_size(100.0, 40.0);
        text.set_scale(Vec2::new(2.0, 0.5));
        let bounds = text.bounds();
        assert!((bounds.width() - 200.0).abs() < f64::EPSILON);
        assert!((bounds.height() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_box_sets_scale() {
        let mut text = TextNode::new(Point::ZERO, "Hello");
        text.set_cached_size(100.0, 40.0);
        text.apply_box(Rect::new(5.0, 5.0, 155.0, 85.0));
        assert_eq!(text.position, Point::new(5.0, 5.0));
        assert!((text.scale.x - 1.5).abs() < 1e-9);
        assert!((text.scale.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_clone_keeps_cached_size() {
        let text = TextNode::new(Point::ZERO, "Hello");
        text.set_cached_size(42.0, 36.0);
        let cloned = text.clone();
        assert_eq!(cloned.id(), text.id());
        assert!((cloned.bounds().width() - 42.0).abs() < f64::EPSILON);
    }
}
