//! Video node: an image-like node whose pixels are replaced by decoded frames.

use super::{NodeId, NodeKind, NodeTrait, fold_scale};
use crate::bitmap::Bitmap;
use kurbo::{Point, Size, Vec2};
use uuid::Uuid;

/// A draggable node showing the latest frame copied from a video source.
#[derive(Debug, Clone)]
pub struct VideoNode {
    pub(crate) id: NodeId,
    pub position: Point,
    /// Display width. Zero until the first frame arrives.
    pub width: f64,
    /// Display height. Zero until the first frame arrives.
    pub height: f64,
    pub scale: Vec2,
    pub draggable: bool,
    source_url: String,
    frame: Option<Bitmap>,
}

impl VideoNode {
    pub fn new(position: Point, source_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width: 0.0,
            height: 0.0,
            scale: Vec2::new(1.0, 1.0),
            draggable: true,
            source_url: source_url.into(),
            frame: None,
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The most recently copied frame.
    pub fn frame(&self) -> Option<&Bitmap> {
        self.frame.as_ref()
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    pub fn set_frame(&mut self, frame: Bitmap) {
        self.frame = Some(frame);
    }

    /// Size the node to cover `viewport`.
    pub fn fit_to(&mut self, viewport: Size) {
        self.width = viewport.width;
        self.height = viewport.height;
        self.scale = Vec2::new(1.0, 1.0);
    }

    /// Fold the current scale into width/height and reset the scale to 1.
    pub fn normalize_scale(&mut self) {
        let (width, height) = fold_scale(self.width, self.height, self.scale);
        self.width = width;
        self.height = height;
        self.scale = Vec2::new(1.0, 1.0);
    }
}

impl NodeTrait for VideoNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Video
    }

    fn position(&self) -> Point {
        self.position
    }

    fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    fn base_size(&self) -> Size {
        Size::new(self.width, self.height)
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
    use crate::shapes::SerializableColor;
    use kurbo::Rect;

    #[test]
    fn test_new_video_is_empty() {
        let video = VideoNode::new(Point::ZERO, "clip.mp4");
        assert_eq!(video.source_url(), "clip.mp4");
        assert!(!video.has_frame());
        assert_eq!(video.bounds(), Rect::ZERO);
    }

    #[test]
    fn test_fit_to_viewport() {
        let mut video = VideoNode::new(Point::ZERO, "clip.mp4");
        video.fit_to(Size::new(800.0, 600.0));
        assert_eq!(video.bounds(), Rect::new(0.0, 0.0, 800.0, 600.0));
    }

    #[test]
    fn test_set_frame() {
        let mut video = VideoNode::new(Point::ZERO, "clip.mp4");
        let frame = Bitmap::solid(2, 2, SerializableColor::black()).unwrap();
        let generation = frame.generation();
        video.set_frame(frame);
        assert_eq!(video.frame().map(Bitmap::generation), Some(generation));
    }

    #[test]
    fn test_normalize_scale() {
        let mut video = VideoNode::new(Point::ZERO, "clip.mp4");
        video.fit_to(Size::new(400.0, 300.0));
        video.scale = Vec2::new(0.5, 0.5);
        video.normalize_scale();
        assert!((video.width - 200.0).abs() < f64::EPSILON);
        assert!((video.height - 150.0).abs() < f64::EPSILON);
        assert_eq!(video.scale, Vec2::new(1.0, 1.0));
    }
}
