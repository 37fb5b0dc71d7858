//! Image node for displaying a decoded raster image.

use super::{NodeId, NodeKind, NodeTrait, fold_scale};
use crate::bitmap::Bitmap;
use kurbo::{Point, Size, Vec2};
use uuid::Uuid;

/// A draggable image node.
#[derive(Debug, Clone)]
pub struct ImageNode {
    pub(crate) id: NodeId,
    /// Top-left corner position.
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Pending scale from an in-progress resize. 1 whenever no gesture is active.
    pub scale: Vec2,
    pub draggable: bool,
    bitmap: Bitmap,
}

impl ImageNode {
    /// Create an image node displayed at the bitmap's natural size.
    pub fn new(position: Point, bitmap: Bitmap) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width: f64::from(bitmap.width()),
            height: f64::from(bitmap.height()),
            scale: Vec2::new(1.0, 1.0),
            draggable: true,
            bitmap,
        }
    }

    /// Create an image node with specific display dimensions.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Fold the current scale into width/height and reset the scale to 1.
    pub fn normalize_scale(&mut self) {
        let (width, height) = fold_scale(self.width, self.height, self.scale);
        self.width = width;
        self.height = height;
        self.scale = Vec2::new(1.0, 1.0);
    }
}

impl NodeTrait for ImageNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Image
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

    fn bitmap() -> Bitmap {
        Bitmap::solid(4, 2, SerializableColor::white()).unwrap()
    }

    #[test]
    fn test_natural_size() {
        let image = ImageNode::new(Point::new(50.0, 50.0), bitmap());
        assert!((image.width - 4.0).abs() < f64::EPSILON);
        assert!((image.height - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_with_size() {
        let image = ImageNode::new(Point::new(50.0, 50.0), bitmap()).with_size(200.0, 200.0);
        assert_eq!(image.bounds(), Rect::new(50.0, 50.0, 250.0, 250.0));
    }

    #[test]
    fn test_normalize_scale() {
        let mut image = ImageNode::new(Point::ZERO, bitmap()).with_size(200.0, 100.0);
        image.scale = Vec2::new(1.5, 0.5);
        let before = image.bounds();
        image.normalize_scale();
        assert_eq!(image.scale, Vec2::new(1.0, 1.0));
        assert!((image.width - 300.0).abs() < f64::EPSILON);
        assert!((image.height - 50.0).abs() < f64::EPSILON);
        assert_eq!(image.bounds(), before);
    }

    #[test]
    fn test_hit_test() {
        let image = ImageNode::new(Point::new(10.0, 10.0), bitmap()).with_size(100.0, 100.0);
        assert!(image.hit_test(Point::new(50.0, 50.0), 0.0));
        assert!(!image.hit_test(Point::new(150.0, 50.0), 0.0));
        assert!(image.hit_test(Point::new(112.0, 50.0), 5.0));
    }
}
