//! The selection handle and its resize/move gestures.

use crate::shapes::{Node, NodeId};
use kurbo::{Point, Rect, Size, Vec2};

/// Anchor square size in canvas pixels.
pub const ANCHOR_SIZE: f64 = 10.0;
/// Anchor hit tolerance in canvas pixels.
pub const ANCHOR_HIT_TOLERANCE: f64 = 8.0;
/// Smallest box the handle accepts on either axis.
pub const MIN_SIZE: f64 = 30.0;

/// Resize anchors offered by the selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    MiddleLeft,
    MiddleRight,
}

impl Anchor {
    pub const ALL: [Anchor; 6] = [
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
        Anchor::MiddleLeft,
        Anchor::MiddleRight,
    ];

    /// Where this anchor sits on `bounds`.
    pub fn position(self, bounds: Rect) -> Point {
        let mid_y = (bounds.y0 + bounds.y1) / 2.0;
        match self {
            Anchor::TopLeft => Point::new(bounds.x0, bounds.y0),
            Anchor::TopRight => Point::new(bounds.x1, bounds.y0),
            Anchor::BottomLeft => Point::new(bounds.x0, bounds.y1),
            Anchor::BottomRight => Point::new(bounds.x1, bounds.y1),
            Anchor::MiddleLeft => Point::new(bounds.x0, mid_y),
            Anchor::MiddleRight => Point::new(bounds.x1, mid_y),
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, Anchor::TopLeft | Anchor::BottomLeft | Anchor::MiddleLeft)
    }

    fn moves_top(self) -> bool {
        matches!(self, Anchor::TopLeft | Anchor::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Anchor::BottomLeft | Anchor::BottomRight)
    }
}

/// An anchor with its position.
#[derive(Debug, Clone, Copy)]
pub struct AnchorHandle {
    pub position: Point,
    pub anchor: Anchor,
}

impl AnchorHandle {
    /// Check if a point hits this anchor's square, grown by `tolerance`.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = ANCHOR_SIZE / 2.0 + tolerance;
        (point.x - self.position.x).abs() <= reach && (point.y - self.position.y).abs() <= reach
    }
}

/// The single transform handle, bound to at most one node at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionHandle {
    node: NodeId,
    min_size: Size,
}

impl SelectionHandle {
    pub fn new(node: NodeId, min_size: Size) -> Self {
        Self { node, min_size }
    }

    /// The node this handle is attached to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn min_size(&self) -> Size {
        self.min_size
    }

    /// The six anchors for a node occupying `bounds`.
    pub fn anchors(&self, bounds: Rect) -> Vec<AnchorHandle> {
        Anchor::ALL
            .iter()
            .map(|&anchor| AnchorHandle {
                position: anchor.position(bounds),
                anchor,
            })
            .collect()
    }

    pub fn hit_test_anchor(&self, bounds: Rect, point: Point, tolerance: f64) -> Option<Anchor> {
        self.anchors(bounds)
            .into_iter()
            .find(|handle| handle.hit_test(point, tolerance))
            .map(|handle| handle.anchor)
    }

    /// Accept `proposed` only when both sides reach the minimum size; otherwise keep `current`.
    ///
    /// Flipped boxes have a negative extent and are rejected too.
    pub fn bound_box(&self, current: Rect, proposed: Rect) -> Rect {
        if proposed.width() < self.min_size.width || proposed.height() < self.min_size.height {
            current
        } else {
            proposed
        }
    }
}

/// The box produced by dragging `anchor` of `bounds` by `delta`.
///
/// Side anchors only move horizontally. The result is not normalized, so
/// dragging past the opposite edge yields a negative width or height.
pub fn propose_resize(bounds: Rect, anchor: Anchor, delta: Vec2) -> Rect {
    let mut rect = bounds;
    if anchor.moves_left() {
        rect.x0 += delta.x;
    } else {
        rect.x1 += delta.x;
    }
    if anchor.moves_top() {
        rect.y0 += delta.y;
    } else if anchor.moves_bottom() {
        rect.y1 += delta.y;
    }
    rect
}

/// What a pointer gesture is doing to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Move,
    Resize(Anchor),
}

/// State for an in-progress move or resize.
#[derive(Debug, Clone)]
pub struct TransformSession {
    pub node: NodeId,
    pub kind: TransformKind,
    pub start_point: Point,
    pub current_point: Point,
    /// Node bounds when the gesture began.
    pub original_bounds: Rect,
    /// Node position when the gesture began.
    pub original_position: Point,
}

impl TransformSession {
    pub fn new(node: &Node, kind: TransformKind, start_point: Point) -> Self {
        Self {
            node: node.id(),
            kind,
            start_point,
            current_point: start_point,
            original_bounds: node.bounds(),
            original_position: node.position(),
        }
    }

    /// Pointer travel since the gesture began.
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::TextNode;
    use uuid::Uuid;

    fn handle() -> SelectionHandle {
        SelectionHandle::new(Uuid::new_v4(), Size::new(MIN_SIZE, MIN_SIZE))
    }

    #[test]
    fn test_six_anchors() {
        let anchors = handle().anchors(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(anchors.len(), 6);
        assert_eq!(anchors[0].anchor, Anchor::TopLeft);
        assert_eq!(anchors[3].position, Point::new(100.0, 50.0));
        assert_eq!(anchors[4].position, Point::new(0.0, 25.0));
        assert_eq!(anchors[5].position, Point::new(100.0, 25.0));
    }

    #[test]
    fn test_anchor_hit_test() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        let h = handle();
        assert_eq!(h.hit_test_anchor(bounds, Point::new(101.0, 49.0), 0.0), Some(Anchor::BottomRight));
        assert_eq!(h.hit_test_anchor(bounds, Point::new(-3.0, 26.0), 0.0), Some(Anchor::MiddleLeft));
        assert_eq!(h.hit_test_anchor(bounds, Point::new(50.0, 25.0), 0.0), None);
    }

    #[test]
    fn test_propose_resize_corners() {
        let bounds = Rect::new(50.0, 50.0, 250.0, 250.0);
        assert_eq!(
            propose_resize(bounds, Anchor::BottomRight, Vec2::new(10.0, 20.0)),
            Rect::new(50.0, 50.0, 260.0, 270.0)
        );
        assert_eq!(
            propose_resize(bounds, Anchor::TopLeft, Vec2::new(10.0, 20.0)),
            Rect::new(60.0, 70.0, 250.0, 250.0)
        );
        assert_eq!(
            propose_resize(bounds, Anchor::TopRight, Vec2::new(-10.0, 5.0)),
            Rect::new(50.0, 55.0, 240.0, 250.0)
        );
    }

    #[test]
    fn test_side_anchors_ignore_vertical_motion() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            propose_resize(bounds, Anchor::MiddleRight, Vec2::new(15.0, 40.0)),
            Rect::new(0.0, 0.0, 115.0, 100.0)
        );
        assert_eq!(
            propose_resize(bounds, Anchor::MiddleLeft, Vec2::new(15.0, 40.0)),
            Rect::new(15.0, 0.0, 100.0, 100.0)
        );
    }

    #[test]
    fn test_bound_box_rejects_small_boxes() {
        let h = handle();
        let current = Rect::new(50.0, 50.0, 250.0, 250.0);

        assert_eq!(h.bound_box(current, Rect::new(50.0, 50.0, 60.0, 250.0)), current);
        assert_eq!(h.bound_box(current, Rect::new(50.0, 50.0, 250.0, 79.0)), current);
        let exact = Rect::new(50.0, 50.0, 80.0, 80.0);
        assert_eq!(h.bound_box(current, exact), exact);
    }

    #[test]
    fn test_bound_box_rejects_flipped_boxes() {
        let h = handle();
        let current = Rect::new(0.0, 0.0, 100.0, 100.0);
        let flipped = propose_resize(current, Anchor::BottomRight, Vec2::new(-200.0, 0.0));
        assert!(flipped.width() < 0.0);
        assert_eq!(h.bound_box(current, flipped), current);
    }

    #[test]
    fn test_session_delta() {
        let node = Node::Text(TextNode::new(Point::new(10.0, 10.0), "Hi"));
        let mut session = TransformSession::new(&node, TransformKind::Move, Point::new(20.0, 20.0));
        session.current_point = Point::new(35.0, 10.0);
        assert_eq!(session.delta(), Vec2::new(15.0, -10.0));
        assert_eq!(session.original_position, Point::new(10.0, 10.0));
    }
}
