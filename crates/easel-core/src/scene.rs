//! The scene graph: every node on the canvas, in paint order.

use crate::shapes::{Node, NodeId, NodeKind, TextNode};
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// All nodes on the canvas, keyed by id, plus their z-order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: HashMap<NodeId, Node>,
    /// Z-order of nodes (back to front).
    z_order: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node on top of everything else.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.z_order.push(id);
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node from the scene.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.z_order.retain(|&node_id| node_id != id);
        self.nodes.remove(&id)
    }

    /// Remove every node of `kind`, returning the removed ids in paint order.
    pub fn remove_kind(&mut self, kind: NodeKind) -> Vec<NodeId> {
        let removed = self.ids_of_kind(kind);
        for id in &removed {
            self.nodes.remove(id);
        }
        self.z_order.retain(|id| self.nodes.contains_key(id));
        removed
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in paint order (back to front).
    pub fn nodes_ordered(&self) -> impl Iterator<Item = &Node> {
        self.z_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn z_order(&self) -> &[NodeId] {
        &self.z_order
    }

    /// Ids of every node of `kind`, back to front.
    pub fn ids_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes_ordered()
            .filter(|node| node.kind() == kind)
            .map(Node::id)
            .collect()
    }

    pub fn count_of_kind(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|node| node.kind() == kind).count()
    }

    /// Mutable access to every text node, in no particular order.
    pub fn text_nodes_mut(&mut self) -> impl Iterator<Item = &mut TextNode> {
        self.nodes.values_mut().filter_map(Node::as_text_mut)
    }

    /// Bring a node to the front.
    pub fn bring_to_front(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) {
            self.z_order.retain(|&node_id| node_id != id);
            self.z_order.push(id);
        }
    }

    /// Union of all node bounds.
    pub fn bounds(&self) -> Option<Rect> {
        self.nodes_ordered()
            .map(Node::bounds)
            .reduce(|acc, bounds| acc.union(bounds))
    }

    /// Nodes under `point`, front to back.
    pub fn nodes_at_point(&self, point: Point, tolerance: f64) -> Vec<NodeId> {
        self.z_order
            .iter()
            .rev()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|node| node.hit_test(point, tolerance))
            })
            .copied()
            .collect()
    }

    /// The front-most node under `point`.
    pub fn top_node_at(&self, point: Point, tolerance: f64) -> Option<NodeId> {
        self.nodes_at_point(point, tolerance).into_iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::shapes::{ImageNode, SerializableColor, VideoNode};

    fn image_at(x: f64, y: f64) -> Node {
        let bitmap = Bitmap::solid(1, 1, SerializableColor::white()).unwrap();
        Node::Image(ImageNode::new(Point::new(x, y), bitmap).with_size(100.0, 100.0))
    }

    fn text_at(x: f64, y: f64) -> Node {
        Node::Text(TextNode::new(Point::new(x, y), "Hello"))
    }

    #[test]
    fn test_add_and_remove() {
        let mut scene = Scene::new();
        let id = scene.add_node(text_at(0.0, 0.0));
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(id));

        let removed = scene.remove_node(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(scene.is_empty());
        assert!(scene.z_order().is_empty());
    }

    #[test]
    fn test_z_order_and_bring_to_front() {
        let mut scene = Scene::new();
        let a = scene.add_node(image_at(0.0, 0.0));
        let b = scene.add_node(image_at(50.0, 50.0));
        assert_eq!(scene.z_order(), &[a, b]);

        scene.bring_to_front(a);
        assert_eq!(scene.z_order(), &[b, a]);
    }

    #[test]
    fn test_nodes_at_point_front_to_back() {
        let mut scene = Scene::new();
        let back = scene.add_node(image_at(0.0, 0.0));
        let front = scene.add_node(image_at(50.0, 50.0));

        assert_eq!(scene.nodes_at_point(Point::new(75.0, 75.0), 0.0), vec![front, back]);
        assert_eq!(scene.top_node_at(Point::new(10.0, 10.0), 0.0), Some(back));
        assert_eq!(scene.top_node_at(Point::new(500.0, 500.0), 0.0), None);
    }

    #[test]
    fn test_remove_kind() {
        let mut scene = Scene::new();
        let t1 = scene.add_node(text_at(0.0, 0.0));
        let img = scene.add_node(image_at(0.0, 0.0));
        let t2 = scene.add_node(text_at(10.0, 10.0));
        let video = scene.add_node(Node::Video(VideoNode::new(Point::ZERO, "clip.mp4")));

        assert_eq!(scene.count_of_kind(NodeKind::Text), 2);
        assert_eq!(scene.remove_kind(NodeKind::Text), vec![t1, t2]);
        assert_eq!(scene.z_order(), &[img, video]);
        assert_eq!(scene.count_of_kind(NodeKind::Text), 0);
        assert_eq!(scene.count_of_kind(NodeKind::Image), 1);
        assert_eq!(scene.count_of_kind(NodeKind::Video), 1);
    }

    #[test]
    fn test_bounds_union() {
        let mut scene = Scene::new();
        assert!(scene.bounds().is_none());
        scene.add_node(image_at(0.0, 0.0));
        scene.add_node(image_at(200.0, 100.0));
        assert_eq!(scene.bounds(), Some(Rect::new(0.0, 0.0, 300.0, 200.0)));
    }

    #[test]
    fn test_text_nodes_mut() {
        let mut scene = Scene::new();
        scene.add_node(text_at(0.0, 0.0));
        scene.add_node(image_at(0.0, 0.0));
        scene.add_node(text_at(5.0, 5.0));
        for text in scene.text_nodes_mut() {
            text.set_content("Changed");
        }
        let contents: Vec<_> = scene
            .nodes_ordered()
            .filter_map(Node::as_text)
            .map(|t| t.content().to_string())
            .collect();
        assert_eq!(contents, vec!["Changed", "Changed"]);
    }
}
