//! Editor state: the scene plus its selection handle, text defaults and video stream.

use crate::bitmap::Bitmap;
use crate::config::EditorConfig;
use crate::render_loop::{FrameControl, Redraw, RedrawQueue, Stream, StreamState};
use crate::scene::Scene;
use crate::selection::{
    ANCHOR_HIT_TOLERANCE, Anchor, SelectionHandle, TransformKind, TransformSession, propose_resize,
};
use crate::shapes::{
    FontStyle, ImageNode, Node, NodeId, NodeKind, NodeTrait, SerializableColor, TextNode,
    VideoNode,
};
use crate::video::{VideoError, VideoSource};
use kurbo::{Point, Rect, Size, Vec2};
use thiserror::Error;

/// Errors from editor mutations.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("a video is already attached")]
    VideoAlreadyAttached,
    #[error(transparent)]
    Video(#[from] VideoError),
}

/// Text attributes most recently chosen in the controls.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDefaults {
    pub content: String,
    pub fill: SerializableColor,
    pub font_style: FontStyle,
}

/// The editing surface.
#[derive(Debug)]
pub struct Editor {
    scene: Scene,
    selection: Option<SelectionHandle>,
    session: Option<TransformSession>,
    text_defaults: TextDefaults,
    stream: StreamState,
    redraw: RedrawQueue,
    viewport: Size,
    config: EditorConfig,
}

impl Editor {
    /// Create an editor with the startup text node already placed and selected.
    pub fn new(config: EditorConfig, viewport: Size) -> Self {
        let mut editor = Self::empty(config, viewport);
        let initial = editor.config.initial_text.clone();
        editor.add_text(initial);
        editor
    }

    /// Create an editor with an empty scene.
    pub fn empty(config: EditorConfig, viewport: Size) -> Self {
        let text_defaults = TextDefaults {
            content: config.initial_text.clone(),
            fill: config.fill,
            font_style: config.font_style,
        };
        Self {
            scene: Scene::new(),
            selection: None,
            session: None,
            text_defaults,
            stream: StreamState::Idle,
            redraw: RedrawQueue::default(),
            viewport,
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Canvas size fixed at startup. Videos cover it on their first frame.
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn text_defaults(&self) -> &TextDefaults {
        &self.text_defaults
    }

    pub fn selection(&self) -> Option<&SelectionHandle> {
        self.selection.as_ref()
    }

    /// The node the handle is attached to.
    pub fn selected(&self) -> Option<NodeId> {
        self.selection.map(|handle| handle.node())
    }

    pub fn is_transforming(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_streaming()
    }

    pub fn video_node(&self) -> Option<NodeId> {
        self.stream.node()
    }

    /// Paused state of the attached video, if any.
    pub fn is_video_paused(&self) -> Option<bool> {
        self.stream.stream().map(|stream| stream.source.is_paused())
    }

    pub fn frames_copied(&self) -> u64 {
        self.stream.stream().map_or(0, |stream| stream.frames_copied)
    }

    /// Take the pending redraw request, if any.
    pub fn take_redraw(&mut self) -> Option<Redraw> {
        self.redraw.take()
    }

    /// Add a text node using the current text defaults and select it.
    pub fn add_text(&mut self, content: impl Into<String>) -> NodeId {
        let text = TextNode::new(self.config.text_origin, content)
            .with_font_size(self.config.font_size)
            .with_fill(self.text_defaults.fill)
            .with_font_style(self.text_defaults.font_style);
        let id = self.scene.add_node(Node::Text(text));
        log::debug!("Added text node {id}");
        self.bind_handle(id);
        self.redraw.request(Redraw::Immediate);
        id
    }

    /// Add an image node showing `bitmap` and select it.
    pub fn add_image(&mut self, bitmap: Bitmap) -> NodeId {
        let size = self.config.image_size;
        let image = ImageNode::new(self.config.image_origin, bitmap).with_size(size.width, size.height);
        let id = self.scene.add_node(Node::Image(image));
        log::debug!("Added image node {id}");
        self.bind_handle(id);
        self.redraw.request(Redraw::Immediate);
        id
    }

    /// Attach a video node fed by `source` and start playback.
    pub fn add_video(&mut self, mut source: Box<dyn VideoSource>) -> Result<NodeId, EditorError> {
        if self.stream.is_streaming() {
            return Err(EditorError::VideoAlreadyAttached);
        }
        let video = VideoNode::new(self.config.video_origin, source.url());
        let id = self.scene.add_node(Node::Video(video));
        source.play();
        log::info!("Streaming {} into node {id}", source.url());
        self.stream = StreamState::Streaming(Stream {
            node: id,
            source,
            frames_copied: 0,
        });
        self.bind_handle(id);
        self.redraw.request(Redraw::Batched);
        Ok(id)
    }

    /// Remove every text node. Returns how many were removed.
    pub fn remove_all_text(&mut self) -> usize {
        self.remove_kind(NodeKind::Text)
    }

    /// Remove every image node. Returns how many nodes were removed.
    pub fn remove_all_images(&mut self) -> usize {
        let mut removed = self.remove_kind(NodeKind::Image);
        if self.config.remove_images_includes_video && self.remove_video() {
            removed += 1;
        }
        removed
    }

    /// Detach the video: stop the stream, close its source and remove its node.
    pub fn remove_video(&mut self) -> bool {
        let Some(mut stream) = self.stream.stop() else {
            return false;
        };
        stream.source.pause();
        stream.source.close();
        self.scene.remove_node(stream.node);
        self.release_handle_if_detached();
        log::info!(
            "Detached video node {} after {} frames",
            stream.node,
            stream.frames_copied
        );
        self.redraw.request(Redraw::Immediate);
        true
    }

    /// Replace the content of every text node.
    pub fn set_text_content(&mut self, content: &str) {
        self.text_defaults.content = content.to_string();
        for text in self.scene.text_nodes_mut() {
            text.set_content(content);
        }
        self.redraw.request(Redraw::Immediate);
    }

    /// Recolor every text node and remember the color for new ones.
    pub fn set_fill(&mut self, fill: SerializableColor) {
        self.text_defaults.fill = fill;
        for text in self.scene.text_nodes_mut() {
            text.set_fill(fill);
        }
        self.redraw.request(Redraw::Immediate);
    }

    /// Restyle every text node and remember the style for new ones.
    pub fn set_font_style(&mut self, style: FontStyle) {
        self.text_defaults.font_style = style;
        for text in self.scene.text_nodes_mut() {
            text.set_font_style(style);
        }
        self.redraw.request(Redraw::Immediate);
    }

    /// Translate every text node.
    pub fn move_text_nodes(&mut self, delta: Vec2) {
        for text in self.scene.text_nodes_mut() {
            text.translate(delta);
        }
        self.redraw.request(Redraw::Immediate);
    }

    /// Toggle play/pause. Returns the new paused state, or `None` with no video attached.
    pub fn toggle_playback(&mut self) -> Option<bool> {
        let stream = self.stream.stream_mut()?;
        if stream.source.is_paused() {
            stream.source.play();
        } else {
            stream.source.pause();
        }
        Some(stream.source.is_paused())
    }

    /// Attach the handle to `id`. Returns false if the node does not exist.
    pub fn select(&mut self, id: NodeId) -> bool {
        if !self.scene.contains(id) {
            return false;
        }
        self.bind_handle(id);
        self.redraw.request(Redraw::Immediate);
        true
    }

    /// Begin a gesture at `point`.
    ///
    /// An anchor of the selected node starts a resize. Otherwise the front-most
    /// node under the pointer is selected and, if draggable, starts a move.
    /// Empty canvas leaves the handle where it is.
    pub fn pointer_down(&mut self, point: Point) -> bool {
        if let Some(handle) = self.selection {
            if let Some(node) = self.scene.get(handle.node()) {
                if let Some(anchor) =
                    handle.hit_test_anchor(node.bounds(), point, ANCHOR_HIT_TOLERANCE)
                {
                    self.session =
                        Some(TransformSession::new(node, TransformKind::Resize(anchor), point));
                    return true;
                }
            }
        }

        let Some(id) = self.scene.top_node_at(point, 0.0) else {
            return false;
        };
        self.select(id);
        if let Some(node) = self.scene.get(id) {
            if node.is_draggable() {
                self.session = Some(TransformSession::new(node, TransformKind::Move, point));
            }
        }
        true
    }

    /// Continue the active gesture.
    pub fn pointer_move(&mut self, point: Point) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.current_point = point;
        let session = session.clone();
        match session.kind {
            TransformKind::Move => {
                if let Some(node) = self.scene.get_mut(session.node) {
                    node.set_position(session.original_position + session.delta());
                }
            }
            TransformKind::Resize(anchor) => {
                let proposed = propose_resize(session.original_bounds, anchor, session.delta());
                self.apply_bounded(session.node, proposed);
            }
        }
        self.redraw.request(Redraw::Immediate);
        true
    }

    /// Finish the active gesture. Resizes are committed.
    pub fn pointer_up(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        if matches!(session.kind, TransformKind::Resize(_)) {
            if let Some(node) = self.scene.get_mut(session.node) {
                node.commit_resize();
            }
        }
        self.redraw.request(Redraw::Immediate);
        true
    }

    /// Drag an anchor of the selected node by `delta` in one step and commit.
    ///
    /// Returns the node's bounds afterwards. Proposals below the minimum size leave them unchanged.
    pub fn resize_selected(&mut self, anchor: Anchor, delta: Vec2) -> Option<Rect> {
        let id = self.selected()?;
        let current = self.scene.get(id)?.bounds();
        self.apply_bounded(id, propose_resize(current, anchor, delta));
        let node = self.scene.get_mut(id)?;
        node.commit_resize();
        self.redraw.request(Redraw::Immediate);
        Some(node.bounds())
    }

    /// One tick of the per-frame callback.
    ///
    /// While streaming, copies the source's current frame into the video node
    /// once the source has current data, then asks to be scheduled again.
    pub fn tick_frame(&mut self) -> FrameControl {
        let Some(stream) = self.stream.stream_mut() else {
            return FrameControl::Stop;
        };
        if !stream.source.ready_state().has_current_data() {
            return FrameControl::Continue;
        }
        let Some(frame) = stream.source.current_frame() else {
            return FrameControl::Continue;
        };
        let Some(video) = self.scene.get_mut(stream.node).and_then(Node::as_video_mut) else {
            return FrameControl::Continue;
        };
        if !video.has_frame() {
            video.fit_to(self.viewport);
        }
        video.set_frame(frame);
        stream.frames_copied += 1;
        self.redraw.request(Redraw::Batched);
        FrameControl::Continue
    }

    fn apply_bounded(&mut self, id: NodeId, proposed: Rect) {
        let Some(handle) = self.selection else {
            return;
        };
        if let Some(node) = self.scene.get_mut(id) {
            let accepted = handle.bound_box(node.bounds(), proposed);
            node.apply_box(accepted);
        }
    }

    fn bind_handle(&mut self, id: NodeId) {
        self.session = None;
        self.selection = Some(SelectionHandle::new(id, self.config.min_size()));
    }

    fn remove_kind(&mut self, kind: NodeKind) -> usize {
        let removed = self.scene.remove_kind(kind);
        if !removed.is_empty() {
            log::debug!("Removed {} {} node(s)", removed.len(), kind.name());
            self.release_handle_if_detached();
            self.redraw.request(Redraw::Immediate);
        }
        removed.len()
    }

    /// Drop the handle and any gesture once its node has left the scene.
    fn release_handle_if_detached(&mut self) {
        if let Some(handle) = self.selection {
            if !self.scene.contains(handle.node()) {
                self.selection = None;
                self.session = None;
            }
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default(), Size::new(800.0, 600.0))
    }
}
