//! Renderer trait abstraction.

use easel_core::editor::Editor;
use easel_core::shapes::Node;
use kurbo::{Affine, Rect, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The editor whose scene is drawn.
    pub editor: &'a Editor,
    /// Viewport size in physical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    pub background_color: Color,
    /// Selection handle color.
    pub selection_color: Color,
    /// Draw the selection handle.
    pub show_selection: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(editor: &'a Editor, viewport_size: Size) -> Self {
        Self {
            editor,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::WHITE,
            selection_color: Color::from_rgba8(0, 161, 255, 255),
            show_selection: true,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Hide the selection handle, e.g. for snapshots.
    pub fn without_selection(mut self) -> Self {
        self.show_selection = false;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the scene/command buffer for a frame.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

/// Per-node drawing hooks used by renderers.
pub trait NodeRenderer {
    fn render_node(&mut self, node: &Node, transform: Affine);

    /// Draw the selection handle around `bounds`.
    fn render_selection_handle(&mut self, bounds: Rect, transform: Affine);
}
