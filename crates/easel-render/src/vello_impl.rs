//! Vello-based renderer implementation.

use crate::renderer::{NodeRenderer, RenderContext, Renderer};
use easel_core::bitmap::Bitmap;
use easel_core::selection::{ANCHOR_SIZE, Anchor, AnchorHandle};
use easel_core::shapes::{FontStyle, ImageNode, Node, NodeId, NodeTrait, TextNode, VideoNode};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape, Stroke};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, LayoutContext};
use peniko::{Brush, Color, Fill};
use std::collections::HashMap;
use vello::Scene;

/// GPU image data for one node, tagged with the bitmap generation it came from.
struct CachedImage {
    generation: u64,
    data: peniko::ImageData,
}

/// Vello-based renderer for GPU-accelerated 2D graphics.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
    selection_color: Color,
    /// Font context for text rendering (system fonts).
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
    /// Keeps one blob per node so unchanged bitmaps are not re-uploaded.
    image_cache: HashMap<NodeId, CachedImage>,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn image_data(bitmap: &Bitmap) -> peniko::ImageData {
    peniko::ImageData {
        data: peniko::Blob::new(bitmap.shared_data()),
        format: peniko::ImageFormat::Rgba8,
        width: bitmap.width(),
        height: bitmap.height(),
        alpha_type: peniko::ImageAlphaType::Alpha,
    }
}

fn outline(bounds: Rect) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(Point::new(bounds.x0, bounds.y0));
    path.line_to(Point::new(bounds.x1, bounds.y0));
    path.line_to(Point::new(bounds.x1, bounds.y1));
    path.line_to(Point::new(bounds.x0, bounds.y1));
    path.close_path();
    path
}

impl VelloRenderer {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            selection_color: Color::from_rgba8(0, 161, 255, 255),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            image_cache: HashMap::new(),
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Render a text node using Parley for layout.
    fn render_text(&mut self, text: &TextNode, transform: Affine) {
        use parley::StyleProperty;

        let content = text.content();
        if content.is_empty() {
            text.set_cached_size(0.0, text.font_size * 1.2);
            return;
        }

        let brush = Brush::Solid(text.fill().into());
        let (weight, style) = match text.font_style() {
            FontStyle::Normal => (parley::FontWeight::NORMAL, parley::FontStyle::Normal),
            FontStyle::Bold => (parley::FontWeight::BOLD, parley::FontStyle::Normal),
            FontStyle::Italic => (parley::FontWeight::NORMAL, parley::FontStyle::Italic),
        };

        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, content, 1.0, false);
        builder.push_default(StyleProperty::FontSize(text.font_size as f32));
        builder.push_default(StyleProperty::Brush(brush.clone()));
        builder.push_default(StyleProperty::FontWeight(weight));
        builder.push_default(StyleProperty::FontStyle(style));
        builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
            parley::FontFamily::Generic(parley::GenericFamily::SansSerif),
        )));
        let mut layout = builder.build(content);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());

        // Unscaled size; the node applies its own scale to get bounds.
        text.set_cached_size(layout.width() as f64, layout.height() as f64);

        let scale = text.scale();
        let text_transform = transform
            * Affine::translate((text.position.x, text.position.y))
            * Affine::scale_non_uniform(scale.x, scale.y);

        let mut glyph_count = 0;
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let run = glyph_run.run();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();
                glyph_count += glyphs.len();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(run.font())
                        .brush(&brush)
                        .hint(true)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(run.font_size())
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }

        // No usable system font: show where the text is.
        if glyph_count == 0 {
            log::debug!("No glyphs shaped for text node {}", text.id());
            self.scene.fill(
                Fill::NonZero,
                transform,
                Color::from_rgba8(255, 100, 100, 100),
                None,
                &text.bounds(),
            );
        }
    }

    /// Draw `bitmap` stretched over `bounds`, reusing the cached blob while the generation matches.
    fn render_bitmap(&mut self, id: NodeId, bitmap: &Bitmap, bounds: Rect, transform: Affine) {
        let data = match self.image_cache.get(&id) {
            Some(cached) if cached.generation == bitmap.generation() => cached.data.clone(),
            _ => {
                let data = image_data(bitmap);
                self.image_cache.insert(
                    id,
                    CachedImage {
                        generation: bitmap.generation(),
                        data: data.clone(),
                    },
                );
                data
            }
        };

        let scale_x = bounds.width() / f64::from(data.width);
        let scale_y = bounds.height() / f64::from(data.height);
        let image_transform = transform
            * Affine::translate((bounds.x0, bounds.y0))
            * Affine::scale_non_uniform(scale_x, scale_y);

        self.scene.draw_image(&peniko::ImageBrush::from(data), image_transform);
    }

    fn render_image(&mut self, image: &ImageNode, transform: Affine) {
        let bounds = image.bounds();
        if bounds.area().abs() < f64::EPSILON {
            return;
        }
        self.render_bitmap(image.id(), image.bitmap(), bounds, transform);
    }

    fn render_video(&mut self, video: &VideoNode, transform: Affine) {
        let bounds = video.bounds();
        if bounds.area().abs() < f64::EPSILON {
            return;
        }
        match video.frame() {
            Some(frame) => self.render_bitmap(video.id(), frame, bounds, transform),
            None => {
                self.scene.fill(
                    Fill::NonZero,
                    transform,
                    Color::from_rgba8(30, 30, 30, 255),
                    None,
                    &bounds.to_path(0.1),
                );
            }
        }
    }

    /// Render a single anchor square.
    fn render_anchor(&mut self, anchor: &AnchorHandle, transform: Affine) {
        let half = ANCHOR_SIZE / 2.0;
        let pos = anchor.position;
        let path = Rect::new(pos.x - half, pos.y - half, pos.x + half, pos.y + half).to_path(0.1);

        self.scene
            .fill(Fill::NonZero, transform, Color::WHITE, None, &path);
        self.scene.stroke(
            &Stroke::new(1.0),
            transform,
            self.selection_color,
            None,
            &path,
        );
    }

    /// Drop cached images for nodes that left the scene.
    fn prune_cache(&mut self, ctx: &RenderContext) {
        let scene = ctx.editor.scene();
        self.image_cache.retain(|id, _| scene.contains(*id));
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.scene.reset();
        self.selection_color = ctx.selection_color;
        let transform = Affine::scale(ctx.scale_factor);

        for node in ctx.editor.scene().nodes_ordered() {
            self.render_node(node, transform);
        }

        if ctx.show_selection {
            if let Some(handle) = ctx.editor.selection() {
                if let Some(node) = ctx.editor.scene().get(handle.node()) {
                    self.render_selection_handle(node.bounds(), transform);
                }
            }
        }

        self.prune_cache(ctx);
    }
}

impl NodeRenderer for VelloRenderer {
    fn render_node(&mut self, node: &Node, transform: Affine) {
        match node {
            Node::Text(text) => self.render_text(text, transform),
            Node::Image(image) => self.render_image(image, transform),
            Node::Video(video) => self.render_video(video, transform),
        }
    }

    fn render_selection_handle(&mut self, bounds: Rect, transform: Affine) {
        let stroke = Stroke::new(1.0).with_dashes(0.0, &[4.0, 4.0]);
        self.scene.stroke(
            &stroke,
            transform,
            self.selection_color,
            None,
            &outline(bounds),
        );

        for anchor in Anchor::ALL {
            let handle = AnchorHandle {
                position: anchor.position(bounds),
                anchor,
            };
            self.render_anchor(&handle, transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::config::EditorConfig;
    use easel_core::editor::Editor;
    use easel_core::shapes::SerializableColor;
    use easel_core::video::FrameSequence;
    use kurbo::Size;

    fn bitmap() -> Bitmap {
        Bitmap::solid(4, 4, SerializableColor::new(255, 0, 0, 255)).unwrap()
    }

    #[test]
    fn test_renderer_creation() {
        let renderer = VelloRenderer::new();
        assert!(renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_empty_scene() {
        let mut renderer = VelloRenderer::new();
        let editor = Editor::empty(EditorConfig::default(), Size::new(800.0, 600.0));
        let ctx = RenderContext::new(&editor, Size::new(800.0, 600.0));

        renderer.build_scene(&ctx);
        assert!(renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_scene_with_nodes() {
        let mut renderer = VelloRenderer::new();
        let mut editor = Editor::default();
        editor.add_image(bitmap());

        let ctx = RenderContext::new(&editor, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx);
        assert!(!renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_text_layout_size_is_cached() {
        let mut renderer = VelloRenderer::new();
        let editor = Editor::default();
        let ctx = RenderContext::new(&editor, Size::new(800.0, 600.0));
        renderer.build_scene(&ctx);

        let id = editor.selected().unwrap();
        let bounds = editor.scene().get(id).unwrap().bounds();
        assert_eq!(bounds.origin(), Point::new(150.0, 150.0));
        assert!(bounds.height() > 0.0);
    }

    #[test]
    fn test_image_cache_follows_scene() {
        let mut renderer = VelloRenderer::new();
        let mut editor = Editor::default();
        let id = editor.add_image(bitmap());

        renderer.build_scene(&RenderContext::new(&editor, Size::new(800.0, 600.0)));
        let first = renderer.image_cache.get(&id).map(|c| c.data.data.id());
        renderer.build_scene(&RenderContext::new(&editor, Size::new(800.0, 600.0)));
        let second = renderer.image_cache.get(&id).map(|c| c.data.data.id());
        assert!(first.is_some());
        assert_eq!(first, second);

        editor.remove_all_images();
        renderer.build_scene(&RenderContext::new(&editor, Size::new(800.0, 600.0)));
        assert!(renderer.image_cache.is_empty());
    }

    #[test]
    fn test_video_frames_replace_cached_image() {
        let mut renderer = VelloRenderer::new();
        let mut editor = Editor::empty(EditorConfig::default(), Size::new(320.0, 240.0));
        let frames = vec![bitmap(), bitmap()];
        let id = editor
            .add_video(Box::new(FrameSequence::new("clip.mp4", frames)))
            .unwrap();

        editor.tick_frame();
        renderer.build_scene(&RenderContext::new(&editor, Size::new(320.0, 240.0)));
        let first = renderer.image_cache.get(&id).map(|c| c.generation);

        editor.tick_frame();
        renderer.build_scene(&RenderContext::new(&editor, Size::new(320.0, 240.0)));
        let second = renderer.image_cache.get(&id).map(|c| c.generation);

        assert!(first.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn test_selection_can_be_hidden() {
        let mut renderer = VelloRenderer::new();
        let mut editor = Editor::empty(EditorConfig::default(), Size::new(800.0, 600.0));
        // A video without frames has zero size, so only the handle draws anything.
        editor
            .add_video(Box::new(FrameSequence::new("clip.mp4", Vec::new())))
            .unwrap();

        renderer.build_scene(&RenderContext::new(&editor, Size::new(800.0, 600.0)));
        assert!(!renderer.scene().encoding().is_empty());
        renderer.build_scene(&RenderContext::new(&editor, Size::new(800.0, 600.0)).without_selection());
        assert!(renderer.scene().encoding().is_empty());
    }
}
