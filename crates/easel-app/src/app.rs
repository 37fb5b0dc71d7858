//! Core application state and lifecycle.

use easel_core::{Editor, EditorConfig, FrameControl, InputBridge, UiAction};
use easel_render::{RenderContext, RenderResult, Renderer, RendererError, VelloRenderer};
use kurbo::{Point, Size};
use peniko::Color;
use std::sync::Arc;
use thiserror::Error;
use vello::util::RenderSurface;
use vello::wgpu::PresentMode;
use vello::{AaConfig, RenderParams, RendererOptions, Scene};
use winit::application::ApplicationHandler;
#[cfg(not(target_arch = "wasm32"))]
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::media;
use crate::ui::{PanelAction, UiState, render_ui};

/// Errors that stop the application before the event loop runs.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub background_color: Color,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Easel".to_string(),
            width: 1024,
            height: 768,
            background_color: Color::WHITE,
        }
    }
}

/// egui output waiting to be drawn over the canvas.
struct EguiFrame {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

/// Runtime state for the application.
struct AppState {
    // Windowing
    window: Arc<Window>,
    surface: RenderSurface<'static>,

    // Rendering
    vello_renderer: vello::Renderer,
    scene_renderer: VelloRenderer,
    /// Texture blitter for RGBA->surface format conversion (needed for WebGPU/WASM)
    texture_blitter: vello::wgpu::util::TextureBlitter,

    // egui
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    ui_state: UiState,

    // Editing
    editor: Editor,
    bridge: InputBridge,
    config: AppConfig,
    /// Last pointer position in canvas units.
    cursor: Point,
}

impl AppState {
    fn dispatch(&mut self, action: PanelAction) {
        match action {
            PanelAction::PickImage => self.pick_image(),
            PanelAction::Editor(action) => self.apply(action),
        }
    }

    fn apply(&mut self, action: UiAction) {
        match self.bridge.handle(&mut self.editor, action) {
            Ok(()) => self.ui_state.status = None,
            Err(e) => {
                log::error!("{}", e);
                self.ui_state.status = Some(e.to_string());
            }
        }
    }

    fn pick_image(&mut self) {
        #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
        match media::pick_image_file() {
            Ok(file) => self.apply(UiAction::ImageFile(file)),
            Err(e) => {
                log::error!("Failed to read image: {}", e);
                self.ui_state.status = Some(e.to_string());
            }
        }

        #[cfg(target_arch = "wasm32")]
        media::request_image_file(self.window.clone());

        #[cfg(not(any(feature = "native", target_arch = "wasm32")))]
        log::warn!("No image picker in this build");
    }

    fn sync_ui(&mut self) {
        self.ui_state.video_attached = self.editor.is_streaming();
        self.ui_state.video_paused = self.editor.is_video_paused().unwrap_or(false);
    }

    /// Draw the canvas scene, then egui on top, and present.
    fn render_frame(
        &mut self,
        render_cx: &vello::util::RenderContext,
        scene: &Scene,
        egui_frame: EguiFrame,
    ) -> RenderResult<()> {
        let device_handle = &render_cx.devices[self.surface.dev_id];
        let device = &device_handle.device;
        let queue = &device_handle.queue;

        let surface_texture = self
            .surface
            .surface
            .get_current_texture()
            .map_err(|e| RendererError::Surface(format!("{:?}", e)))?;

        let width = self.surface.config.width;
        let height = self.surface.config.height;

        let params = RenderParams {
            base_color: self.config.background_color,
            width,
            height,
            antialiasing_method: AaConfig::Area,
        };

        // Vello needs STORAGE_BINDING, which WebGPU only offers for Rgba8Unorm.
        // The surface may be Bgra8Unorm, so render here and blit.
        let render_texture = device.create_texture(&vello::wgpu::TextureDescriptor {
            label: Some("vello render texture"),
            size: vello::wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: vello::wgpu::TextureDimension::D2,
            format: vello::wgpu::TextureFormat::Rgba8Unorm,
            usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                | vello::wgpu::TextureUsages::COPY_SRC
                | vello::wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let render_texture_view =
            render_texture.create_view(&vello::wgpu::TextureViewDescriptor::default());

        self.vello_renderer
            .render_to_texture(device, queue, scene, &render_texture_view, &params)
            .map_err(|e| RendererError::RenderFailed(format!("{:?}", e)))?;

        let surface_view = surface_texture
            .texture
            .create_view(&vello::wgpu::TextureViewDescriptor::default());

        {
            let mut blit_encoder =
                device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                    label: Some("blit encoder"),
                });
            self.texture_blitter
                .copy(device, &mut blit_encoder, &render_texture_view, &surface_view);
            queue.submit(std::iter::once(blit_encoder.finish()));
        }

        for (id, image_delta) in &egui_frame.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: egui_frame.pixels_per_point,
        };

        {
            let mut egui_encoder =
                device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                    label: Some("egui encoder"),
                });

            self.egui_renderer.update_buffers(
                device,
                queue,
                &mut egui_encoder,
                &egui_frame.primitives,
                &screen_descriptor,
            );

            let render_pass = egui_encoder.begin_render_pass(&vello::wgpu::RenderPassDescriptor {
                label: Some("egui render pass"),
                color_attachments: &[Some(vello::wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: vello::wgpu::Operations {
                        // Keep the canvas underneath
                        load: vello::wgpu::LoadOp::Load,
                        store: vello::wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // egui-wgpu wants a 'static pass
            let mut render_pass = render_pass.forget_lifetime();
            self.egui_renderer
                .render(&mut render_pass, &egui_frame.primitives, &screen_descriptor);
            drop(render_pass);

            queue.submit(std::iter::once(egui_encoder.finish()));
        }

        for id in &egui_frame.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        surface_texture.present();
        Ok(())
    }

    /// One pass of the frame callback: panel, video tick, canvas, present.
    fn redraw(&mut self, render_cx: &vello::util::RenderContext) -> FrameControl {
        #[cfg(target_arch = "wasm32")]
        if let Some(file) = media::take_pending_image() {
            self.apply(UiAction::ImageFile(Some(file)));
        }

        let egui_input = self.egui_state.take_egui_input(&self.window);
        let mut panel_actions = Vec::new();
        let egui_output = self.egui_ctx.run(egui_input, |ctx| {
            panel_actions = render_ui(ctx, &mut self.ui_state);
        });
        for action in panel_actions {
            self.dispatch(action);
        }
        self.sync_ui();

        self.egui_state
            .handle_platform_output(&self.window, egui_output.platform_output);
        let primitives = self
            .egui_ctx
            .tessellate(egui_output.shapes, egui_output.pixels_per_point);

        let control = self.editor.tick_frame();
        // This frame satisfies whatever was pending.
        let _ = self.editor.take_redraw();

        let viewport = Size::new(
            self.surface.config.width as f64,
            self.surface.config.height as f64,
        );
        let ctx = RenderContext::new(&self.editor, viewport)
            .with_scale_factor(self.window.scale_factor())
            .with_background(self.config.background_color);
        self.scene_renderer.build_scene(&ctx);
        let scene = self.scene_renderer.take_scene();

        let egui_frame = EguiFrame {
            primitives,
            textures_delta: egui_output.textures_delta,
            pixels_per_point: egui_output.pixels_per_point,
        };
        if let Err(e) = self.render_frame(render_cx, &scene, egui_frame) {
            log::warn!("Frame dropped: {}", e);
        }
        control
    }
}

/// Main application struct.
pub struct App {
    config: AppConfig,
    editor_config: EditorConfig,
    state: Option<AppState>,
    render_cx: Option<vello::util::RenderContext>,
    /// Window waiting for async surface creation (WASM only)
    pending_window: Option<Arc<Window>>,
    /// Flag to indicate async init is in progress
    #[cfg(target_arch = "wasm32")]
    init_in_progress: std::cell::Cell<bool>,
}

fn video_sources(config: &EditorConfig) -> InputBridge {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let (width, height) = config.video_decode_size;
        InputBridge::new(media::FfmpegSourceFactory::new(width, height))
    }

    #[cfg(target_arch = "wasm32")]
    {
        let _ = config;
        InputBridge::new(media::HtmlVideoSourceFactory)
    }
}

impl App {
    pub fn new(editor_config: EditorConfig) -> Self {
        Self::with_config(AppConfig::default(), editor_config)
    }

    pub fn with_config(config: AppConfig, editor_config: EditorConfig) -> Self {
        Self {
            config,
            editor_config,
            state: None,
            render_cx: None,
            pending_window: None,
            #[cfg(target_arch = "wasm32")]
            init_in_progress: std::cell::Cell::new(false),
        }
    }

    /// Run the application until the window closes.
    pub async fn run(editor_config: EditorConfig) -> Result<(), AppError> {
        let event_loop = EventLoop::new()?;
        let app = App::new(editor_config);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::EventLoopExtWebSys;
            event_loop.spawn_app(app);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut app = app;
            event_loop.run_app(&mut app)?;
        }

        Ok(())
    }

    /// Finish initialization after surface is created.
    fn finish_init(&mut self, window: Arc<Window>, surface: RenderSurface<'static>) {
        let Some(render_cx) = self.render_cx.as_ref() else {
            log::error!("Render context missing during init");
            return;
        };
        let device = &render_cx.devices[surface.dev_id].device;

        let vello_renderer = match vello::Renderer::new(device, RendererOptions::default()) {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("Failed to create Vello renderer: {:?}", e);
                return;
            }
        };
        let texture_blitter =
            vello::wgpu::util::TextureBlitter::new(device, surface.config.format);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface.config.format,
            egui_wgpu::RendererOptions::default(),
        );

        // Canvas units are logical pixels; the viewport stays fixed for the session.
        let scale_factor = window.scale_factor();
        let viewport = Size::new(
            surface.config.width as f64 / scale_factor,
            surface.config.height as f64 / scale_factor,
        );
        let editor = Editor::new(self.editor_config.clone(), viewport);
        let ui_state = UiState::from_defaults(editor.text_defaults());

        log::info!(
            "Easel initialized - {}x{} (viewport {}x{})",
            surface.config.width,
            surface.config.height,
            viewport.width,
            viewport.height
        );

        self.state = Some(AppState {
            window: window.clone(),
            surface,
            vello_renderer,
            scene_renderer: VelloRenderer::new(),
            texture_blitter,
            egui_ctx,
            egui_state,
            egui_renderer,
            ui_state,
            bridge: video_sources(&self.editor_config),
            editor,
            config: self.config.clone(),
            cursor: Point::ZERO,
        });

        self.pending_window = None;
        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.pending_window.is_some() {
            return;
        }

        log::info!("Creating window...");

        #[cfg(not(target_arch = "wasm32"))]
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        #[cfg(target_arch = "wasm32")]
        let window_attrs = {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|document| {
                    if let Some(loading) = document.get_element_by_id("loading") {
                        loading.remove();
                    }
                    document
                        .get_element_by_id("easel-canvas")
                        .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
                        .or_else(|| {
                            let app_div = document.get_element_by_id("app")?;
                            let canvas = document.create_element("canvas").ok()?;
                            canvas.set_id("easel-canvas");
                            app_div.append_child(&canvas).ok()?;
                            canvas.dyn_into::<web_sys::HtmlCanvasElement>().ok()
                        })
                });

            if let Some(canvas) = &canvas {
                let style = canvas.style();
                let _ = style.set_property("width", "100%");
                let _ = style.set_property("height", "100%");
                let _ = style.set_property("display", "block");
            }

            Window::default_attributes()
                .with_title(&self.config.title)
                .with_canvas(canvas)
        };

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        let (width, height) = if size.width == 0 || size.height == 0 {
            (self.config.width, self.config.height)
        } else {
            (size.width, size.height)
        };

        log::info!("Surface size: {}x{}", width, height);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let render_cx = self
                .render_cx
                .get_or_insert_with(vello::util::RenderContext::new);

            let surface = match pollster::block_on(render_cx.create_surface(
                window.clone(),
                width,
                height,
                PresentMode::AutoVsync,
            )) {
                Ok(surface) => surface,
                Err(e) => {
                    log::error!("Failed to create surface: {:?}", e);
                    event_loop.exit();
                    return;
                }
            };

            // SAFETY: the surface borrows the window, which AppState keeps alive
            // for as long as the surface exists.
            let surface: RenderSurface<'static> = unsafe { std::mem::transmute(surface) };
            self.finish_init(window, surface);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let _ = (width, height);
            self.pending_window = Some(window);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        #[cfg(target_arch = "wasm32")]
        if self.state.is_none() {
            if let Some(window) = self.pending_window.clone() {
                if !self.init_in_progress.get() {
                    self.init_in_progress.set(true);

                    let size = window.inner_size();
                    let width = size.width.max(1);
                    let height = size.height.max(1);

                    let self_ptr = self as *mut Self;
                    let window_clone = window.clone();

                    wasm_bindgen_futures::spawn_local(async move {
                        let mut render_cx = vello::util::RenderContext::new();
                        match render_cx
                            .create_surface(window_clone.clone(), width, height, PresentMode::AutoVsync)
                            .await
                        {
                            Ok(surface) => {
                                let surface: RenderSurface<'static> =
                                    unsafe { std::mem::transmute(surface) };

                                // SAFETY: WASM is single-threaded and the event loop
                                // keeps the App alive.
                                let app = unsafe { &mut *self_ptr };
                                app.render_cx = Some(render_cx);
                                app.finish_init(window_clone, surface);
                            }
                            Err(e) => {
                                log::error!("Failed to create surface: {:?}", e);
                                let app = unsafe { &mut *self_ptr };
                                app.init_in_progress.set(false);
                            }
                        }
                    });
                }

                window.request_redraw();
            }
            return;
        }

        let Some(state) = &mut self.state else {
            return;
        };

        let egui_response = state.egui_state.on_window_event(&state.window, &event);
        let egui_wants_input = egui_response.consumed
            || state.egui_ctx.is_pointer_over_area()
            || state.egui_ctx.wants_pointer_input()
            || state.egui_ctx.wants_keyboard_input();
        let mut keep_running = false;

        match event {
            WindowEvent::CloseRequested => {
                state.editor.remove_video();
                event_loop.exit();
                return;
            }

            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(render_cx) = self.render_cx.as_mut() {
                    render_cx.resize_surface(&mut state.surface, size.width, size.height);
                }
                state.window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                let Some(render_cx) = self.render_cx.as_ref() else {
                    return;
                };
                keep_running = state.redraw(render_cx) == FrameControl::Continue;
            }

            WindowEvent::CursorMoved { position, .. } => {
                let scale = state.window.scale_factor();
                state.cursor = Point::new(position.x / scale, position.y / scale);
                // A drag that started on the canvas keeps going under the panel.
                if state.editor.is_transforming() || !egui_wants_input {
                    state.editor.pointer_move(state.cursor);
                }
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if !egui_wants_input {
                    state.editor.pointer_down(state.cursor);
                }
            }

            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => {
                state.editor.pointer_up();
            }

            _ => {}
        }

        if let Some(redraw) = state.editor.take_redraw() {
            log::trace!("{:?} redraw requested", redraw);
            keep_running = true;
        }
        if keep_running || egui_response.repaint {
            state.window.request_redraw();
        }
    }
}
