//! Platform video sources and image pickers.
//!
//! Native builds decode video with the system `ffmpeg` and pick files with
//! `rfd`. WASM builds use an `HtmlVideoElement` and a hidden file input.

#[cfg(not(target_arch = "wasm32"))]
pub use native::*;
#[cfg(target_arch = "wasm32")]
pub use web::*;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    #[cfg(feature = "native")]
    use easel_core::ImageFile;
    use easel_core::{Bitmap, ReadyState, VideoError, VideoSource, VideoSourceFactory};
    use std::io::{ErrorKind, Read};
    use std::process::{Child, Command, ExitStatus, Stdio};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};
    use std::time::Duration;

    const PAUSE_POLL: Duration = Duration::from_millis(15);

    /// Returns true when an `ffmpeg` binary can be executed.
    pub fn is_ffmpeg_on_path() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Kill and reap a child process, returning its exit status.
    fn discard_child(mut child: Child) -> Option<ExitStatus> {
        if let Err(e) = child.kill() {
            log::debug!("ffmpeg already exited: {}", e);
        }
        child.wait().ok()
    }

    /// Arguments for a looping, muted, real-time decode to raw RGBA on stdout.
    pub fn ffmpeg_args(url: &str, width: u32, height: u32) -> Vec<String> {
        vec![
            "-loglevel".into(),
            "error".into(),
            "-stream_loop".into(),
            "-1".into(),
            "-re".into(),
            "-i".into(),
            url.into(),
            "-an".into(),
            "-vf".into(),
            format!("scale={width}:{height}"),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "pipe:1".into(),
        ]
    }

    /// State shared between the decoder thread and the source.
    #[derive(Debug, Default)]
    pub struct FrameSlot {
        latest: Mutex<Option<Bitmap>>,
        received_any: AtomicBool,
        paused: AtomicBool,
        closed: AtomicBool,
    }

    impl FrameSlot {
        fn paused() -> Self {
            let slot = Self::default();
            slot.paused.store(true, Ordering::SeqCst);
            slot
        }

        fn publish(&self, frame: Bitmap) {
            if let Ok(mut latest) = self.latest.lock() {
                *latest = Some(frame);
            }
            self.received_any.store(true, Ordering::SeqCst);
        }

        fn take(&self) -> Option<Bitmap> {
            self.latest.lock().ok().and_then(|mut latest| latest.take())
        }
    }

    /// Read whole frames from `reader` until EOF or close.
    ///
    /// Reading stops while the slot is paused, so the decoder blocks on a full
    /// pipe instead of running ahead. Returns the number of frames published.
    pub fn pump_frames<R: Read>(
        mut reader: R,
        width: u32,
        height: u32,
        slot: &FrameSlot,
    ) -> Result<u64, VideoError> {
        let frame_len = width as usize * height as usize * 4;
        if frame_len == 0 {
            return Err(VideoError::Io(format!("invalid frame size {width}x{height}")));
        }

        let mut published = 0;
        let mut buf = vec![0u8; frame_len];
        loop {
            if slot.closed.load(Ordering::SeqCst) {
                return Ok(published);
            }
            if slot.paused.load(Ordering::SeqCst) {
                std::thread::sleep(PAUSE_POLL);
                continue;
            }
            match reader.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(published),
                Err(e) => return Err(VideoError::Io(e.to_string())),
            }
            let frame = Bitmap::from_rgba8(width, height, buf.clone())
                .map_err(|e| VideoError::Io(e.to_string()))?;
            slot.publish(frame);
            published += 1;
        }
    }

    /// A video decoded by an `ffmpeg` child process.
    pub struct FfmpegVideoSource {
        url: String,
        child: Option<Child>,
        slot: Arc<FrameSlot>,
    }

    impl VideoSource for FfmpegVideoSource {
        fn url(&self) -> &str {
            &self.url
        }

        fn play(&mut self) {
            self.slot.paused.store(false, Ordering::SeqCst);
        }

        fn pause(&mut self) {
            self.slot.paused.store(true, Ordering::SeqCst);
        }

        fn is_paused(&self) -> bool {
            self.slot.paused.load(Ordering::SeqCst)
        }

        fn ready_state(&self) -> ReadyState {
            if self.slot.received_any.load(Ordering::SeqCst) {
                ReadyState::HaveEnoughData
            } else {
                ReadyState::HaveNothing
            }
        }

        fn current_frame(&mut self) -> Option<Bitmap> {
            self.slot.take()
        }

        fn close(&mut self) {
            self.slot.closed.store(true, Ordering::SeqCst);
            if let Some(child) = self.child.take() {
                discard_child(child);
                log::info!("Stopped ffmpeg for {}", self.url);
            }
        }
    }

    impl Drop for FfmpegVideoSource {
        fn drop(&mut self) {
            self.close();
        }
    }

    /// Opens [`FfmpegVideoSource`]s at a fixed decode size.
    #[derive(Debug, Clone)]
    pub struct FfmpegSourceFactory {
        width: u32,
        height: u32,
        /// Result of the first `ffmpeg -version` check.
        ffmpeg_found: OnceLock<bool>,
    }

    impl FfmpegSourceFactory {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ffmpeg_found: OnceLock::new(),
            }
        }

        /// Whether `ffmpeg` can be run. Checked once per factory.
        pub fn ffmpeg_available(&self) -> bool {
            *self.ffmpeg_found.get_or_init(|| {
                let found = is_ffmpeg_on_path();
                if !found {
                    log::warn!("ffmpeg was not found on PATH, video is disabled");
                }
                found
            })
        }
    }

    impl VideoSourceFactory for FfmpegSourceFactory {
        fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, VideoError> {
            if !self.ffmpeg_available() {
                return Err(VideoError::Unavailable("ffmpeg was not found on PATH".into()));
            }

            let mut child = Command::new("ffmpeg")
                .args(ffmpeg_args(url, self.width, self.height))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .map_err(|e| VideoError::Spawn(e.to_string()))?;
            let Some(stdout) = child.stdout.take() else {
                discard_child(child);
                return Err(VideoError::Spawn("ffmpeg stdout was not captured".into()));
            };

            let slot = Arc::new(FrameSlot::paused());
            let reader_slot = slot.clone();
            let (width, height) = (self.width, self.height);
            let thread_url = url.to_string();
            let reader = std::thread::Builder::new()
                .name("ffmpeg-frames".into())
                .spawn(move || match pump_frames(stdout, width, height, &reader_slot) {
                    Ok(frames) => log::debug!("ffmpeg stream ended after {} frames", frames),
                    Err(e) => log::error!("Video decode failed for {}: {}", thread_url, e),
                });
            if let Err(e) = reader {
                slot.closed.store(true, Ordering::SeqCst);
                discard_child(child);
                return Err(VideoError::Io(e.to_string()));
            }

            log::info!("Started ffmpeg for {} at {}x{}", url, width, height);
            Ok(Box::new(FfmpegVideoSource {
                url: url.to_string(),
                child: Some(child),
                slot,
            }))
        }
    }

    /// Ask the user for an image file. `Ok(None)` when the dialog was cancelled.
    #[cfg(feature = "native")]
    pub fn pick_image_file() -> std::io::Result<Option<ImageFile>> {
        let dialog = rfd::FileDialog::new()
            .set_title("Upload Image")
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "gif", "bmp"]);

        let Some(path) = dialog.pick_file() else {
            return Ok(None);
        };
        let bytes = std::fs::read(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("Picked image {:?} ({} bytes)", path, bytes.len());
        Ok(Some(ImageFile { name, bytes }))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::Cursor;

        #[test]
        fn test_ffmpeg_args() {
            let args = ffmpeg_args("clip.mp4", 640, 360);
            assert_eq!(args[6], "clip.mp4");
            assert!(args.contains(&"scale=640:360".to_string()));
            assert!(args.contains(&"-an".to_string()));
            assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        }

        #[test]
        fn test_pump_frames_publishes_latest() {
            let mut bytes = vec![10u8; 2 * 2 * 4];
            bytes.extend(vec![20u8; 2 * 2 * 4]);
            let slot = FrameSlot::default();

            let frames = pump_frames(Cursor::new(bytes), 2, 2, &slot).unwrap();
            assert_eq!(frames, 2);
            assert!(slot.received_any.load(Ordering::SeqCst));
            let frame = slot.take().unwrap();
            assert_eq!(frame.data()[0], 20);
            assert!(slot.take().is_none());
        }

        #[test]
        fn test_pump_frames_drops_partial_tail() {
            let mut bytes = vec![1u8; 4 * 4];
            bytes.extend(vec![2u8; 5]);
            let slot = FrameSlot::default();

            assert_eq!(pump_frames(Cursor::new(bytes), 2, 2, &slot).unwrap(), 1);
        }

        #[test]
        fn test_pump_frames_stops_when_closed() {
            let slot = FrameSlot::paused();
            slot.closed.store(true, Ordering::SeqCst);
            assert_eq!(pump_frames(Cursor::new(vec![0u8; 16]), 2, 2, &slot).unwrap(), 0);
            assert!(slot.take().is_none());
        }

        #[test]
        fn test_pump_frames_rejects_zero_size() {
            let slot = FrameSlot::default();
            assert!(matches!(
                pump_frames(Cursor::new(Vec::new()), 0, 10, &slot),
                Err(VideoError::Io(_))
            ));
        }

        #[test]
        fn test_open_without_ffmpeg_is_unavailable() {
            let factory = FfmpegSourceFactory {
                width: 64,
                height: 64,
                ffmpeg_found: OnceLock::from(false),
            };
            assert!(!factory.ffmpeg_available());
            assert!(matches!(
                factory.open("clip.mp4"),
                Err(VideoError::Unavailable(_))
            ));
        }

        #[cfg(unix)]
        #[test]
        fn test_discard_child_stops_process() {
            let child = Command::new("sleep")
                .arg("30")
                .stdout(Stdio::null())
                .spawn()
                .unwrap();
            let status = discard_child(child).unwrap();
            assert!(!status.success());
        }

        #[test]
        fn test_source_ready_after_first_frame() {
            let slot = Arc::new(FrameSlot::paused());
            let mut source = FfmpegVideoSource {
                url: "clip.mp4".into(),
                child: None,
                slot: slot.clone(),
            };
            assert!(source.is_paused());
            assert_eq!(source.ready_state(), ReadyState::HaveNothing);

            source.play();
            assert!(!source.is_paused());
            slot.publish(Bitmap::from_rgba8(1, 1, vec![0, 0, 0, 255]).unwrap());
            assert_eq!(source.ready_state(), ReadyState::HaveEnoughData);
            assert!(source.current_frame().is_some());

            source.close();
            assert!(slot.closed.load(Ordering::SeqCst));
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use easel_core::{Bitmap, ImageFile, ReadyState, VideoError, VideoSource, VideoSourceFactory};
    use std::cell::RefCell;
    use std::sync::Arc;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use winit::window::Window;

    thread_local! {
        static PENDING_IMAGE: RefCell<Option<ImageFile>> = const { RefCell::new(None) };
    }

    fn js_error(context: &str, value: wasm_bindgen::JsValue) -> VideoError {
        VideoError::Unavailable(format!("{context}: {value:?}"))
    }

    /// A looping, muted `<video>` element. Frames are copied through an
    /// offscreen 2D canvas.
    pub struct HtmlVideoSource {
        url: String,
        video: web_sys::HtmlVideoElement,
        canvas: web_sys::HtmlCanvasElement,
        context: web_sys::CanvasRenderingContext2d,
    }

    impl VideoSource for HtmlVideoSource {
        fn url(&self) -> &str {
            &self.url
        }

        fn play(&mut self) {
            match self.video.play() {
                Ok(promise) => {
                    let url = self.url.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
                            log::warn!("Playback of {} was rejected: {:?}", url, e);
                        }
                    });
                }
                Err(e) => log::warn!("Failed to start playback: {:?}", e),
            }
        }

        fn pause(&mut self) {
            if let Err(e) = self.video.pause() {
                log::warn!("Failed to pause video: {:?}", e);
            }
        }

        fn is_paused(&self) -> bool {
            self.video.paused()
        }

        fn ready_state(&self) -> ReadyState {
            ReadyState::from_raw(self.video.ready_state())
        }

        fn current_frame(&mut self) -> Option<Bitmap> {
            let width = self.video.video_width();
            let height = self.video.video_height();
            if width == 0 || height == 0 {
                return None;
            }
            if self.canvas.width() != width || self.canvas.height() != height {
                self.canvas.set_width(width);
                self.canvas.set_height(height);
            }
            self.context
                .draw_image_with_html_video_element(&self.video, 0.0, 0.0)
                .ok()?;
            let pixels = self
                .context
                .get_image_data(0.0, 0.0, width as f64, height as f64)
                .ok()?;
            Bitmap::from_rgba8(width, height, pixels.data().0).ok()
        }

        fn close(&mut self) {
            let _ = self.video.pause();
            let _ = self.video.remove_attribute("src");
            self.video.load();
        }
    }

    /// Opens [`HtmlVideoSource`]s in the current document.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct HtmlVideoSourceFactory;

    impl VideoSourceFactory for HtmlVideoSourceFactory {
        fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, VideoError> {
            let document = web_sys::window()
                .and_then(|w| w.document())
                .ok_or_else(|| VideoError::Unavailable("no document".into()))?;

            let video = document
                .create_element("video")
                .map_err(|e| js_error("create video", e))?
                .dyn_into::<web_sys::HtmlVideoElement>()
                .map_err(|e| js_error("cast video", e.into()))?;
            video.set_cross_origin(Some("anonymous"));
            video.set_loop(true);
            video.set_muted(true);
            let _ = video.set_attribute("playsinline", "");
            video.set_src(url);

            let canvas = document
                .create_element("canvas")
                .map_err(|e| js_error("create canvas", e))?
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map_err(|e| js_error("cast canvas", e.into()))?;
            let context = canvas
                .get_context("2d")
                .map_err(|e| js_error("get 2d context", e))?
                .ok_or_else(|| VideoError::Unavailable("2d context unsupported".into()))?
                .dyn_into::<web_sys::CanvasRenderingContext2d>()
                .map_err(|e| js_error("cast 2d context", e.into()))?;

            log::info!("Opened video element for {}", url);
            Ok(Box::new(HtmlVideoSource {
                url: url.to_string(),
                video,
                canvas,
                context,
            }))
        }
    }

    /// Open the browser file picker. The file arrives later through
    /// [`take_pending_image`], and `window` is asked to redraw once it does.
    pub fn request_image_file(window: Arc<Window>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document for the file picker");
            return;
        };
        let Some(input) = document
            .create_element("input")
            .ok()
            .and_then(|e| e.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            log::error!("Failed to create file input");
            return;
        };

        input.set_type("file");
        input.set_accept("image/*");
        input.style().set_property("display", "none").ok();

        let input_clone = input.clone();
        let onchange = Closure::once(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, window);
            }
            input_clone.remove();
        }) as Box<dyn FnOnce(_)>);

        input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
        onchange.forget();

        if let Some(body) = document.body() {
            body.append_child(&input).ok();
            input.click();
        }
    }

    fn read_file(file: web_sys::File, window: Arc<Window>) {
        let Ok(reader) = web_sys::FileReader::new() else {
            log::error!("Failed to create FileReader");
            return;
        };
        let name = file.name();
        let reader_clone = reader.clone();

        let onload = Closure::once(Box::new(move |_event: web_sys::Event| {
            if let Ok(result) = reader_clone.result() {
                let bytes = js_sys::Uint8Array::new(&result).to_vec();
                log::info!("Read {} ({} bytes)", name, bytes.len());
                PENDING_IMAGE.with(|cell| {
                    *cell.borrow_mut() = Some(ImageFile { name, bytes });
                });
                window.request_redraw();
            }
        }) as Box<dyn FnOnce(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();

        if let Err(e) = reader.read_as_array_buffer(&file) {
            log::error!("Failed to read file: {:?}", e);
        }
    }

    /// Take the image read by the last [`request_image_file`], if it finished.
    pub fn take_pending_image() -> Option<ImageFile> {
        PENDING_IMAGE.with(|cell| cell.borrow_mut().take())
    }
}
