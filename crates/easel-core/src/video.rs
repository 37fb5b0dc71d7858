//! Video sources that feed frames into a video node.
//!
//! Platform shells provide real decoders; [`FrameSequence`] is an in-memory
//! source used for tests and headless runs.

use crate::bitmap::Bitmap;
use thiserror::Error;

/// Errors from opening or reading a video source.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video playback unavailable: {0}")]
    Unavailable(String),
    #[error("failed to start decoder: {0}")]
    Spawn(String),
    #[error("video I/O error: {0}")]
    Io(String),
}

/// How much media data a source has buffered. Mirrors the HTML media ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub fn from_raw(value: u16) -> Self {
        match value {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }

    /// True once a frame can be copied out of the source.
    pub fn has_current_data(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// A looping, muted video stream.
pub trait VideoSource {
    fn url(&self) -> &str;

    fn play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// Copy out the frame currently being displayed.
    fn current_frame(&mut self) -> Option<Bitmap>;

    /// Release decoder resources. Called when the video is detached.
    fn close(&mut self) {}
}

/// Opens video sources by URL.
pub trait VideoSourceFactory {
    fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, VideoError>;
}

/// A source that loops over a fixed list of frames, advancing one frame per read while playing.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    url: String,
    frames: Vec<Bitmap>,
    cursor: usize,
    paused: bool,
    ready_state: ReadyState,
}

impl FrameSequence {
    /// A paused sequence. It reports `HaveEnoughData` when it has frames.
    pub fn new(url: impl Into<String>, frames: Vec<Bitmap>) -> Self {
        let ready_state = if frames.is_empty() {
            ReadyState::HaveNothing
        } else {
            ReadyState::HaveEnoughData
        };
        Self {
            url: url.into(),
            frames,
            cursor: 0,
            paused: true,
            ready_state,
        }
    }

    /// Override the reported ready state, e.g. to simulate buffering.
    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    pub fn with_ready_state(mut self, state: ReadyState) -> Self {
        self.ready_state = state;
        self
    }
}

impl VideoSource for FrameSequence {
    fn url(&self) -> &str {
        &self.url
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn current_frame(&mut self) -> Option<Bitmap> {
        let frame = self.frames.get(self.cursor)?.clone();
        if !self.paused {
            self.cursor = (self.cursor + 1) % self.frames.len();
        }
        Some(frame)
    }
}

/// Factory handing out [`FrameSequence`]s over the same frames.
#[derive(Debug, Clone, Default)]
pub struct FrameSequenceFactory {
    frames: Vec<Bitmap>,
    ready_state: Option<ReadyState>,
}

impl FrameSequenceFactory {
    pub fn new(frames: Vec<Bitmap>) -> Self {
        Self {
            frames,
            ready_state: None,
        }
    }

    pub fn with_ready_state(mut self, state: ReadyState) -> Self {
        self.ready_state = Some(state);
        self
    }
}

impl VideoSourceFactory for FrameSequenceFactory {
    fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, VideoError> {
        let mut sequence = FrameSequence::new(url, self.frames.clone());
        if let Some(state) = self.ready_state {
            sequence.set_ready_state(state);
        }
        Ok(Box::new(sequence))
    }
}

/// Factory for platforms without video support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVideo;

impl VideoSourceFactory for NoVideo {
    fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, VideoError> {
        Err(VideoError::Unavailable(format!("no decoder for {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::SerializableColor;

    fn frames(n: u8) -> Vec<Bitmap> {
        (0..n)
            .map(|i| Bitmap::solid(1, 1, SerializableColor::new(i, 0, 0, 255)).unwrap())
            .collect()
    }

    #[test]
    fn test_ready_state_ordering() {
        assert!(!ReadyState::HaveMetadata.has_current_data());
        assert!(ReadyState::HaveCurrentData.has_current_data());
        assert!(ReadyState::HaveEnoughData.has_current_data());
        assert_eq!(ReadyState::from_raw(2), ReadyState::HaveCurrentData);
        assert_eq!(ReadyState::from_raw(9), ReadyState::HaveEnoughData);
    }

    #[test]
    fn test_sequence_starts_paused() {
        let mut seq = FrameSequence::new("clip.mp4", frames(3));
        assert!(seq.is_paused());
        let a = seq.current_frame().unwrap();
        let b = seq.current_frame().unwrap();
        assert_eq!(a.generation(), b.generation());
    }

    #[test]
    fn test_sequence_loops_while_playing() {
        let mut seq = FrameSequence::new("clip.mp4", frames(2));
        seq.play();
        let reds: Vec<u8> = (0..5).map(|_| seq.current_frame().unwrap().data()[0]).collect();
        assert_eq!(reds, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_empty_sequence() {
        let mut seq = FrameSequence::new("clip.mp4", Vec::new());
        assert_eq!(seq.ready_state(), ReadyState::HaveNothing);
        assert!(seq.current_frame().is_none());
    }

    #[test]
    fn test_factory_applies_ready_state() {
        let factory = FrameSequenceFactory::new(frames(1)).with_ready_state(ReadyState::HaveMetadata);
        let source = factory.open("clip.mp4").unwrap();
        assert_eq!(source.url(), "clip.mp4");
        assert_eq!(source.ready_state(), ReadyState::HaveMetadata);
    }

    #[test]
    fn test_no_video_factory() {
        assert!(matches!(NoVideo.open("clip.mp4"), Err(VideoError::Unavailable(_))));
    }
}
