//! Redraw scheduling and the video streaming state machine.

use crate::shapes::NodeId;
use crate::video::VideoSource;
use std::fmt;

/// How urgently the canvas should be repainted.
///
/// Ordered so that `Immediate` wins when both are requested in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Redraw {
    /// Coalesce with the next animation frame.
    Batched,
    /// Repaint as soon as possible.
    Immediate,
}

/// Pending redraw request, merged across mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawQueue {
    pending: Option<Redraw>,
}

impl RedrawQueue {
    pub fn request(&mut self, redraw: Redraw) {
        self.pending = self.pending.max(Some(redraw));
    }

    pub fn take(&mut self) -> Option<Redraw> {
        self.pending.take()
    }
}

/// Whether the per-frame callback should schedule itself again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

/// An attached video and its source.
pub struct Stream {
    pub node: NodeId,
    pub source: Box<dyn VideoSource>,
    pub frames_copied: u64,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("node", &self.node)
            .field("url", &self.source.url())
            .field("paused", &self.source.is_paused())
            .field("frames_copied", &self.frames_copied)
            .finish()
    }
}

/// Video streaming state. At most one stream exists at a time.
#[derive(Debug, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming(Stream),
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, StreamState::Streaming(_))
    }

    /// The video node being fed, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            StreamState::Idle => None,
            StreamState::Streaming(stream) => Some(stream.node),
        }
    }

    pub fn stream(&self) -> Option<&Stream> {
        match self {
            StreamState::Idle => None,
            StreamState::Streaming(stream) => Some(stream),
        }
    }

    pub fn stream_mut(&mut self) -> Option<&mut Stream> {
        match self {
            StreamState::Idle => None,
            StreamState::Streaming(stream) => Some(stream),
        }
    }

    /// Return to `Idle`, handing back the stream that was running.
    pub fn stop(&mut self) -> Option<Stream> {
        match std::mem::take(self) {
            StreamState::Idle => None,
            StreamState::Streaming(stream) => Some(stream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::FrameSequence;
    use uuid::Uuid;

    #[test]
    fn test_immediate_wins() {
        let mut queue = RedrawQueue::default();
        queue.request(Redraw::Batched);
        queue.request(Redraw::Immediate);
        queue.request(Redraw::Batched);
        assert_eq!(queue.take(), Some(Redraw::Immediate));
        assert_eq!(queue.take(), None);
    }

    #[test]
    fn test_batched_only() {
        let mut queue = RedrawQueue::default();
        assert_eq!(queue.take(), None);
        queue.request(Redraw::Batched);
        assert_eq!(queue.take(), Some(Redraw::Batched));
    }

    #[test]
    fn test_stream_state_stop() {
        let node = Uuid::new_v4();
        let mut state = StreamState::Streaming(Stream {
            node,
            source: Box::new(FrameSequence::new("clip.mp4", Vec::new())),
            frames_copied: 0,
        });
        assert!(state.is_streaming());
        assert_eq!(state.node(), Some(node));

        let stream = state.stop().unwrap();
        assert_eq!(stream.node, node);
        assert!(!state.is_streaming());
        assert!(state.stop().is_none());
    }
}
