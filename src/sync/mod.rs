//! Playback synchronization
//!
//! Resolves the audio clock to the word being spoken and keeps the highlight
//! on it.

mod alignment;
mod highlight;
mod terminal;
mod tick;

pub use alignment::{
    Alignment, AlignmentRecord, DEFAULT_LATENCY_BIAS, Resolver, estimate_alignment,
    estimate_duration, resolve,
};
pub use highlight::{HighlightChange, HighlightController, HighlightSurface, Rect, ScrollBand};
pub use terminal::TerminalSurface;
pub use tick::{FrameQueue, FrameScheduler, TickLoop, TickToken};
