//! Readalong - read web content aloud with word-level highlighting
//!
//! This library provides the core of a read-aloud engine:
//! - Content loading into an addressable tree
//! - Segmentation into a speakable buffer with an offset index
//! - Alignment of playback time to words
//! - Highlight and scroll control
//! - A playback state machine driven per frame
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   buffer    ┌──────────────────────┐
//! │  Segmenter   ├────────────▶│ Synthesis service    │
//! │  + index     │             │ (audio + alignment)  │
//! └──────┬───────┘             └──────────┬───────────┘
//!        │ index                          │ records
//! ┌──────▼────────────────────────────────▼───────────┐
//! │ Narrator: clock ─▶ resolver ─▶ index ─▶ highlight │
//! └───────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod playback;
pub mod segment;
pub mod sync;
pub mod voice;

pub use config::Config;
pub use content::{ContentTree, ElementKind, NodeId};
pub use error::{Error, Result};
pub use playback::{AudioClock, Narrator, PlaybackState};
pub use segment::{Segmentation, Segmenter};
pub use sync::{HighlightSurface, Resolver};
pub use voice::{HttpSynthesizer, Synthesizer};
