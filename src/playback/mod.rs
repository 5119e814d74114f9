//! Playback state machine
//!
//! A [`Narrator`] owns everything one read-aloud session touches: the content
//! tree, the audio clock, the highlight pointer and the tick loop. Hosts feed
//! it commands (`play`, `pause`, `stop`), synthesis results and frame
//! callbacks, and read back a [`PlaybackState`].
//!
//! ```text
//! Idle ──play──▶ Generating ──ok──▶ Reading ⇄ Paused
//!  ▲                 │                 │
//!  │               fail              stop/end
//!  └── ack/play ── Error               ▼
//!                                     Idle
//! ```

mod clock;
mod driver;

use uuid::Uuid;

use crate::content::{ContentTree, NodeId};
use crate::segment::{Segmentation, Segmenter};
use crate::sync::{
    Alignment, FrameScheduler, HighlightController, HighlightSurface, Resolver, TickLoop,
    TickToken, estimate_alignment, estimate_duration,
};
use crate::voice::{SynthesisRequest, SynthesizedAudio};
use crate::{Error, Result};

pub use clock::{AudioClock, AudioSource, ManualClock, WallClock};
pub use driver::{Command, Driver, forward_ctrl_c};

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Generating,
    Reading,
    Paused,
    Error,
}

impl PlaybackState {
    /// Status text shown next to the play control
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Listen to this article",
            Self::Generating => "Generating...",
            Self::Reading => "Reading...",
            Self::Paused => "Paused",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Synthesis work the host must run and report back
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisJob {
    /// Session the result belongs to
    pub id: Uuid,
    pub request: SynthesisRequest,
}

/// What happened on one frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Highlight updated, next frame requested
    Continue,
    /// Audio is not running; the loop stopped
    Halted,
    /// The frame belonged to a superseded loop and was ignored
    Stale,
    /// Audio ended; the session is over
    Ended,
}

/// Segmentation and timings of the audio currently loaded
#[derive(Debug)]
struct Session {
    id: Uuid,
    segmentation: Segmentation,
    alignment: Alignment,
}

/// Synthesis in flight
#[derive(Debug)]
struct Pending {
    id: Uuid,
    segmentation: Segmentation,
}

/// Read-aloud controller for one content tree
pub struct Narrator<C> {
    tree: ContentTree,
    segmenter: Segmenter,
    resolver: Resolver,
    highlight: HighlightController,
    ticks: TickLoop,
    clock: C,
    voice: String,
    rate: f64,
    state: PlaybackState,
    pending: Option<Pending>,
    session: Option<Session>,
    last_error: Option<Error>,
}

impl<C: AudioClock> Narrator<C> {
    /// Create an idle narrator with default tuning
    #[must_use]
    pub fn new(tree: ContentTree, clock: C, voice: impl Into<String>, rate: f64) -> Self {
        Self {
            tree,
            segmenter: Segmenter::default(),
            resolver: Resolver::default(),
            highlight: HighlightController::default(),
            ticks: TickLoop::new(),
            clock,
            voice: voice.into(),
            rate,
            state: PlaybackState::Idle,
            pending: None,
            session: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    #[must_use]
    pub const fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_highlight(mut self, highlight: HighlightController) -> Self {
        self.highlight = highlight;
        self
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Status text for the current state
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        self.state.label()
    }

    /// Element currently highlighted
    #[must_use]
    pub const fn active_element(&self) -> Option<NodeId> {
        self.highlight.active()
    }

    /// Id of the loaded or pending session
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        self.session
            .as_ref()
            .map(|s| s.id)
            .or_else(|| self.pending.as_ref().map(|p| p.id))
    }

    /// Segmentation the loaded audio was synthesized from
    #[must_use]
    pub fn segmentation(&self) -> Option<&Segmentation> {
        self.session.as_ref().map(|s| &s.segmentation)
    }

    /// Whether a tick loop is registered
    #[must_use]
    pub const fn is_ticking(&self) -> bool {
        self.ticks.is_running()
    }

    /// Error that moved the narrator into `Error`
    #[must_use]
    pub const fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub const fn tree(&self) -> &ContentTree {
        &self.tree
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Handle a play command
    ///
    /// Resumes when paused. Otherwise any running session is stopped first,
    /// the content is segmented again and a synthesis job is returned for the
    /// host to run. Returns `None` when nothing needs synthesizing.
    pub fn request_play<S, F>(&mut self, surface: &mut S, scheduler: &mut F) -> Option<SynthesisJob>
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        match self.state {
            PlaybackState::Paused => {
                self.resume(surface, scheduler);
                return None;
            }
            PlaybackState::Reading | PlaybackState::Generating => self.stop(surface, scheduler),
            PlaybackState::Error => {
                self.acknowledge_error();
            }
            PlaybackState::Idle => {}
        }

        let segmentation = self.segmenter.segment(&mut self.tree);
        if segmentation.is_empty() {
            tracing::warn!("no speakable content, nothing to read");
            return None;
        }
        surface.prepare(&segmentation);

        let id = Uuid::new_v4();
        let request = SynthesisRequest {
            text: segmentation.buffer().to_string(),
            voice: self.voice.clone(),
            rate: self.rate,
        };
        self.pending = Some(Pending { id, segmentation });
        self.transition(PlaybackState::Generating);
        tracing::info!(session = %id, chars = request.text.chars().count(), "requesting synthesis");

        Some(SynthesisJob { id, request })
    }

    /// Deliver the result of a synthesis job
    ///
    /// Results for jobs that were stopped or superseded are dropped and
    /// `false` is returned. Failures move the narrator to `Error`.
    pub fn complete_synthesis<S, F>(
        &mut self,
        id: Uuid,
        result: Result<SynthesizedAudio>,
        surface: &mut S,
        scheduler: &mut F,
    ) -> bool
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        let Some(pending) = self.pending.take_if(|p| p.id == id) else {
            tracing::debug!(session = %id, "dropping result of superseded synthesis");
            return false;
        };

        match self.load(pending, result) {
            Ok(()) => {
                self.transition(PlaybackState::Reading);
                self.ticks.start(scheduler);
            }
            Err(e) => self.fail(e, surface, scheduler),
        }
        true
    }

    fn load(&mut self, pending: Pending, result: Result<SynthesizedAudio>) -> Result<()> {
        let audio = result?;
        let Pending { id, segmentation } = pending;

        let byte_duration = audio.bytes.as_deref().map(|b| estimate_duration(b.len()));
        let records = if audio.alignment.is_empty() {
            let Some(duration) = byte_duration else {
                return Err(Error::SynthesisFailed(
                    "response carried neither alignment nor audio".to_string(),
                ));
            };
            tracing::warn!(session = %id, duration, "no alignment returned, estimating word timings");
            estimate_alignment(segmentation.buffer(), duration)
        } else {
            audio.alignment
        };
        let alignment = Alignment::new(records)?;
        let duration = alignment.duration().max(byte_duration.unwrap_or(0.0));

        self.clock.reset();
        self.clock.load(AudioSource {
            url: audio.url,
            bytes: audio.bytes,
            duration,
        })?;
        self.clock.play()?;

        tracing::info!(session = %id, records = alignment.len(), duration, "reading");
        self.session = Some(Session {
            id,
            segmentation,
            alignment,
        });
        Ok(())
    }

    fn resume<S, F>(&mut self, surface: &mut S, scheduler: &mut F)
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if let Err(e) = self.clock.play() {
            self.fail(e, surface, scheduler);
            return;
        }
        self.transition(PlaybackState::Reading);
        self.ticks.start(scheduler);
    }

    /// Handle a pause command
    ///
    /// Only meaningful while reading; the highlight stays where it is.
    pub fn pause<F: FrameScheduler + ?Sized>(&mut self, scheduler: &mut F) {
        if self.state != PlaybackState::Reading {
            return;
        }
        self.ticks.cancel(scheduler);
        self.clock.pause();
        self.transition(PlaybackState::Paused);
    }

    /// Handle a stop command
    ///
    /// Cancels the tick loop, rewinds the audio, clears the highlight and
    /// forgets the session. A synthesis job still in flight is abandoned and
    /// a pending error is dismissed.
    pub fn stop<S, F>(&mut self, surface: &mut S, scheduler: &mut F)
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        self.ticks.cancel(scheduler);
        self.clock.reset();
        self.highlight.clear(surface);
        self.session = None;
        self.pending = None;
        if self.last_error.take().is_some() {
            tracing::debug!("error dismissed by stop");
        }
        self.transition(PlaybackState::Idle);
    }

    /// Leave `Error` after the user has seen it
    ///
    /// Returns the error that caused it.
    pub fn acknowledge_error(&mut self) -> Option<Error> {
        if self.state != PlaybackState::Error {
            return None;
        }
        self.transition(PlaybackState::Idle);
        self.last_error.take()
    }

    /// Run one frame of the tick loop
    ///
    /// Resolves the playhead to a word and moves the highlight there, then
    /// requests the next frame. Frames from a cancelled loop are ignored.
    pub fn on_frame<S, F>(&mut self, token: TickToken, surface: &mut S, scheduler: &mut F) -> FrameOutcome
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if !self.ticks.accepts(token) {
            return FrameOutcome::Stale;
        }
        if self.state != PlaybackState::Reading {
            self.ticks.cancel(scheduler);
            return FrameOutcome::Halted;
        }
        let Some(session) = self.session.as_ref() else {
            self.ticks.cancel(scheduler);
            return FrameOutcome::Halted;
        };

        if self.clock.has_ended() {
            tracing::info!(session = %session.id, "finished reading");
            self.finish(surface, scheduler);
            return FrameOutcome::Ended;
        }
        if self.clock.is_paused() {
            self.ticks.cancel(scheduler);
            self.transition(PlaybackState::Paused);
            return FrameOutcome::Halted;
        }

        let time = self.clock.current_time();
        let element = self
            .resolver
            .resolve(&session.alignment, time)
            .and_then(|record| session.segmentation.owner_of(record.text_offset))
            .map(|token| token.element);
        self.highlight.update(surface, element);

        self.ticks.reschedule(scheduler, token);
        FrameOutcome::Continue
    }

    fn finish<S, F>(&mut self, surface: &mut S, scheduler: &mut F)
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        self.ticks.cancel(scheduler);
        self.highlight.clear(surface);
        self.clock.reset();
        self.session = None;
        self.transition(PlaybackState::Idle);
    }

    fn fail<S, F>(&mut self, error: Error, surface: &mut S, scheduler: &mut F)
    where
        S: HighlightSurface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        tracing::error!(error = %error, recoverable = error.is_recoverable(), "playback session failed");
        self.ticks.cancel(scheduler);
        self.highlight.clear(surface);
        self.clock.reset();
        self.session = None;
        self.pending = None;
        self.last_error = Some(error);
        self.transition(PlaybackState::Error);
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "playback state");
            self.state = next;
        }
    }
}
