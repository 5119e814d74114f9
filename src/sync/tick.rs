//! Cancellable per-frame tick loop
//!
//! A tick loop is a chain of one-shot frame requests: each frame handled
//! while the loop is current requests the next one. Every start hands out a
//! fresh [`TickToken`]; cancelling withdraws the pending request from the
//! scheduler and retires the token, so a frame that still fires for an old
//! token is recognized as stale and does nothing.

/// Identifies one run of a tick loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

/// Delivers frame callbacks at display cadence
pub trait FrameScheduler {
    /// Ask for one frame callback carrying `token`
    fn request(&mut self, token: TickToken);

    /// Withdraw any pending callback for `token`
    fn cancel(&mut self, token: TickToken);
}

/// Generation-counted handle to the current tick loop
#[derive(Debug, Default)]
pub struct TickLoop {
    generation: u64,
    current: Option<TickToken>,
}

impl TickLoop {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: 0,
            current: None,
        }
    }

    /// Start a new loop, cancelling any running one first
    pub fn start<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) -> TickToken {
        self.cancel(scheduler);
        self.generation += 1;
        let token = TickToken(self.generation);
        self.current = Some(token);
        scheduler.request(token);
        token
    }

    /// Stop the running loop; calling it again is a no-op
    pub fn cancel<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(token) = self.current.take() {
            scheduler.cancel(token);
        }
    }

    /// Whether a frame carrying `token` belongs to the running loop
    #[must_use]
    pub fn accepts(&self, token: TickToken) -> bool {
        self.current == Some(token)
    }

    /// Request the next frame if `token` is still current
    pub fn reschedule<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S, token: TickToken) -> bool {
        if !self.accepts(token) {
            return false;
        }
        scheduler.request(token);
        true
    }

    /// Whether a loop is running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.current.is_some()
    }
}

/// Scheduler that queues requests until the host pumps a frame
///
/// Used by the async driver on every display interval and by tests to step
/// frames deterministically.
#[derive(Debug, Default)]
pub struct FrameQueue {
    pending: Vec<TickToken>,
}

impl FrameQueue {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Take every request queued for the next frame
    pub fn take(&mut self) -> Vec<TickToken> {
        std::mem::take(&mut self.pending)
    }

    /// Number of pending requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no request is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl FrameScheduler for FrameQueue {
    fn request(&mut self, token: TickToken) {
        if !self.pending.contains(&token) {
            self.pending.push(token);
        }
    }

    fn cancel(&mut self, token: TickToken) {
        self.pending.retain(|&t| t != token);
    }
}
