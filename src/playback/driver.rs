//! Async host loop for a narrator
//!
//! Multiplexes user commands, finished synthesis requests and display frames
//! on a single task, so narrator state is only ever touched from one place.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::{AudioClock, FrameOutcome, Narrator, PlaybackState, SynthesisJob};
use crate::sync::{FrameQueue, HighlightSurface};
use crate::voice::{SynthesizedAudio, Synthesizer};
use crate::Result;

/// Commands exposed to the UI collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    /// Leave the run loop
    Quit,
}

type Finished = (Uuid, Result<SynthesizedAudio>);

/// Drives a narrator from a tokio runtime
pub struct Driver<C, S> {
    narrator: Narrator<C>,
    surface: S,
    synthesizer: Arc<dyn Synthesizer>,
    frames: FrameQueue,
    frame_interval: Duration,
    exit_when_idle: bool,
}

impl<C: AudioClock, S: HighlightSurface> Driver<C, S> {
    /// Create a driver ticking at `frame_rate` frames per second
    #[must_use]
    pub fn new(
        narrator: Narrator<C>,
        surface: S,
        synthesizer: Arc<dyn Synthesizer>,
        frame_rate: u32,
    ) -> Self {
        Self {
            narrator,
            surface,
            synthesizer,
            frames: FrameQueue::new(),
            frame_interval: Duration::from_secs(1) / frame_rate.max(1),
            exit_when_idle: false,
        }
    }

    /// Return from [`Driver::run`] once a session has ended, failed or been
    /// stopped
    #[must_use]
    pub const fn exit_when_idle(mut self, exit: bool) -> Self {
        self.exit_when_idle = exit;
        self
    }

    #[must_use]
    pub const fn narrator(&self) -> &Narrator<C> {
        &self.narrator
    }

    pub const fn narrator_mut(&mut self) -> &mut Narrator<C> {
        &mut self.narrator
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Process commands until `Quit`, the channel closes, or the session is
    /// over when `exit_when_idle` is set
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        let (done_tx, mut done_rx) = mpsc::channel::<Finished>(4);
        let mut inflight: Option<(Uuid, JoinHandle<()>)> = None;
        let mut started = false;

        let mut interval = tokio::time::interval(self.frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("command channel closed");
                        break;
                    };
                    tracing::debug!(?command, state = ?self.narrator.state(), "command");
                    match command {
                        Command::Play => {
                            started = true;
                            if let Some(job) = self.narrator.request_play(&mut self.surface, &mut self.frames) {
                                abort(inflight.take());
                                let id = job.id;
                                inflight = Some((id, self.spawn_synthesis(job, done_tx.clone())));
                            }
                        }
                        Command::Pause => self.narrator.pause(&mut self.frames),
                        Command::Stop => {
                            abort(inflight.take());
                            self.narrator.stop(&mut self.surface, &mut self.frames);
                        }
                        Command::Quit => break,
                    }
                }
                Some((id, result)) = done_rx.recv() => {
                    if inflight.as_ref().is_some_and(|(current, _)| *current == id) {
                        inflight = None;
                    }
                    self.narrator.complete_synthesis(id, result, &mut self.surface, &mut self.frames);
                }
                _ = interval.tick() => {
                    for token in self.frames.take() {
                        let outcome = self.narrator.on_frame(token, &mut self.surface, &mut self.frames);
                        if outcome == FrameOutcome::Stale {
                            tracing::trace!(?token, "stale frame");
                        }
                    }
                }
            }

            if self.exit_when_idle && started && inflight.is_none() && self.is_settled() {
                break;
            }
        }

        abort(inflight);
    }

    const fn is_settled(&self) -> bool {
        matches!(
            self.narrator.state(),
            PlaybackState::Idle | PlaybackState::Error
        )
    }

    fn spawn_synthesis(&self, job: SynthesisJob, done: mpsc::Sender<Finished>) -> JoinHandle<()> {
        let synthesizer = Arc::clone(&self.synthesizer);
        tokio::spawn(async move {
            let result = synthesizer.synthesize(&job.request).await;
            if done.send((job.id, result)).await.is_err() {
                tracing::debug!(session = %job.id, "driver gone, dropping synthesis result");
            }
        })
    }
}

fn abort(inflight: Option<(Uuid, JoinHandle<()>)>) {
    if let Some((id, handle)) = inflight {
        tracing::debug!(session = %id, "abandoning synthesis");
        handle.abort();
    }
}

/// Spawn a task that turns Ctrl-C into `Stop` then `Quit`
pub fn forward_ctrl_c(commands: mpsc::Sender<Command>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted, stopping");
                let _ = commands.send(Command::Stop).await;
                let _ = commands.send(Command::Quit).await;
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for ctrl-c"),
        }
    })
}
