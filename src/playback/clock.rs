//! Audio clocks
//!
//! The narrator never touches an audio device directly. It loads a source
//! into an [`AudioClock`], starts and pauses it, and reads its playhead once
//! per frame.

use tokio::time::Instant;
use url::Url;

use crate::{Error, Result};

/// Audio resource handed to a clock
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    /// Where the audio lives
    pub url: Url,
    /// Encoded audio, when it was downloaded
    pub bytes: Option<Vec<u8>>,
    /// Expected duration in seconds
    pub duration: f64,
}

/// Playhead of the single audio handle owned by a narrator
pub trait AudioClock {
    /// Load a new source, replacing the current one
    ///
    /// # Errors
    ///
    /// Returns `PlaybackFailed` if the source cannot be decoded.
    fn load(&mut self, source: AudioSource) -> Result<()>;

    /// Start or resume playback
    ///
    /// # Errors
    ///
    /// Returns `PlaybackFailed` if the output refuses to start.
    fn play(&mut self) -> Result<()>;

    /// Suspend playback, keeping the playhead
    fn pause(&mut self);

    /// Stop and rewind to zero
    fn reset(&mut self);

    /// Playhead position in seconds
    fn current_time(&self) -> f64;

    /// Whether playback is suspended
    fn is_paused(&self) -> bool;

    /// Whether the playhead reached the end of the source
    fn has_ended(&self) -> bool;
}

/// Clock moved by hand
///
/// Time only changes through [`ManualClock::advance`] and
/// [`ManualClock::seek`], which makes frame-by-frame behavior reproducible.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    source: Option<AudioSource>,
    time: f64,
    playing: bool,
    fail_play: Option<String>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the playhead forward if playing
    pub fn advance(&mut self, seconds: f64) {
        if self.playing {
            self.time += seconds;
        }
    }

    /// Jump the playhead regardless of play state
    pub const fn seek(&mut self, seconds: f64) {
        self.time = seconds;
    }

    /// Make the next `play` fail with `reason`
    pub fn fail_next_play(&mut self, reason: impl Into<String>) {
        self.fail_play = Some(reason.into());
    }

    /// Currently loaded source
    #[must_use]
    pub const fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }
}

impl AudioClock for ManualClock {
    fn load(&mut self, source: AudioSource) -> Result<()> {
        self.source = Some(source);
        self.time = 0.0;
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if let Some(reason) = self.fail_play.take() {
            return Err(Error::PlaybackFailed(reason));
        }
        if self.source.is_none() {
            return Err(Error::PlaybackFailed("no audio loaded".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn reset(&mut self) {
        self.playing = false;
        self.time = 0.0;
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_paused(&self) -> bool {
        !self.playing
    }

    fn has_ended(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|s| self.time >= s.duration)
    }
}

/// Clock that follows wall time without producing sound
///
/// Used when no output device is available: highlighting runs at the pace
/// the audio would have played.
#[derive(Debug, Clone, Default)]
pub struct WallClock {
    duration: Option<f64>,
    /// Time accumulated before the current run
    elapsed: f64,
    started: Option<Instant>,
}

impl WallClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioClock for WallClock {
    fn load(&mut self, source: AudioSource) -> Result<()> {
        tracing::debug!(url = %source.url, duration = source.duration, "simulating playback");
        self.duration = Some(source.duration);
        self.elapsed = 0.0;
        self.started = None;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.duration.is_none() {
            return Err(Error::PlaybackFailed("no audio loaded".to_string()));
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed().as_secs_f64();
        }
    }

    fn reset(&mut self) {
        self.started = None;
        self.elapsed = 0.0;
    }

    fn current_time(&self) -> f64 {
        let running = self.started.map_or(0.0, |s| s.elapsed().as_secs_f64());
        let time = self.elapsed + running;
        self.duration.map_or(time, |d| time.min(d))
    }

    fn is_paused(&self) -> bool {
        self.started.is_none()
    }

    fn has_ended(&self) -> bool {
        self.duration.is_some_and(|d| self.current_time() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(duration: f64) -> AudioSource {
        AudioSource {
            url: Url::parse("http://localhost:8002/audio/a.mp3").unwrap(),
            bytes: None,
            duration,
        }
    }

    #[test]
    fn manual_clock_only_moves_while_playing() {
        let mut clock = ManualClock::new();
        clock.load(source(2.0)).unwrap();
        clock.advance(1.0);
        assert!(clock.current_time().abs() < f64::EPSILON);

        clock.play().unwrap();
        clock.advance(1.5);
        clock.pause();
        clock.advance(1.0);
        assert!((clock.current_time() - 1.5).abs() < f64::EPSILON);
        assert!(!clock.has_ended());

        clock.play().unwrap();
        clock.advance(0.5);
        assert!(clock.has_ended());
    }

    #[test]
    fn manual_clock_reset_rewinds() {
        let mut clock = ManualClock::new();
        clock.load(source(2.0)).unwrap();
        clock.play().unwrap();
        clock.advance(1.0);
        clock.reset();

        assert!(clock.is_paused());
        assert!(clock.current_time().abs() < f64::EPSILON);
    }

    #[test]
    fn play_without_source_fails() {
        let mut clock = ManualClock::new();
        assert!(matches!(clock.play(), Err(Error::PlaybackFailed(_))));
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut clock = ManualClock::new();
        clock.load(source(1.0)).unwrap();
        clock.fail_next_play("device lost");
        tokio_test::assert_err!(clock.play());
        tokio_test::assert_ok!(clock.play());
    }

    #[test]
    fn wall_clock_holds_time_while_paused() {
        let mut clock = WallClock::new();
        clock.load(source(10.0)).unwrap();
        assert!(clock.is_paused());
        clock.play().unwrap();
        clock.pause();

        let held = clock.current_time();
        assert!(clock.is_paused());
        assert!((clock.current_time() - held).abs() < f64::EPSILON);
        assert!(!clock.has_ended());
    }

    #[test]
    fn wall_clock_follows_elapsed_time() {
        let mut clock = WallClock::new();
        clock.load(source(10.0)).unwrap();
        tokio_test::assert_ok!(clock.play());
        std::thread::sleep(std::time::Duration::from_millis(30));

        let time = clock.current_time();
        assert!(time >= 0.03, "playhead at {time}");
        assert!(!clock.is_paused());

        clock.reset();
        assert!(clock.current_time().abs() < f64::EPSILON);
    }

    #[test]
    fn wall_clock_zero_duration_ends_immediately() {
        let mut clock = WallClock::new();
        clock.load(source(0.0)).unwrap();
        clock.play().unwrap();
        assert!(clock.has_ended());
    }
}
