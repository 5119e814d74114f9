//! Audio playback to speakers

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::playback::{AudioClock, AudioSource};
use crate::{Error, Result};

/// Playhead shared with the output callback
#[derive(Debug, Default)]
struct Playhead {
    /// Next mono sample to play
    position: AtomicUsize,
    playing: AtomicBool,
}

/// Decoded MP3, downmixed to mono
struct Decoded {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

/// Plays MP3 audio on the default output device and reports its playhead
///
/// Time is derived from the number of samples the device has consumed, so
/// highlighting follows what is actually audible.
#[derive(Default)]
pub struct SpeakerClock {
    decoded: Option<Decoded>,
    playhead: Arc<Playhead>,
    stream: Option<Stream>,
}

impl SpeakerClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn open_stream(&self, decoded: &Decoded) -> Result<Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::PlaybackFailed("no output device available".to_string()))?;

        let rate = SampleRate(decoded.sample_rate);
        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::PlaybackFailed(e.to_string()))?
            .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .min_by_key(cpal::SupportedStreamConfigRange::channels)
            .ok_or_else(|| {
                Error::PlaybackFailed(format!(
                    "no output config supports {} Hz",
                    decoded.sample_rate
                ))
            })?;
        let config: StreamConfig = supported.with_sample_rate(rate).config();
        let channels = usize::from(config.channels);

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = decoded.sample_rate,
            channels,
            "audio output opened"
        );

        let samples = Arc::clone(&decoded.samples);
        let playhead = Arc::clone(&self.playhead);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let playing = playhead.playing.load(Ordering::Acquire);
                    let mut pos = playhead.position.load(Ordering::Acquire);
                    for frame in data.chunks_mut(channels) {
                        let sample = if playing {
                            samples.get(pos).copied()
                        } else {
                            None
                        };
                        if sample.is_some() {
                            pos += 1;
                        }
                        frame.fill(sample.unwrap_or(0.0));
                    }
                    playhead.position.store(pos, Ordering::Release);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::PlaybackFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| Error::PlaybackFailed(e.to_string()))?;
        Ok(stream)
    }
}

impl AudioClock for SpeakerClock {
    fn load(&mut self, source: AudioSource) -> Result<()> {
        let bytes = source.bytes.ok_or_else(|| {
            Error::PlaybackFailed(format!("audio {} was not downloaded", source.url))
        })?;
        let decoded = decode_mp3(&bytes)?;

        self.stream = None;
        self.playhead.playing.store(false, Ordering::Release);
        self.playhead.position.store(0, Ordering::Release);
        self.stream = Some(self.open_stream(&decoded)?);

        tracing::debug!(
            url = %source.url,
            samples = decoded.samples.len(),
            sample_rate = decoded.sample_rate,
            "audio loaded"
        );
        self.decoded = Some(decoded);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::PlaybackFailed("no audio loaded".to_string()));
        }
        self.playhead.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) {
        self.playhead.playing.store(false, Ordering::Release);
    }

    fn reset(&mut self) {
        self.playhead.playing.store(false, Ordering::Release);
        self.playhead.position.store(0, Ordering::Release);
    }

    #[allow(clippy::cast_precision_loss)]
    fn current_time(&self) -> f64 {
        let Some(decoded) = &self.decoded else {
            return 0.0;
        };
        self.playhead.position.load(Ordering::Acquire) as f64 / f64::from(decoded.sample_rate)
    }

    fn is_paused(&self) -> bool {
        !self.playhead.playing.load(Ordering::Acquire)
    }

    fn has_ended(&self) -> bool {
        self.decoded.as_ref().is_some_and(|d| {
            self.playhead.position.load(Ordering::Acquire) >= d.samples.len()
        })
    }
}

/// Decode MP3 bytes to mono f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Decoded> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                #[allow(clippy::cast_sign_loss)]
                let rate = frame.sample_rate as u32;
                if sample_rate.is_none() {
                    sample_rate = Some(rate);
                }
                let channels = frame.channels.max(1);
                samples.extend(frame.data.chunks(channels).map(|chunk| {
                    #[allow(clippy::cast_precision_loss)]
                    let sum: f32 = chunk.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>()
                        / chunk.len() as f32;
                    sum
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::PlaybackFailed(format!("MP3 decode error: {e}"))),
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| Error::PlaybackFailed("no audio frames".to_string()))?;
    Ok(Decoded {
        samples: Arc::new(samples),
        sample_rate,
    })
}
