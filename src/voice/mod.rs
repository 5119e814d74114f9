//! Voice synthesis and audio output
//!
//! Speech is synthesized by an external service (see [`Synthesizer`]); this
//! module talks to it and, with the `speaker` feature, plays the result.

#[cfg(feature = "speaker")]
mod playback;
mod tts;

#[cfg(feature = "speaker")]
pub use playback::SpeakerClock;
pub use tts::{
    HttpSynthesizer, SynthesisRequest, SynthesisResponse, SynthesizedAudio, Synthesizer,
};

/// A voice offered by the synthesis service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    /// Display name
    pub name: &'static str,
    /// Identifier sent with synthesis requests
    pub id: &'static str,
}

/// Voices the service is known to offer; the first is the default
pub const VOICES: &[Voice] = &[
    Voice { name: "Natasha (Neural) - AU", id: "en-AU-NatashaNeural" },
    Voice { name: "Carly (Neural) - AU", id: "en-AU-CarlyNeural" },
    Voice { name: "William (Neural) - AU", id: "en-AU-WilliamNeural" },
    Voice { name: "Sonia (Neural) - UK", id: "en-GB-SoniaNeural" },
    Voice { name: "Ryan (Neural) - UK", id: "en-GB-RyanNeural" },
    Voice { name: "Jenny (Neural) - US", id: "en-US-JennyNeural" },
    Voice { name: "Guy (Neural) - US", id: "en-US-GuyNeural" },
];

/// Default voice identifier
pub const DEFAULT_VOICE: &str = "en-AU-NatashaNeural";

/// Look up a catalog voice by identifier
#[must_use]
pub fn find_voice(id: &str) -> Option<&'static Voice> {
    VOICES.iter().find(|v| v.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_voice_is_first_in_catalog() {
        assert_eq!(VOICES[0].id, DEFAULT_VOICE);
        assert_eq!(VOICES.len(), 7);
    }

    #[test]
    fn finds_voice_by_id() {
        assert_eq!(find_voice("en-GB-RyanNeural").map(|v| v.name), Some("Ryan (Neural) - UK"));
        assert!(find_voice("robot").is_none());
    }
}
