//! Speech synthesis with word timings

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::sync::AlignmentRecord;
use crate::{Error, Result};

/// Synthesis request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    /// Speakable buffer
    pub text: String,
    /// Voice identifier
    pub voice: String,
    /// Speaking rate multiplier
    pub rate: f64,
}

/// Synthesis response body
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisResponse {
    /// Audio location, relative to the service root
    pub audio_url: String,
    /// Word timings; may be empty
    #[serde(default)]
    pub alignment: Vec<AlignmentRecord>,
}

/// Audio ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    /// Absolute audio location
    pub url: Url,
    /// Encoded audio, when it was fetched
    pub bytes: Option<Vec<u8>>,
    /// Word timings as returned by the service
    pub alignment: Vec<AlignmentRecord>,
}

/// Turns a speakable buffer into audio and word timings
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `request`
    ///
    /// # Errors
    ///
    /// Returns `SynthesisFailed` when the service rejects the request or
    /// answers with something that is not a synthesis response.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio>;
}

/// Synthesizer backed by an HTTP service exposing `POST /api/tts`
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base: Url,
    fetch_audio: bool,
}

impl HttpSynthesizer {
    /// Create a client for the service at `api_url`
    ///
    /// # Errors
    ///
    /// Returns `Config` if the URL does not parse or the client cannot be
    /// built.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("invalid synthesis url {api_url}: {e}")))?;
        // Relative joins must keep a path prefix such as `/tts-backend`
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base,
            fetch_audio: true,
        })
    }

    /// Whether to download the audio after synthesis (on by default)
    #[must_use]
    pub const fn with_audio_fetch(mut self, fetch: bool) -> Self {
        self.fetch_audio = fetch;
        self
    }

    /// Service root
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve an `audio_url` from a response against the service root
    ///
    /// Root-relative locations stay under the root's path; absolute URLs are
    /// kept as they are.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisFailed` if the location is not a valid URL.
    pub fn audio_url(&self, location: &str) -> Result<Url> {
        self.base
            .join(location.trim_start_matches('/'))
            .map_err(|e| Error::SynthesisFailed(format!("bad audio url {location}: {e}")))
    }

    /// Synthesis endpoint under the service root
    ///
    /// # Errors
    ///
    /// Returns `Config` if the endpoint cannot be formed from the root.
    pub fn endpoint(&self) -> Result<Url> {
        self.base
            .join("api/tts")
            .map_err(|e| Error::Config(format!("bad synthesis endpoint: {e}")))
    }

    /// Download encoded audio
    ///
    /// # Errors
    ///
    /// Returns `PlaybackFailed` on a non-success status, or the HTTP error.
    pub async fn fetch_audio(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::PlaybackFailed(format!(
                "audio fetch {url} returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio> {
        let endpoint = self.endpoint()?;

        tracing::debug!(
            %endpoint,
            voice = %request.voice,
            rate = request.rate,
            chars = request.text.chars().count(),
            "requesting synthesis"
        );

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::SynthesisFailed(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SynthesisFailed(format!("service error {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::SynthesisFailed(format!("failed to read response: {e}")))?;
        let parsed: SynthesisResponse = serde_json::from_str(&body)
            .map_err(|e| Error::SynthesisFailed(format!("malformed response: {e}")))?;

        let url = self.audio_url(&parsed.audio_url)?;
        let bytes = if self.fetch_audio {
            Some(self.fetch_audio(&url).await?)
        } else {
            None
        };

        tracing::debug!(
            %url,
            records = parsed.alignment.len(),
            bytes = bytes.as_ref().map_or(0, Vec::len),
            "synthesis complete"
        );

        Ok(SynthesizedAudio {
            url,
            bytes,
            alignment: parsed.alignment,
        })
    }
}
