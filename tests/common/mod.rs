//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;

use readalong::sync::{HighlightSurface, Rect, estimate_alignment};
use readalong::voice::{SynthesisRequest, SynthesizedAudio, Synthesizer};
use readalong::{ContentTree, Error, NodeId, Result};

/// Article with a heading, a list, a table and content that must be skipped
pub const ARTICLE: &str = r#"
<html>
<head><title>Fixture</title><script>var x = 1;</script></head>
<body>
  <nav>Home About</nav>
  <article>
    <h1>Quarterly results</h1>
    <p>Sales grew <strong>strongly</strong> this quarter 🚀 overall.</p>
    <ul>
      <li>North up</li>
      <li>South flat</li>
    </ul>
    <table>
      <caption>Regions</caption>
      <tbody>
        <tr><td>North</td><td>12</td></tr>
        <tr><td>South</td><td>9</td></tr>
      </tbody>
    </table>
    <p style="display: none">Hidden note</p>
    <style>.x { color: red }</style>
    <p>Thanks for reading.</p>
  </article>
</body>
</html>
"#;

/// Parse the fixture rooted at `<article>`
#[must_use]
pub fn article() -> ContentTree {
    ContentTree::from_html(ARTICLE, "article").expect("fixture parses")
}

/// One call made on a [`RecordingSurface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Activate(NodeId),
    Deactivate(NodeId),
    Scroll(NodeId),
}

/// Surface that records every call and tracks which elements are active
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
    pub active: HashSet<NodeId>,
    pub boxes: HashMap<NodeId, Rect>,
    pub prepared: usize,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of activations recorded
    #[must_use]
    pub fn activations(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SurfaceEvent::Activate(_)))
            .count()
    }
}

impl HighlightSurface for RecordingSurface {
    fn prepare(&mut self, _segmentation: &readalong::Segmentation) {
        self.prepared += 1;
    }

    fn activate(&mut self, element: NodeId) {
        self.events.push(SurfaceEvent::Activate(element));
        self.active.insert(element);
    }

    fn deactivate(&mut self, element: NodeId) {
        self.events.push(SurfaceEvent::Deactivate(element));
        self.active.remove(&element);
    }

    fn bounding_box(&self, element: NodeId) -> Option<Rect> {
        self.boxes.get(&element).copied()
    }

    fn viewport_height(&self) -> f64 {
        1000.0
    }

    fn scroll_to_center(&mut self, element: NodeId) {
        self.events.push(SurfaceEvent::Scroll(element));
    }
}

/// In-memory synthesis service
///
/// Timed fakes spread `duration` seconds over the words of the request;
/// failing fakes answer every request with `SynthesisFailed`.
pub struct FakeSynthesizer {
    duration: f64,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FakeSynthesizer {
    #[must_use]
    pub const fn timed(duration: f64) -> Self {
        Self {
            duration,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(reason: &str) -> Self {
        Self {
            duration: 0.0,
            failure: Some(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Audio for `text` with word timings spread over `duration`
#[must_use]
pub fn timed_audio(text: &str, duration: f64) -> SynthesizedAudio {
    SynthesizedAudio {
        url: Url::parse("http://localhost:8002/audio/test.mp3").expect("valid url"),
        bytes: None,
        alignment: estimate_alignment(text, duration),
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(Error::SynthesisFailed(reason.clone()));
        }
        Ok(timed_audio(&request.text, self.duration))
    }
}
