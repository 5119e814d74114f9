//! Alignment records and time resolution

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default forward bias compensating for audio pipeline latency
pub const DEFAULT_LATENCY_BIAS: Duration = Duration::from_millis(50);

/// Approximate byte rate of a 48 kbps MP3 stream
const ESTIMATED_BYTES_PER_SECOND: f64 = 6000.0;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));

/// Time range mapped to a speakable-buffer offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    /// Start time in seconds, inclusive
    pub start: f64,
    /// End time in seconds, exclusive
    pub end: f64,
    /// Char offset into the speakable buffer
    pub text_offset: usize,
    /// Length of the spoken word in chars, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_length: Option<usize>,
    /// Spoken word, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AlignmentRecord {
    /// Create a record without word metadata
    #[must_use]
    pub const fn new(start: f64, end: f64, text_offset: usize) -> Self {
        Self {
            start,
            end,
            text_offset,
            word_length: None,
            text: None,
        }
    }

    /// Whether `time` falls in `[start, end)`
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }
}

/// Find the record whose `[start, end)` range contains `time`
///
/// `records` must be sorted by `start` and non-overlapping. Gaps, and times
/// before or after every record, resolve to `None`.
#[must_use]
pub fn resolve(records: &[AlignmentRecord], time: f64) -> Option<&AlignmentRecord> {
    let after = records.partition_point(|r| r.start <= time);
    let candidate = records.get(after.checked_sub(1)?)?;
    candidate.contains(time).then_some(candidate)
}

/// Validated alignment list for one playback session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    records: Vec<AlignmentRecord>,
}

impl Alignment {
    /// Validate and normalize records from the synthesis collaborator
    ///
    /// Records are sorted by `start`. Where a record runs past the start of its
    /// successor its end is trimmed, so lookups can binary search.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisFailed` for non-finite times or a record ending
    /// before it starts.
    pub fn new(mut records: Vec<AlignmentRecord>) -> Result<Self> {
        for record in &records {
            if !record.start.is_finite() || !record.end.is_finite() || record.end < record.start {
                return Err(Error::SynthesisFailed(format!(
                    "malformed alignment record [{}, {}) at offset {}",
                    record.start, record.end, record.text_offset
                )));
            }
        }

        records.sort_by(|a, b| a.start.total_cmp(&b.start));
        for i in 1..records.len() {
            let next_start = records[i].start;
            let prev = &mut records[i - 1];
            if prev.end > next_start {
                tracing::debug!(
                    offset = prev.text_offset,
                    end = prev.end,
                    next_start,
                    "trimming overlapping alignment record"
                );
                prev.end = next_start;
            }
        }

        Ok(Self { records })
    }

    /// Records sorted by start time
    #[must_use]
    pub fn records(&self) -> &[AlignmentRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// End of the last record in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.records.iter().map(|r| r.end).fold(0.0, f64::max)
    }

    /// Record active at `time`
    #[must_use]
    pub fn at(&self, time: f64) -> Option<&AlignmentRecord> {
        resolve(&self.records, time)
    }
}

/// Resolves the playback clock to an alignment record, biased forward to
/// compensate for output latency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolver {
    bias: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_BIAS)
    }
}

impl Resolver {
    /// Create a resolver with the given forward bias
    #[must_use]
    pub const fn new(bias: Duration) -> Self {
        Self {
            bias: bias.as_secs_f64(),
        }
    }

    /// Record being spoken at clock time `time`
    #[must_use]
    pub fn resolve<'a>(&self, alignment: &'a Alignment, time: f64) -> Option<&'a AlignmentRecord> {
        alignment.at(time + self.bias)
    }
}

/// Rough audio duration from encoded size
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_duration(audio_len: usize) -> f64 {
    audio_len as f64 / ESTIMATED_BYTES_PER_SECOND
}

/// Estimate word timings when the collaborator returned audio but no alignment
///
/// Words are whitespace-delimited; each gets a share of `duration`
/// proportional to its length in chars.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_alignment(text: &str, duration: f64) -> Vec<AlignmentRecord> {
    // Char offsets, since the buffer is indexed by chars
    let words: Vec<(usize, &str)> = WORD
        .find_iter(text)
        .map(|m| (text[..m.start()].chars().count(), m.as_str()))
        .collect();
    let total: usize = words.iter().map(|(_, w)| w.chars().count()).sum();
    if total == 0 || duration <= 0.0 {
        return Vec::new();
    }

    let mut now = 0.0;
    words
        .into_iter()
        .map(|(offset, word)| {
            let length = word.chars().count();
            let span = length as f64 / total as f64 * duration;
            let record = AlignmentRecord {
                start: now,
                end: now + span,
                text_offset: offset,
                word_length: Some(length),
                text: Some(word.to_string()),
            };
            now += span;
            record
        })
        .collect()
}
