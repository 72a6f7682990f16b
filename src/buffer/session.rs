use std::time::Instant;
use tracing::{debug, warn};

use super::config::BufferConfig;
use crate::audio::{AudioFormat, AudioFragment};

/// A finalized segment extracted from a session buffer at flush time
#[derive(Debug, Clone)]
pub struct FlushedSegment {
    /// The accumulated PCM payload
    pub bytes: Vec<u8>,
    /// Format the session's audio arrived in
    pub format: AudioFormat,
    /// Audio duration of the payload in milliseconds
    pub duration_ms: f64,
}

/// One session's accumulating audio buffer
///
/// Appends fragments in arrival order and reports readiness when either
/// enough samples have accumulated for a full segment or too much time has
/// elapsed since the last flush. `extract_and_clear` is the single flush
/// primitive; both the ingestion path and the flush scheduler go through it.
pub struct SessionBuffer {
    session_id: String,
    config: BufferConfig,
    /// Accumulated PCM bytes, append-only until flush
    accumulated: Vec<u8>,
    /// Format captured from the first fragment, fixed thereafter
    format: Option<AudioFormat>,
    /// Sample target recomputed from the actual sample rate on first append
    target_samples: usize,
    /// Timeout anchor: set at creation, re-anchored on first append and on
    /// every flush
    last_flush: Instant,
}

impl SessionBuffer {
    pub fn new(session_id: impl Into<String>, config: BufferConfig) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            accumulated: Vec::new(),
            format: None,
            target_samples: 0,
            last_flush: Instant::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.format
    }

    /// Append one fragment and report whether the buffer is ready to flush
    ///
    /// A malformed fragment (empty, or not a whole number of sample frames)
    /// is logged and rejected; the buffer is left unchanged.
    pub fn append(&mut self, fragment: AudioFragment) -> bool {
        // Once the session's format is fixed, later fragments are assumed to
        // share it
        let format = self.format.or(fragment.format).unwrap_or_default();

        if fragment.bytes.is_empty() {
            warn!("Dropping empty fragment for session {}", self.session_id);
            return false;
        }
        if fragment.bytes.len() % format.frame_bytes() != 0 {
            warn!(
                "Dropping malformed fragment for session {}: {} bytes is not a whole number of {}-byte frames",
                self.session_id,
                fragment.bytes.len(),
                format.frame_bytes()
            );
            return false;
        }

        if self.format.is_none() {
            // First audio for this session: fix the format and recompute the
            // sample target from the actual sample rate
            self.target_samples =
                (self.config.target_duration_ms as usize * format.sample_rate as usize) / 1000;
            self.format = Some(format);
            self.last_flush = Instant::now();
            debug!(
                "Session {} started buffering at {} ({}Hz, {} channels, target {} samples)",
                self.session_id,
                fragment.arrived_at.to_rfc3339(),
                format.sample_rate,
                format.channels,
                self.target_samples
            );
        }

        self.accumulated.extend(fragment.bytes);
        self.is_ready()
    }

    /// Whether the buffer should be flushed now
    ///
    /// Ready when the sample target is (nearly) reached or the timeout has
    /// elapsed since the last flush. An empty buffer is never ready.
    pub fn is_ready(&self) -> bool {
        if self.accumulated.is_empty() {
            return false;
        }
        let buffer_full = self.sample_count() as f64
            >= self.config.ready_threshold * self.target_samples as f64;
        let timed_out = self.last_flush.elapsed().as_secs_f64() > self.config.timeout_secs;
        buffer_full || timed_out
    }

    /// Extract the accumulated payload and reset the buffer
    ///
    /// Returns `None` when nothing is buffered. The timeout anchor is reset
    /// to now so the emptied buffer is not immediately eligible for another
    /// timeout flush.
    pub fn extract_and_clear(&mut self) -> Option<FlushedSegment> {
        if self.accumulated.is_empty() {
            return None;
        }

        let bytes = std::mem::take(&mut self.accumulated);
        let format = self.format.unwrap_or_default();
        let duration_ms = format.duration_ms(bytes.len());
        self.last_flush = Instant::now();

        Some(FlushedSegment {
            bytes,
            format,
            duration_ms,
        })
    }

    /// Number of per-channel samples currently buffered
    pub fn sample_count(&self) -> usize {
        match self.format {
            Some(format) => format.sample_count(self.accumulated.len()),
            None => 0,
        }
    }

    /// Duration of the buffered audio in milliseconds, 0 if empty
    pub fn duration_ms(&self) -> f64 {
        match self.format {
            Some(format) => format.duration_ms(self.accumulated.len()),
            None => 0.0,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.accumulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    pub(crate) fn last_flush(&self) -> Instant {
        self.last_flush
    }
}
