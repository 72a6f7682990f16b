use chrono::{DateTime, Utc};

/// PCM format metadata for one session's audio stream
///
/// Captured from the first fragment of a session and fixed for the session's
/// lifetime. Later fragments are assumed to share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Bytes per sample (2 = 16-bit PCM)
    pub sample_width_bytes: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Whisper expects 16kHz
            channels: 1,        // Mono
            sample_width_bytes: 2,
        }
    }
}

impl AudioFormat {
    /// Bytes occupied by one sample across all channels
    pub fn frame_bytes(&self) -> usize {
        self.sample_width_bytes as usize * self.channels as usize
    }

    /// Number of per-channel samples contained in `byte_len` bytes
    pub fn sample_count(&self, byte_len: usize) -> usize {
        byte_len / self.frame_bytes()
    }

    /// Duration in milliseconds of `byte_len` bytes of audio
    pub fn duration_ms(&self, byte_len: usize) -> f64 {
        self.sample_count(byte_len) as f64 / self.sample_rate as f64 * 1000.0
    }
}

/// One arriving chunk of raw audio with timestamp and format metadata
///
/// The payload is opaque PCM bytes; ownership transfers to the session
/// buffer on append.
#[derive(Debug, Clone)]
pub struct AudioFragment {
    /// Raw PCM payload (little-endian, interleaved)
    pub bytes: Vec<u8>,
    /// When the fragment arrived at the service
    pub arrived_at: DateTime<Utc>,
    /// Format metadata, if the sender supplied any
    pub format: Option<AudioFormat>,
}

impl AudioFragment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            arrived_at: Utc::now(),
            format: None,
        }
    }

    pub fn with_format(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            bytes,
            arrived_at: Utc::now(),
            format: Some(format),
        }
    }
}
