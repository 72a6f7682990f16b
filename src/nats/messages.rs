use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Finalized segment message published to NATS for transcription
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentMessage {
    /// Unique id for this flush event (downstream dedupe)
    pub segment_id: Uuid,
    pub session_id: String,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width_bytes: u16,
    /// Audio duration of the payload in milliseconds
    pub duration_ms: f64,
    pub timestamp: String, // RFC3339 timestamp
}
