use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};
use uuid::Uuid;

use super::messages::SegmentMessage;
use crate::buffer::{FlushedSegment, SegmentSink};

pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Publish a finalized segment for the transcription service
    pub async fn publish_segment(&self, message: &SegmentMessage) -> Result<()> {
        let subject = format!("audio.segment.{}", message.session_id);

        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish segment")?;

        debug!(
            "Published segment to {} ({:.0}ms, segment_id={})",
            subject, message.duration_ms, message.segment_id
        );

        Ok(())
    }
}

/// Production sink: hands finalized segments to the transcription service
/// over NATS
pub struct NatsSegmentSink {
    client: NatsClient,
}

impl NatsSegmentSink {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SegmentSink for NatsSegmentSink {
    async fn on_segment(&self, session_id: &str, segment: FlushedSegment) -> Result<()> {
        let message = SegmentMessage {
            segment_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            pcm: base64::engine::general_purpose::STANDARD.encode(&segment.bytes),
            sample_rate: segment.format.sample_rate,
            channels: segment.format.channels,
            sample_width_bytes: segment.format.sample_width_bytes,
            duration_ms: segment.duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        self.client.publish_segment(&message).await
    }

    fn name(&self) -> &str {
        "nats"
    }
}
