use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::buffer::{FlushedSegment, SegmentSink};

/// Writes flushed segments to disk as WAV files
///
/// Files are named `<session>-segment-<NNN>.wav`, one per flush. Only 16-bit
/// audio is archived; other sample widths are skipped with a warning.
pub struct SegmentArchiver {
    output_dir: PathBuf,
}

impl SegmentArchiver {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).context("Failed to create archive directory")?;

        info!("Segment archive initialized: {}", output_dir.display());

        Ok(Self { output_dir })
    }

    /// Write one segment as `<session>-segment-<index>.wav`
    pub fn write_segment(
        &self,
        session_id: &str,
        index: usize,
        segment: &FlushedSegment,
    ) -> Result<PathBuf> {
        if segment.format.sample_width_bytes != 2 {
            anyhow::bail!(
                "Archive only supports 16-bit audio, got {}-byte samples",
                segment.format.sample_width_bytes
            );
        }

        let path = self
            .output_dir
            .join(format!("{}-segment-{:03}.wav", session_id, index));

        let spec = hound::WavSpec {
            channels: segment.format.channels,
            sample_rate: segment.format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for chunk in segment.bytes.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;

        Ok(path)
    }
}

/// Sink decorator that archives each segment before forwarding it
///
/// An archive failure is logged and does not block the hand-off to the
/// inner sink.
pub struct ArchivingSink {
    archiver: SegmentArchiver,
    inner: Arc<dyn SegmentSink>,
    /// Per-session file index
    indices: Mutex<HashMap<String, usize>>,
}

impl ArchivingSink {
    pub fn new(archiver: SegmentArchiver, inner: Arc<dyn SegmentSink>) -> Self {
        Self {
            archiver,
            inner,
            indices: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl SegmentSink for ArchivingSink {
    async fn on_segment(&self, session_id: &str, segment: FlushedSegment) -> Result<()> {
        let index = {
            let mut indices = self.indices.lock().await;
            let index = indices.entry(session_id.to_string()).or_insert(0);
            let current = *index;
            *index += 1;
            current
        };

        match self.archiver.write_segment(session_id, index, &segment) {
            Ok(path) => info!(
                "Archived segment for session {}: {} ({:.0}ms)",
                session_id,
                path.display(),
                segment.duration_ms
            ),
            Err(e) => warn!("Failed to archive segment for session {}: {}", session_id, e),
        }

        self.inner.on_segment(session_id, segment).await
    }

    fn name(&self) -> &str {
        "archive"
    }
}
