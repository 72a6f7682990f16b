use anyhow::Result;
use std::sync::Arc;
use tracing::error;

use super::session::FlushedSegment;

/// Consumer of finalized segments
///
/// Invoked at most once per flush event. Implementations own all downstream
/// processing (transcription hand-off, persistence) and must not assume the
/// caller waits for them: flush paths dispatch invocations onto their own
/// task via [`dispatch`].
#[async_trait::async_trait]
pub trait SegmentSink: Send + Sync {
    async fn on_segment(&self, session_id: &str, segment: FlushedSegment) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Hand a segment to the sink on its own task
///
/// Neither the ingestion path nor the scheduler tick waits for the sink, so
/// slow downstream processing cannot delay buffering of subsequent
/// fragments. Sink failures are logged here.
pub fn dispatch(sink: &Arc<dyn SegmentSink>, session_id: String, segment: FlushedSegment) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.on_segment(&session_id, segment).await {
            error!(
                "Segment sink '{}' failed for session {}: {}",
                sink.name(),
                session_id,
                e
            );
        }
    });
}
