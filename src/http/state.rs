use crate::buffer::{BufferRegistry, SegmentSink};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Per-session audio buffers
    pub registry: Arc<BufferRegistry>,
    /// Consumer of finalized segments
    pub sink: Arc<dyn SegmentSink>,
}

impl AppState {
    pub fn new(registry: Arc<BufferRegistry>, sink: Arc<dyn SegmentSink>) -> Self {
        Self { registry, sink }
    }
}
