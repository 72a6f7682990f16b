use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::config::RegistryConfig;
use super::session::{FlushedSegment, SessionBuffer};
use super::sink::{self, SegmentSink};
use crate::audio::AudioFragment;

/// Registry-wide statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    /// Sessions with a live buffer
    pub active_sessions: usize,
    /// Total unflushed bytes across all buffers
    pub buffered_bytes: usize,
    /// Fragments accepted since startup
    pub total_fragments: u64,
    /// Segments flushed since startup (both paths)
    pub total_flushes: u64,
    /// Buffers evicted under memory pressure
    pub total_evictions: u64,
    /// Unflushed bytes discarded by eviction
    pub evicted_bytes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fragments: AtomicU64,
    flushes: AtomicU64,
    evictions: AtomicU64,
    evicted_bytes: AtomicU64,
}

/// Concurrency-safe map of session id to audio buffer
///
/// Buffers are created lazily on first fragment, removed when a session
/// ends, and evicted whole (oldest activity first) whenever total buffered
/// bytes exceed the configured ceiling. Structural mutation of the map is
/// exclusive under the `RwLock`; buffer content mutation happens under each
/// buffer's own `Mutex` once the reference has been obtained.
pub struct BufferRegistry {
    buffers: RwLock<HashMap<String, Arc<Mutex<SessionBuffer>>>>,
    config: RegistryConfig,
    counters: Counters,
}

impl BufferRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        info!(
            "Buffer registry initialized (memory ceiling: {} MiB, target segment: {}ms, timeout: {}s)",
            config.max_memory_bytes / (1024 * 1024),
            config.buffer.target_duration_ms,
            config.buffer.timeout_secs
        );

        Self {
            buffers: RwLock::new(HashMap::new()),
            config,
            counters: Counters::default(),
        }
    }

    /// Look up a session's buffer, creating it if absent
    ///
    /// Creation runs the memory-ceiling check before returning. Idempotent
    /// for repeated calls with the same id.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<SessionBuffer>> {
        {
            let buffers = self.buffers.read().await;
            if let Some(buffer) = buffers.get(session_id) {
                return Arc::clone(buffer);
            }
        }

        let mut buffers = self.buffers.write().await;
        // Another writer may have created it while we waited for the lock
        if let Some(buffer) = buffers.get(session_id) {
            return Arc::clone(buffer);
        }

        debug!("Creating buffer for session {}", session_id);
        let buffer = Arc::new(Mutex::new(SessionBuffer::new(
            session_id,
            self.config.buffer.clone(),
        )));
        buffers.insert(session_id.to_string(), Arc::clone(&buffer));

        self.enforce_memory_limit(&mut buffers).await;

        buffer
    }

    /// Look up a session's buffer without creating it
    pub async fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionBuffer>>> {
        self.buffers.read().await.get(session_id).map(Arc::clone)
    }

    /// Remove a session's buffer, discarding any unflushed remainder
    ///
    /// No error if absent. Callers needing a final partial segment must
    /// flush before removing.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.buffers.write().await.remove(session_id);
        match removed {
            Some(buffer) => {
                let discarded = buffer.lock().await.byte_len();
                if discarded > 0 {
                    debug!(
                        "Removed session {} with {} unflushed bytes",
                        session_id, discarded
                    );
                } else {
                    debug!("Removed session {}", session_id);
                }
                true
            }
            None => false,
        }
    }

    /// Append one fragment to a session's buffer, creating it if needed
    ///
    /// Returns the buffer's readiness after the append; the caller decides
    /// whether to flush immediately or rely on the scheduler. A malformed
    /// fragment is logged and rejected, and `false` is returned.
    pub async fn append_fragment(&self, session_id: &str, fragment: AudioFragment) -> bool {
        let buffer = self.get_or_create(session_id).await;
        let mut buf = buffer.lock().await;
        let byte_len = buf.byte_len();
        let ready = buf.append(fragment);
        if buf.byte_len() > byte_len {
            self.counters.fragments.fetch_add(1, Ordering::Relaxed);
        }
        ready
    }

    /// Flush one session's buffer through the shared flush primitive
    ///
    /// Returns `None` when the session is unknown or its buffer is empty.
    pub async fn flush_session(&self, session_id: &str) -> Option<FlushedSegment> {
        let buffer = self.get(session_id).await?;
        let segment = buffer.lock().await.extract_and_clear();
        if let Some(segment) = &segment {
            self.counters.flushes.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Flushed session {}: {:.0}ms ({} bytes)",
                session_id,
                segment.duration_ms,
                segment.bytes.len()
            );
        }
        segment
    }

    /// Flush every buffer that reports ready, dispatching segments to the sink
    ///
    /// Iterates a snapshot of the current session ids so concurrent inserts
    /// and removals from the ingestion path cannot tear the scan. Sessions
    /// removed mid-scan are skipped. Returns the number of buffers flushed.
    pub async fn flush_ready(&self, sink: &Arc<dyn SegmentSink>) -> usize {
        let session_ids = self.session_ids().await;
        let mut flushed = 0;

        for session_id in session_ids {
            let Some(buffer) = self.get(&session_id).await else {
                continue;
            };
            let segment = {
                let mut buf = buffer.lock().await;
                if buf.is_ready() {
                    buf.extract_and_clear()
                } else {
                    None
                }
            };
            if let Some(segment) = segment {
                self.counters.flushes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Timeout/size flush for session {}: {:.0}ms ({} bytes)",
                    session_id,
                    segment.duration_ms,
                    segment.bytes.len()
                );
                sink::dispatch(sink, session_id, segment);
                flushed += 1;
            }
        }

        flushed
    }

    /// Drain every non-empty buffer straight through the sink
    ///
    /// Used at shutdown: sink calls are awaited here rather than dispatched,
    /// so the caller knows the hand-off completed (or was logged as failed)
    /// before the process exits.
    pub async fn flush_all(&self, sink: &Arc<dyn SegmentSink>) -> usize {
        let session_ids = self.session_ids().await;
        let mut flushed = 0;

        for session_id in session_ids {
            if let Some(segment) = self.flush_session(&session_id).await {
                if let Err(e) = sink.on_segment(&session_id, segment).await {
                    warn!(
                        "Final flush for session {} failed at sink '{}': {}",
                        session_id,
                        sink.name(),
                        e
                    );
                } else {
                    flushed += 1;
                }
            }
        }

        if flushed > 0 {
            info!("Drained {} sessions on shutdown", flushed);
        }
        flushed
    }

    /// Snapshot of the current session ids
    pub async fn session_ids(&self) -> Vec<String> {
        self.buffers.read().await.keys().cloned().collect()
    }

    pub async fn stats(&self) -> RegistryStats {
        let buffers = self.buffers.read().await;
        let mut buffered_bytes = 0;
        for buffer in buffers.values() {
            buffered_bytes += buffer.lock().await.byte_len();
        }

        RegistryStats {
            active_sessions: buffers.len(),
            buffered_bytes,
            total_fragments: self.counters.fragments.load(Ordering::Relaxed),
            total_flushes: self.counters.flushes.load(Ordering::Relaxed),
            total_evictions: self.counters.evictions.load(Ordering::Relaxed),
            evicted_bytes: self.counters.evicted_bytes.load(Ordering::Relaxed),
        }
    }

    /// Evict whole buffers, oldest activity first, until total buffered
    /// bytes fall back under the ceiling
    ///
    /// Runs with the map's write lock held so eviction cannot interleave
    /// with concurrent inserts. An evicted buffer's unflushed audio is
    /// discarded; the loss is logged and counted, not swallowed.
    async fn enforce_memory_limit(
        &self,
        buffers: &mut HashMap<String, Arc<Mutex<SessionBuffer>>>,
    ) {
        let mut total: usize = 0;
        let mut by_age: Vec<(String, usize, Instant)> = Vec::with_capacity(buffers.len());

        for (session_id, buffer) in buffers.iter() {
            let buf = buffer.lock().await;
            total += buf.byte_len();
            by_age.push((session_id.clone(), buf.byte_len(), buf.last_flush()));
        }

        if total <= self.config.max_memory_bytes {
            return;
        }

        warn!(
            "Buffered audio ({} bytes across {} sessions) exceeds ceiling of {} bytes, evicting",
            total,
            buffers.len(),
            self.config.max_memory_bytes
        );

        by_age.sort_by_key(|(_, _, last_flush)| *last_flush);

        for (session_id, byte_len, _) in by_age {
            if total <= self.config.max_memory_bytes {
                break;
            }
            buffers.remove(&session_id);
            total -= byte_len;
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            self.counters
                .evicted_bytes
                .fetch_add(byte_len as u64, Ordering::Relaxed);
            warn!(
                "Evicted session {} ({} bytes of unflushed audio discarded)",
                session_id, byte_len
            );
        }
    }
}
