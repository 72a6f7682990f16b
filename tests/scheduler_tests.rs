// Integration tests for the flush scheduler
//
// These tests verify that timed-out buffers are flushed with no new input,
// that a failing sink cannot starve other sessions, and that stop is
// synchronous and idempotent.

use anyhow::Result;
use async_trait::async_trait;
use meeting_ingest::{
    AudioFragment, BufferConfig, BufferRegistry, FlushScheduler, FlushedSegment, RegistryConfig,
    SegmentSink,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Records every segment it receives; fails sessions listed in `fail_for`
struct CollectingSink {
    segments: Mutex<Vec<(String, Vec<u8>, f64)>>,
    fail_for: Vec<String>,
}

impl CollectingSink {
    fn new() -> Self {
        Self {
            segments: Mutex::new(Vec::new()),
            fail_for: Vec::new(),
        }
    }

    fn failing_for(session_ids: &[&str]) -> Self {
        Self {
            segments: Mutex::new(Vec::new()),
            fail_for: session_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn collected(&self) -> Vec<(String, Vec<u8>, f64)> {
        self.segments.lock().await.clone()
    }
}

#[async_trait]
impl SegmentSink for CollectingSink {
    async fn on_segment(&self, session_id: &str, segment: FlushedSegment) -> Result<()> {
        if self.fail_for.iter().any(|s| s == session_id) {
            anyhow::bail!("Simulated sink failure for {}", session_id);
        }
        self.segments.lock().await.push((
            session_id.to_string(),
            segment.bytes,
            segment.duration_ms,
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}

fn registry_with_timeout(timeout_secs: f64) -> Arc<BufferRegistry> {
    Arc::new(BufferRegistry::new(RegistryConfig {
        max_memory_bytes: 10_000_000,
        buffer: BufferConfig {
            target_duration_ms: 60_000, // Large so only the timeout triggers
            timeout_secs,
            ready_threshold: 0.98,
        },
    }))
}

fn pcm_bytes(sample_count: usize) -> Vec<u8> {
    vec![0u8; sample_count * 2] // 16-bit mono
}

#[tokio::test]
async fn test_scheduler_flushes_timed_out_buffer() {
    let registry = registry_with_timeout(0.1);
    let sink = Arc::new(CollectingSink::new());
    let scheduler = FlushScheduler::new(
        Arc::clone(&registry),
        sink.clone() as Arc<dyn SegmentSink>,
        Duration::from_millis(25),
    );

    scheduler.start().await;

    // One small fragment, then silence
    registry
        .append_fragment("session-a", AudioFragment::new(pcm_bytes(3200)))
        .await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    scheduler.stop().await;

    let collected = sink.collected().await;
    assert_eq!(collected.len(), 1, "Timed-out buffer should flush exactly once");
    assert_eq!(collected[0].0, "session-a");
    assert_eq!(collected[0].1.len(), 6400);
    assert_eq!(collected[0].2, 200.0); // 3200 samples at 16kHz

    // Buffer emptied, not removed
    let buffer = registry.get("session-a").await.unwrap();
    assert!(buffer.lock().await.is_empty());
}

#[tokio::test]
async fn test_scheduler_leaves_fresh_buffers_alone() {
    let registry = registry_with_timeout(60.0);
    let sink = Arc::new(CollectingSink::new());
    let scheduler = FlushScheduler::new(
        Arc::clone(&registry),
        sink.clone() as Arc<dyn SegmentSink>,
        Duration::from_millis(25),
    );

    scheduler.start().await;

    registry
        .append_fragment("session-a", AudioFragment::new(pcm_bytes(3200)))
        .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    scheduler.stop().await;

    assert!(
        sink.collected().await.is_empty(),
        "Neither size nor timeout was reached"
    );
}

#[tokio::test]
async fn test_sink_failure_does_not_starve_other_sessions() {
    let registry = registry_with_timeout(0.1);
    let sink = Arc::new(CollectingSink::failing_for(&["session-a"]));
    let scheduler = FlushScheduler::new(
        Arc::clone(&registry),
        sink.clone() as Arc<dyn SegmentSink>,
        Duration::from_millis(25),
    );

    scheduler.start().await;

    registry
        .append_fragment("session-a", AudioFragment::new(pcm_bytes(1600)))
        .await;
    registry
        .append_fragment("session-b", AudioFragment::new(pcm_bytes(1600)))
        .await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    scheduler.stop().await;

    let collected = sink.collected().await;
    assert_eq!(
        collected.len(),
        1,
        "Session B should flush even though session A's sink call failed"
    );
    assert_eq!(collected[0].0, "session-b");

    // Session A's buffer was still cleared; the loss surfaced in the sink error
    let buffer = registry.get("session-a").await.unwrap();
    assert!(buffer.lock().await.is_empty());
}

#[tokio::test]
async fn test_stop_prevents_further_flushes() {
    let registry = registry_with_timeout(0.1);
    let sink = Arc::new(CollectingSink::new());
    let scheduler = FlushScheduler::new(
        Arc::clone(&registry),
        sink.clone() as Arc<dyn SegmentSink>,
        Duration::from_millis(25),
    );

    scheduler.start().await;
    assert!(scheduler.is_running().await);

    scheduler.stop().await;
    assert!(!scheduler.is_running().await);

    // Audio times out after stop; nothing may flush it
    registry
        .append_fragment("session-a", AudioFragment::new(pcm_bytes(1600)))
        .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(sink.collected().await.is_empty());
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let registry = registry_with_timeout(60.0);
    let sink = Arc::new(CollectingSink::new());
    let scheduler = FlushScheduler::new(
        Arc::clone(&registry),
        sink.clone() as Arc<dyn SegmentSink>,
        Duration::from_millis(25),
    );

    scheduler.start().await;
    scheduler.start().await; // No-op
    assert!(scheduler.is_running().await);

    scheduler.stop().await;
    scheduler.stop().await; // No-op
    assert!(!scheduler.is_running().await);

    // Restart works after a full stop
    scheduler.start().await;
    assert!(scheduler.is_running().await);
    scheduler.stop().await;
}

#[tokio::test]
async fn test_two_session_end_to_end() {
    // Session X fills its buffer in one fragment and flushes through the
    // ingestion path; session Y sends 200ms then goes silent and is flushed
    // by the scheduler on timeout.
    let registry = Arc::new(BufferRegistry::new(RegistryConfig {
        max_memory_bytes: 10_000_000,
        buffer: BufferConfig {
            target_duration_ms: 2000,
            timeout_secs: 0.15,
            ready_threshold: 0.98,
        },
    }));
    let sink = Arc::new(CollectingSink::new());
    let scheduler = FlushScheduler::new(
        Arc::clone(&registry),
        sink.clone() as Arc<dyn SegmentSink>,
        Duration::from_millis(25),
    );

    // X: 2000ms at 16kHz = 32000 samples = 64000 bytes, ready immediately.
    // Flushed through the ingestion path before the scheduler even runs.
    let ready = registry
        .append_fragment("session-x", AudioFragment::new(pcm_bytes(32000)))
        .await;
    assert!(ready, "Ingestion path should report X ready immediately");

    let segment = registry.flush_session("session-x").await.unwrap();
    assert_eq!(segment.bytes.len(), 64000);
    assert_eq!(segment.duration_ms, 2000.0);
    meeting_ingest::buffer::dispatch(
        &(sink.clone() as Arc<dyn SegmentSink>),
        "session-x".to_string(),
        segment,
    );

    scheduler.start().await;

    // Y: 200ms of audio, then nothing
    let ready = registry
        .append_fragment("session-y", AudioFragment::new(pcm_bytes(3200)))
        .await;
    assert!(!ready);

    tokio::time::sleep(Duration::from_millis(500)).await;
    scheduler.stop().await;

    let collected = sink.collected().await;
    assert_eq!(collected.len(), 2);

    let x = collected.iter().find(|(id, _, _)| id == "session-x").unwrap();
    assert_eq!(x.1.len(), 64000);

    let y = collected.iter().find(|(id, _, _)| id == "session-y").unwrap();
    assert_eq!(y.1.len(), 6400);
    assert_eq!(y.2, 200.0);
}
