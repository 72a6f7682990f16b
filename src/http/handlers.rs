use super::state::AppState;
use crate::audio::{AudioFormat, AudioFragment};
use crate::buffer::dispatch;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IngestFragmentRequest {
    /// Base64-encoded PCM bytes (little-endian, interleaved)
    pub pcm: String,

    /// Format fields, honored only on the session's first fragment
    /// (defaults: 16000 Hz, 1 channel, 2-byte samples)
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub sample_width_bytes: Option<u16>,

    /// Optional RFC3339 arrival timestamp (defaults to receive time)
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestFragmentResponse {
    pub session_id: String,
    /// Whether the append made the buffer ready (and it was flushed)
    pub ready: bool,
    /// Audio remaining in the buffer after any flush, in milliseconds
    pub buffered_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub session_id: String,
    pub flushed: bool,
    /// Duration of the flushed segment, 0 if nothing was buffered
    pub duration_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub session_id: String,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub buffered_bytes: usize,
    pub buffered_ms: f64,
    pub ready: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/:session_id/audio
/// Ingest one audio fragment; flushes the buffer when the append fills it
pub async fn ingest_audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<IngestFragmentRequest>,
) -> impl IntoResponse {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(&req.pcm) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid base64 PCM payload: {}", e),
                }),
            )
                .into_response();
        }
    };

    let format = if req.sample_rate.is_some()
        || req.channels.is_some()
        || req.sample_width_bytes.is_some()
    {
        let defaults = AudioFormat::default();
        Some(AudioFormat {
            sample_rate: req.sample_rate.unwrap_or(defaults.sample_rate),
            channels: req.channels.unwrap_or(defaults.channels),
            sample_width_bytes: req.sample_width_bytes.unwrap_or(defaults.sample_width_bytes),
        })
    } else {
        None
    };

    let arrived_at = req
        .timestamp
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let fragment = AudioFragment {
        bytes,
        arrived_at,
        format,
    };

    let ready = state.registry.append_fragment(&session_id, fragment).await;

    // The ingestion-path flush: hand the segment off as soon as the buffer
    // fills, without waiting for the scheduler
    if ready {
        if let Some(segment) = state.registry.flush_session(&session_id).await {
            dispatch(&state.sink, session_id.clone(), segment);
        }
    }

    let buffered_ms = match state.registry.get(&session_id).await {
        Some(buffer) => buffer.lock().await.duration_ms(),
        None => 0.0,
    };

    (
        StatusCode::OK,
        Json(IngestFragmentResponse {
            session_id,
            ready,
            buffered_ms,
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/flush
/// Explicitly flush a session's buffer (e.g. before ending the session)
pub async fn flush_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.flush_session(&session_id).await {
        Some(segment) => {
            let duration_ms = segment.duration_ms;
            dispatch(&state.sink, session_id.clone(), segment);
            (
                StatusCode::OK,
                Json(FlushResponse {
                    session_id,
                    flushed: true,
                    duration_ms,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::OK,
            Json(FlushResponse {
                session_id,
                flushed: false,
                duration_ms: 0.0,
            }),
        )
            .into_response(),
    }
}

/// DELETE /sessions/:session_id
/// End a session, discarding any unflushed remainder
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let removed = state.registry.remove(&session_id).await;

    if removed {
        info!("Session {} ended", session_id);
    }

    (
        StatusCode::OK,
        Json(EndSessionResponse {
            session_id,
            removed,
        }),
    )
        .into_response()
}

/// GET /sessions/:session_id
/// Buffer status for one session
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&session_id).await {
        Some(buffer) => {
            let buf = buffer.lock().await;
            (
                StatusCode::OK,
                Json(SessionStatusResponse {
                    session_id,
                    buffered_bytes: buf.byte_len(),
                    buffered_ms: buf.duration_ms(),
                    ready: buf.is_ready(),
                    sample_rate: buf.format().map(|f| f.sample_rate),
                    channels: buf.format().map(|f| f.channels),
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", session_id),
            }),
        )
            .into_response(),
    }
}

/// GET /stats
/// Registry-wide statistics
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.registry.stats().await;
    (StatusCode::OK, Json(stats)).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
