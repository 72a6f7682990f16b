//! HTTP API for fragment ingestion and session control
//!
//! - POST /sessions/:id/audio - Ingest one audio fragment
//! - POST /sessions/:id/flush - Explicitly flush a session's buffer
//! - DELETE /sessions/:id - End a session, discarding any remainder
//! - GET /sessions/:id - Query buffer status
//! - GET /stats - Registry-wide statistics
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
