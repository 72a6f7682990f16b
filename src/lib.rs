pub mod audio;
pub mod buffer;
pub mod config;
pub mod http;
pub mod nats;

pub use audio::{ArchivingSink, AudioFormat, AudioFragment, SegmentArchiver};
pub use buffer::{
    BufferConfig, BufferRegistry, FlushScheduler, FlushedSegment, RegistryConfig, RegistryStats,
    SegmentSink, SessionBuffer,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsSegmentSink, SegmentMessage};
