pub mod client;
pub mod messages;

pub use client::{NatsClient, NatsSegmentSink};
pub use messages::SegmentMessage;
