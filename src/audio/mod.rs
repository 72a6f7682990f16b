pub mod archive;
pub mod fragment;

pub use archive::{ArchivingSink, SegmentArchiver};
pub use fragment::{AudioFormat, AudioFragment};
