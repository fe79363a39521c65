//! On-disk persistence for session transcripts.

mod log;

pub use log::TranscriptLog;
