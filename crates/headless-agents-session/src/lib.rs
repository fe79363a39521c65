//! Session registry and lifecycle for headless agents.
//!
//! Provides:
//! - `HeadlessManager` - Spawn, kill, and query agent sessions
//! - `TranscriptLog` - Append-only JSONL mirror of each transcript

pub mod manager;
mod session;
pub mod storage;

pub use manager::{HeadlessManager, SpawnRequest};
pub use storage::TranscriptLog;
