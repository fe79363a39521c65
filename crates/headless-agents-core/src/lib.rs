//! Core model for headless agent sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `HookEvent` - Canonical UI-facing activity signal
//! - `TranscriptEntry` / `TranscriptStore` - Durable agent activity + live history
//! - `NotificationSink` - Outbound channel to the host
//! - `HeadlessConfig` - Transcript location and I/O tuning

pub mod config;
pub mod hook;
pub mod notify;
pub mod traits;
pub mod transcript;

pub use config::HeadlessConfig;
pub use hook::HookEvent;
pub use notify::{ChannelSink, HostNotification};
pub use traits::{NotificationSink, OutputKind, SessionId};
pub use transcript::{TranscriptEntry, TranscriptError, TranscriptStore, TranscriptSummary};
