//! Output adapters and hook translation for headless agent CLIs.
//!
//! Provides:
//! - Claude Code stream-json wire types
//! - `OutputAdapter` with stream-json and text implementations
//! - Hook event translator

pub mod adapter;
pub mod claude;
pub mod translator;

pub use adapter::{AdapterEvent, OutputAdapter, StreamJsonAdapter, TextAdapter, adapter_for};
pub use translator::{translate, translate_entry};
