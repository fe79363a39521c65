//! Configuration for headless sessions.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`HeadlessConfig::transcript_dir`].
pub const TRANSCRIPT_DIR_ENV: &str = "HEADLESS_AGENTS_TRANSCRIPT_DIR";

const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Settings shared by every session of one manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Directory holding one transcript log per agent.
    pub transcript_dir: PathBuf,

    /// Size of the buffer used for each stdout/stderr read.
    pub read_buffer_size: usize,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            transcript_dir: default_transcript_dir(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl HeadlessConfig {
    /// Defaults, with the transcript directory taken from the environment if set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(TRANSCRIPT_DIR_ENV).filter(|d| !d.is_empty()) {
            config.transcript_dir = PathBuf::from(dir);
        }
        config
    }

    /// Use a specific transcript directory.
    #[must_use]
    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = dir.into();
        self
    }

    /// Deterministic transcript log path for an agent.
    #[must_use]
    pub fn transcript_path(&self, agent_id: &str) -> PathBuf {
        transcript_path_in(&self.transcript_dir, agent_id)
    }
}

fn default_transcript_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("headless-agents")
        .join("transcripts")
}

fn transcript_path_in(dir: &Path, agent_id: &str) -> PathBuf {
    dir.join(format!("{}.jsonl", sanitize_agent_id(agent_id)))
}

/// Map an agent id onto a safe file stem.
///
/// `[A-Za-z0-9.-]` pass through; every other byte, `_` included, becomes
/// `_` plus two hex digits, so distinct ids never share a file.
#[must_use]
pub fn sanitize_agent_id(agent_id: &str) -> String {
    // "." and ".." would escape the directory
    let escape_dots = !agent_id.is_empty() && agent_id.bytes().all(|b| b == b'.');

    let mut stem = String::with_capacity(agent_id.len());
    for byte in agent_id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => stem.push(char::from(byte)),
            b'.' if !escape_dots => stem.push('.'),
            _ => {
                let _ = write!(stem, "_{byte:02x}");
            }
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_path_is_deterministic() {
        let config = HeadlessConfig::default().with_transcript_dir("/var/agents");
        assert_eq!(
            config.transcript_path("agent-1"),
            PathBuf::from("/var/agents/agent-1.jsonl")
        );
        assert_eq!(
            config.transcript_path("agent-1"),
            config.transcript_path("agent-1")
        );
    }

    #[test]
    fn test_sanitize_agent_id() {
        assert_eq!(sanitize_agent_id("agent-1.v2"), "agent-1.v2");
        assert_eq!(sanitize_agent_id("proj/agent 1"), "proj_2fagent_201");
        assert_eq!(sanitize_agent_id("a.b-c_d"), "a.b-c_5fd");
        assert_eq!(sanitize_agent_id(".."), "_2e_2e");
        assert_eq!(sanitize_agent_id("..\\x"), ".._5cx");
        assert_eq!(sanitize_agent_id("caf\u{e9}"), "caf_c3_a9");
    }

    #[test]
    fn test_distinct_ids_get_distinct_paths() {
        let config = HeadlessConfig::default().with_transcript_dir("/var/agents");
        let ids = ["a/b", "a_b", "a_2fb", "a b", "a\\b", ".", "_2e", ""];
        let paths: std::collections::HashSet<_> =
            ids.iter().map(|id| config.transcript_path(id)).collect();
        assert_eq!(paths.len(), ids.len());
        assert!(paths.iter().all(|p| p.parent() == Some(Path::new("/var/agents"))));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: HeadlessConfig =
            serde_json::from_str(r#"{"transcript_dir": "/tmp/t"}"#).unwrap();
        assert_eq!(config.transcript_dir, PathBuf::from("/tmp/t"));
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
    }
}
