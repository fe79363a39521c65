//! Cross-platform launching of headless agent binaries.
//!
//! Provides:
//! - `launch` - Spawn an agent binary as its own process group
//! - Shell-wrapping rules for Windows script binaries

pub mod launcher;
pub mod shell;

pub use launcher::{LaunchError, LaunchSpec, LaunchedProcess, ProcessGroup, STRIPPED_ENV_VARS, launch};
pub use shell::{Platform, get_shell_command, needs_shell};
