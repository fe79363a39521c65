//! Cross-platform shell command utilities.

use std::path::Path;

/// Extensions Windows can only run through `cmd.exe`.
const WINDOWS_SCRIPT_EXTENSIONS: [&str; 2] = ["cmd", "bat"];

/// Platform family that decides how binaries are launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Platform this process was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }
}

/// Returns the shell command and argument for the given platform.
///
/// Returns `(shell_program, shell_arg)` where:
/// - Windows: `("cmd", "/C")`
/// - Unix-like: `("sh", "-c")`
#[must_use]
pub const fn get_shell_command(platform: Platform) -> (&'static str, &'static str) {
    match platform {
        Platform::Windows => ("cmd", "/C"),
        Platform::Unix => ("sh", "-c"),
    }
}

/// Whether `binary` has to be started through a shell.
///
/// Only Windows script shims (`.cmd`, `.bat`) qualify; `.exe` and
/// extensionless binaries run directly. Decided from the name alone.
#[must_use]
pub fn needs_shell(platform: Platform, binary: &Path) -> bool {
    if platform != Platform::Windows {
        return false;
    }
    binary
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WINDOWS_SCRIPT_EXTENSIONS
                .iter()
                .any(|script| ext.eq_ignore_ascii_case(script))
        })
}
