//! Error types for isolated execution.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Maximum number of diagnostic bytes kept from the environment's stderr.
pub const MAX_DIAGNOSTIC_BYTES: usize = 4096;

/// Errors from running a prompt pair in the execution environment.
///
/// # Security Notes
///
/// Diagnostics are for operator logs only. Callers must never copy them into
/// a response body.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The environment ran past its budget and was torn down.
    #[error("sandbox timed out after {budget:?}")]
    Timeout {
        /// Budget that was exceeded
        budget: Duration,
    },

    /// The environment could not be set up, or exited unsuccessfully.
    #[error("sandbox execution failed: {reason}")]
    ExecutionFailure {
        /// Short classification (exit status, setup step)
        reason: String,
        /// Captured stderr, truncated to [`MAX_DIAGNOSTIC_BYTES`]
        diagnostics: String,
    },
}

impl DispatchError {
    /// Build an execution failure, truncating diagnostics.
    pub fn failure(reason: impl Into<String>, diagnostics: impl AsRef<str>) -> Self {
        Self::ExecutionFailure {
            reason: reason.into(),
            diagnostics: truncate_diagnostics(diagnostics.as_ref()),
        }
    }

    /// Build a setup failure from an I/O error.
    pub fn setup(step: &str, err: std::io::Error) -> Self {
        Self::failure(format!("{}: {}", step, err), "")
    }

    /// Captured stderr, if any was kept.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailure { diagnostics, .. } if !diagnostics.is_empty() => {
                Some(diagnostics)
            }
            _ => None,
        }
    }

    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

fn truncate_diagnostics(text: &str) -> String {
    if text.len() <= MAX_DIAGNOSTIC_BYTES {
        return text.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &text[..end])
}
