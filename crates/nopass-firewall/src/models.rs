//! # Core Types for Prompt Isolation
//!
//! This module defines the data types that flow through the isolation
//! builder: the risk assessment returned by the scoring service, external
//! content with its taint state, and the composed prompt pair handed to the
//! execution environment.
//!
//! ## Design Principles
//!
//! 1. **Fail-closed taint** - [`Taint::Unscanned`] is treated as dangerous by
//!    every consumer; only an explicit scan result can produce [`Taint::Trusted`]
//! 2. **Immutable prompts** - [`SandboxPrompt`] exposes read-only accessors
//! 3. **Serializable** - Wire types derive Serde traits; the taint state is
//!    never read from or written to the caller

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Risk level reported by the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// No meaningful risk signal.
    Low,
    /// Suspicious, but not an outright attack.
    Medium,
    /// Likely injection, jailbreak or exfiltration attempt.
    High,
}

impl RiskLevel {
    /// Wire representation (`LOW`, `MEDIUM`, `HIGH`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one piece of text with the risk service.
///
/// Produced once per scored text and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The service's sanitized rendition of the prompt.
    #[serde(default)]
    pub sanitized_prompt: String,
    /// Overall risk level.
    pub risk_level: RiskLevel,
    /// Short reason identifiers (e.g. `regex_reveal_system_prompt`).
    #[serde(default)]
    pub flags: Vec<String>,
    /// Whether the answer must go through the slow self-check review.
    #[serde(default)]
    pub self_check_required: bool,
}

impl RiskAssessment {
    /// Creates an assessment with no flags.
    pub fn new(risk_level: RiskLevel) -> Self {
        Self {
            sanitized_prompt: String::new(),
            risk_level,
            flags: Vec::new(),
            self_check_required: false,
        }
    }

    /// Adds a reason flag.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Sets the self-check requirement.
    pub fn with_self_check(mut self, required: bool) -> Self {
        self.self_check_required = required;
        self
    }
}

/// Why a datum was marked dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaintReason {
    /// The risk service scored the content `HIGH`.
    Flagged,
    /// The content could not be assessed (error, bad status, timeout).
    ScanDegraded,
}

/// Trust state of one piece of external content.
///
/// | Variant | Meaning | Treated as |
/// |---------|---------|------------|
/// | `Unscanned` | Not yet assessed | dangerous |
/// | `Trusted` | Scanned, not `HIGH` | data |
/// | `Dangerous` | Scanned `HIGH`, or scan failed | dangerous |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Taint {
    /// No scan result has been recorded.
    #[default]
    Unscanned,
    /// Scanned and not flagged.
    Trusted,
    /// Scanned and flagged, or the scan could not complete.
    Dangerous(TaintReason),
}

impl Taint {
    /// Returns true unless the datum was explicitly scanned as trusted.
    #[inline]
    pub fn is_dangerous(&self) -> bool {
        !matches!(self, Taint::Trusted)
    }

    /// Returns true once a scan outcome has been recorded.
    #[inline]
    pub fn is_scanned(&self) -> bool {
        !matches!(self, Taint::Unscanned)
    }

    /// The taint reason, if dangerous after a scan.
    pub fn reason(&self) -> Option<TaintReason> {
        match self {
            Taint::Dangerous(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// A piece of untrusted external content: a retrieved document, a web page,
/// a tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDatum {
    /// Caller-assigned identifier, used for display and audit only.
    #[serde(default)]
    pub id: String,
    /// Provenance, e.g. `kb:payments`, `web:https://...`, `tool:db-query`.
    #[serde(default)]
    pub source: String,
    /// Content kind, e.g. `document`, `web_page`, `tool_output`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Raw text.
    #[serde(default)]
    pub content: String,
    #[serde(skip)]
    taint: Taint,
}

impl ExternalDatum {
    /// Creates an unscanned datum.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        kind: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind: kind.into(),
            content: content.into(),
            taint: Taint::Unscanned,
        }
    }

    /// Current taint state.
    pub fn taint(&self) -> Taint {
        self.taint
    }

    /// Shorthand for `self.taint().is_dangerous()`.
    pub fn is_dangerous(&self) -> bool {
        self.taint.is_dangerous()
    }

    /// Records the scan outcome.
    ///
    /// # Errors
    ///
    /// Returns [`TaintError::AlreadyScanned`] if an outcome was already
    /// recorded, or [`TaintError::NotAnOutcome`] if `taint` is `Unscanned`.
    pub fn mark(&mut self, taint: Taint) -> Result<(), TaintError> {
        if self.taint.is_scanned() {
            return Err(TaintError::AlreadyScanned(self.id.clone()));
        }
        if !taint.is_scanned() {
            return Err(TaintError::NotAnOutcome);
        }
        self.taint = taint;
        Ok(())
    }
}

/// Errors from recording a taint outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaintError {
    /// The datum already carries a scan outcome.
    #[error("external datum '{0}' was already scanned")]
    AlreadyScanned(String),

    /// `Unscanned` is not a scan outcome.
    #[error("unscanned is not a scan outcome")]
    NotAnOutcome,
}

/// The two artifacts handed to the execution environment.
///
/// The system prompt is the fixed policy block; the user content is the
/// per-request composed block. Both are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPrompt {
    system_prompt: &'static str,
    user_content: String,
}

impl SandboxPrompt {
    pub(crate) fn new(system_prompt: &'static str, user_content: String) -> Self {
        Self {
            system_prompt,
            user_content,
        }
    }

    /// The fixed policy block.
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
    }

    /// The per-request composed block.
    pub fn user_content(&self) -> &str {
        &self.user_content
    }

    /// Hex SHA-256 over both artifacts, for audit logs that must not carry
    /// prompt text.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.system_prompt.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.user_content.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Errors that can occur during content sanitization (CDR).
///
/// # Security Note
///
/// When sanitization fails, the safe default is to reject the content.
/// Never pass unsanitized content through the pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SanitizeError {
    /// Content exceeds maximum allowed size.
    #[error("Content too large: {size} bytes (max: {max})")]
    TooLarge {
        /// Actual size of the content
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
}
