//! Request lifecycle stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a request is in the pipeline.
///
/// A request moves strictly forward:
///
/// ```text
/// Received → RiskScored → PathDecided → ExternalScanned → PromptBuilt
///          → Executed → Reviewed → Responded
/// ```
///
/// From any non-terminal stage it may instead end in `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    RiskScored,
    PathDecided,
    ExternalScanned,
    PromptBuilt,
    Executed,
    Reviewed,
    Responded,
    Aborted,
}

impl Stage {
    /// The stage that follows this one on success.
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Received => Some(Self::RiskScored),
            Self::RiskScored => Some(Self::PathDecided),
            Self::PathDecided => Some(Self::ExternalScanned),
            Self::ExternalScanned => Some(Self::PromptBuilt),
            Self::PromptBuilt => Some(Self::Executed),
            Self::Executed => Some(Self::Reviewed),
            Self::Reviewed => Some(Self::Responded),
            Self::Responded | Self::Aborted => None,
        }
    }

    /// Returns true for `Responded` and `Aborted`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Responded | Self::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::RiskScored => "risk_scored",
            Self::PathDecided => "path_decided",
            Self::ExternalScanned => "external_scanned",
            Self::PromptBuilt => "prompt_built",
            Self::Executed => "executed",
            Self::Reviewed => "reviewed",
            Self::Responded => "responded",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one request through the pipeline.
#[derive(Debug)]
pub struct Lifecycle {
    stage: Stage,
    abort_reason: Option<String>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            stage: Stage::Received,
            abort_reason: None,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Why the request was aborted, if it was.
    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    /// Move to the next stage. Returns false (and stays put) if `to` is
    /// not the immediate successor of the current stage.
    pub fn advance(&mut self, to: Stage) -> bool {
        if self.stage.next() != Some(to) {
            return false;
        }
        self.stage = to;
        true
    }

    /// End the request. The stage reached before aborting is returned.
    pub fn abort(&mut self, reason: impl Into<String>) -> Stage {
        let reached = self.stage;
        if !reached.is_terminal() {
            self.stage = Stage::Aborted;
            self.abort_reason = Some(reason.into());
        }
        reached
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
