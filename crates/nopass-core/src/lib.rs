//! # NoPass Core
//!
//! Request-mediation gateway for large language models.
//! Orchestrates risk scoring, taint scanning, prompt isolation, sandboxed
//! execution and output review for every chat request.
//!
//! ## Threat Coverage
//!
//! | Layer | Component | Threats Blocked |
//! |-------|-----------|-----------------|
//! | Input | Risk service + path policy | Jailbreaks, high-risk requests on the fast path |
//! | Data | Taint scanner | Indirect injection through documents and tool output |
//! | Prompt | Prompt firewall | Boundary escape, hidden text, PII exposure |
//! | Execution | Sandbox executor | Exfiltration, persistence, runaway generation |
//! | Output | Output-safety service | Unsafe or leaked content in the answer |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        NOPASS GATEWAY                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   POST /v1/chat                                                 │
//! │        │                                                        │
//! │        ▼                                                        │
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐  │
//! │  │   Risk    │──▶│   Taint   │──▶│  Prompt   │──▶│  Sandbox  │  │
//! │  │  scoring  │   │  scanner  │   │ firewall  │   │ executor  │  │
//! │  └───────────┘   └───────────┘   └───────────┘   └─────┬─────┘  │
//! │                                                        │        │
//! │                                  ┌───────────┐         │        │
//! │   { answer, risk_level, path } ◀─│  Output   │◀────────┘        │
//! │                                  │  review   │                  │
//! │                                  └───────────┘                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nopass_core::{server, Gateway, GatewayConfig};
//!
//! let config = GatewayConfig::load("nopass.toml".as_ref())?;
//! let gateway = Arc::new(Gateway::from_config(&config)?);
//! server::serve(&config.server, gateway).await?;
//! ```
//!
//! ## Security Notes
//!
//! - One deadline per request bounds every collaborator call and the sandbox
//! - External data that cannot be scanned is treated as dangerous
//! - A failed output review aborts the request; drafts are never returned
//! - Error responses are generic; details go to the logs only
//! - Prompt text is never logged, only its SHA-256 fingerprint

mod clients;
mod config;
mod error;
mod gateway;
mod policy;
mod scanner;
pub mod server;
mod stage;
mod types;

pub use clients::{
    ClientError, HttpOutputSafetyClient, HttpRiskClient, OutputReviewer, RiskScorer,
    OUTPUT_SAFETY_PATH, RISK_SCORE_PATH,
};
pub use config::{
    CollaboratorConfig, GatewayConfig, LimitsConfig, PromptConfig, SandboxSettings, ServerConfig,
    ENV_OUTPUT_URL, ENV_RISK_URL, ENV_SANDBOX_IMAGE,
};
pub use error::{GatewayError, BAD_REQUEST_BODY, INTERNAL_ERROR_BODY};
pub use gateway::{review_flags, Gateway, FLAG_EXTERNAL_FLAGGED, FLAG_EXTERNAL_SCAN_DEGRADED};
pub use policy::{decide_path, HandlingPath};
pub use scanner::{ScanSummary, TaintScanner};
pub use stage::{Lifecycle, Stage};
pub use types::{ChatRequest, ChatResponse, Metadata, ReviewRequest, RiskRequest, SafetyReview};

// Re-export component types for convenience
pub use nopass_firewall::{ExternalDatum, PromptFirewall, RiskAssessment, RiskLevel, Taint};
pub use nopass_sandbox::{DispatchError, DockerExecutor, Executor, SandboxConfig};

/// Core result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests;
