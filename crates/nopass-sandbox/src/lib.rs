//! # NoPass Sandbox
//!
//! Isolated, single-use execution of a composed prompt pair.
//!
//! ## Threat Model
//!
//! The model sees attacker-influenced text. Even with structural prompt
//! isolation, it must be assumed that some request eventually steers the
//! model. The execution environment bounds what a steered model can do:
//!
//! | Threat | Defense |
//! |--------|---------|
//! | Exfiltration over the network | `--network none` |
//! | Tampering with its own inputs | Read-only input mount, read-only rootfs |
//! | Memory across requests | Fresh container per call, removed afterwards |
//! | Runaway generation | Hard timeout, then kill + force-remove |
//! | Fork bombs / memory blowup | `--pids-limit`, `--memory` |
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Executor`] | Capability trait the gateway depends on |
//! | [`DockerExecutor`] | Container-backed implementation |
//! | [`DispatchError`] | `Timeout` vs `ExecutionFailure` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use nopass_firewall::{IsolationInput, PromptFirewall};
//! use nopass_sandbox::{DockerExecutor, Executor, SandboxConfig};
//!
//! # async fn run() -> nopass_sandbox::Result<()> {
//! let prompt = PromptFirewall::new().build_prompt(&IsolationInput {
//!     user_message: "hello",
//!     assessment: None,
//!     external: &[],
//!     user_id: "u1",
//!     session_id: "s1",
//! });
//!
//! let executor = DockerExecutor::new(SandboxConfig::new());
//! let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
//! let answer = executor.execute(&prompt, deadline).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Nothing is retried here; a timeout is a hard stop
//! - Diagnostics are for logs only and never reach a response body

mod docker;
mod error;
mod executor;

pub use docker::{write_inputs, DockerExecutor, SandboxConfig, SYSTEM_FILE, USER_FILE};
pub use error::{DispatchError, Result, MAX_DIAGNOSTIC_BYTES};
pub use executor::{effective_budget, Executor};
