//! The execution capability.
//!
//! The gateway only knows this trait. The concrete isolation mechanism
//! (container, microVM, restricted subprocess) is chosen at wiring time.

use std::time::Duration;

use async_trait::async_trait;
use nopass_firewall::SandboxPrompt;
use tokio::time::Instant;

use crate::error::Result;

/// Runs a composed prompt pair in an isolated environment.
///
/// Implementations must:
/// - start from a blank environment on every call (no state across calls)
/// - deny network access and mount the prompt artifacts read-only
/// - finish, or tear the environment down, by `deadline`
/// - tear the environment down when the returned future is dropped
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute and return the environment's primary output as answer text.
    async fn execute(&self, prompt: &SandboxPrompt, deadline: Instant) -> Result<String>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Effective budget: the executor's own limit, capped by time left until
/// `deadline`. Returns `None` when the deadline has already passed.
pub fn effective_budget(limit: Duration, deadline: Instant, now: Instant) -> Option<Duration> {
    let remaining = deadline.checked_duration_since(now)?;
    if remaining.is_zero() {
        return None;
    }
    Some(limit.min(remaining))
}
