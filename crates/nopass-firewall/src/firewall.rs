//! Main firewall facade
//!
//! Combines masking, content disarm and structural isolation into a single
//! interface used by the gateway.

use serde::{Deserialize, Serialize};

use crate::cdr;
use crate::isolation::{self, IsolationInput};
use crate::mask::{MaskReport, Masker};
use crate::models::{SandboxPrompt, SanitizeError};

/// Default maximum size of any single request text (256 KiB).
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 256 * 1024;

/// Firewall configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// Emit the `<context>` block (ids and risk metadata)
    pub include_context: bool,
    /// Maximum size of any single request text
    pub max_content_bytes: usize,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            include_context: true,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
        }
    }
}

/// The prompt firewall - main interface
pub struct PromptFirewall {
    config: FirewallConfig,
    masker: Masker,
}

impl PromptFirewall {
    /// Create a new firewall with default config
    pub fn new() -> Self {
        Self::with_config(FirewallConfig::default())
    }

    /// Create a firewall with custom config
    pub fn with_config(config: FirewallConfig) -> Self {
        Self {
            config,
            masker: Masker::new(),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &FirewallConfig {
        &self.config
    }

    /// The fixed system prompt
    pub fn system_prompt(&self) -> &'static str {
        isolation::SYSTEM_PROMPT
    }

    /// Reject text larger than the configured limit
    pub fn check_content(&self, text: &str) -> Result<(), SanitizeError> {
        cdr::check_size(text, self.config.max_content_bytes)
    }

    /// Mask sensitive substrings
    pub fn mask(&self, text: &str) -> String {
        self.masker.mask(text)
    }

    /// Build the isolated prompt pair
    pub fn build_prompt(&self, input: &IsolationInput<'_>) -> SandboxPrompt {
        self.build_prompt_with_report(input).0
    }

    /// Build the isolated prompt pair and report mask counts
    pub fn build_prompt_with_report(&self, input: &IsolationInput<'_>) -> (SandboxPrompt, MaskReport) {
        isolation::compose(&self.masker, input, self.config.include_context)
    }
}

impl Default for PromptFirewall {
    fn default() -> Self {
        Self::new()
    }
}
