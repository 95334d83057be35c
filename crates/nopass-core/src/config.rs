//! Configuration types for the NoPass gateway.

use std::path::Path;
use std::time::Duration;

use nopass_firewall::FirewallConfig;
use nopass_sandbox::SandboxConfig;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GatewayError;
use crate::Result;

/// Env var overriding the risk service base URL.
pub const ENV_RISK_URL: &str = "NOPASS_RISK_URL";
/// Env var overriding the output-safety service base URL.
pub const ENV_OUTPUT_URL: &str = "NOPASS_OUTPUT_URL";
/// Env var overriding the sandbox image.
pub const ENV_SANDBOX_IMAGE: &str = "NOPASS_SANDBOX_IMAGE";

/// Configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound HTTP listener.
    pub server: ServerConfig,

    /// Risk-scoring collaborator.
    #[serde(
        default = "CollaboratorConfig::risk_default",
        deserialize_with = "risk_section"
    )]
    pub risk: CollaboratorConfig,

    /// Output-safety collaborator.
    #[serde(
        default = "CollaboratorConfig::output_safety_default",
        deserialize_with = "output_safety_section"
    )]
    pub output_safety: CollaboratorConfig,

    /// Isolated execution environment.
    pub sandbox: SandboxSettings,

    /// Per-request limits and deadlines.
    pub limits: LimitsConfig,

    /// Prompt composition.
    pub prompt: PromptConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            risk: CollaboratorConfig::risk_default(),
            output_safety: CollaboratorConfig::output_safety_default(),
            sandbox: SandboxSettings::default(),
            limits: LimitsConfig::default(),
            prompt: PromptConfig::default(),
        }
    }
}

/// Inbound HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
        }
    }
}

impl ServerConfig {
    /// Returns the bind address string (e.g., "0.0.0.0:8082").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A collaborator HTTP service.
///
/// Each service has its own defaults, so a TOML section that sets only
/// some fields is filled in from that service's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Base URL, without trailing path.
    pub base_url: String,

    /// Client-level timeout per call.
    pub timeout_ms: u64,
}

impl CollaboratorConfig {
    /// Risk service: `http://localhost:8001`, 2 s.
    pub fn risk_default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_ms: 2_000,
        }
    }

    /// Output-safety service: `http://localhost:8002`, 3 s.
    pub fn output_safety_default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_ms: 3_000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fields present in a collaborator section.
#[derive(Deserialize)]
struct CollaboratorSection {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

impl CollaboratorSection {
    fn over(self, defaults: CollaboratorConfig) -> CollaboratorConfig {
        CollaboratorConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
        }
    }
}

fn risk_section<'de, D>(deserializer: D) -> std::result::Result<CollaboratorConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(CollaboratorSection::deserialize(deserializer)?.over(CollaboratorConfig::risk_default()))
}

fn output_safety_section<'de, D>(
    deserializer: D,
) -> std::result::Result<CollaboratorConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(CollaboratorSection::deserialize(deserializer)?
        .over(CollaboratorConfig::output_safety_default()))
}

/// Isolated execution environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// Docker CLI binary.
    pub docker_bin: String,

    /// Model image.
    pub image: String,

    /// Sub-deadline for one execution. Must not exceed the request timeout.
    pub timeout_secs: u64,

    /// Container memory limit.
    pub memory: String,

    /// Container process limit.
    pub pids_limit: u32,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        let defaults = SandboxConfig::new();
        Self {
            docker_bin: defaults.docker_bin,
            image: defaults.image,
            timeout_secs: defaults.timeout.as_secs(),
            memory: defaults.memory,
            pids_limit: defaults.pids_limit,
        }
    }
}

impl SandboxSettings {
    /// Map onto the sandbox crate's config.
    pub fn to_sandbox_config(&self) -> SandboxConfig {
        SandboxConfig::new()
            .with_docker_bin(self.docker_bin.clone())
            .with_image(self.image.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_memory(self.memory.clone())
            .with_pids_limit(self.pids_limit)
    }
}

/// Allowance per external datum for its JSON keys, id, source and type.
const DATUM_ENVELOPE_BYTES: usize = 4 * 1024;
/// Allowance for the request object around the message and data.
const REQUEST_ENVELOPE_BYTES: usize = 64 * 1024;

/// Per-request limits and deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// End-to-end deadline, established when a request is received.
    pub request_timeout_secs: u64,

    /// Sub-deadline for scanning one external datum.
    pub scan_timeout_ms: u64,

    /// Maximum message size in bytes.
    pub max_message_bytes: usize,

    /// Maximum number of external data items.
    pub max_external_items: usize,

    /// Maximum size of one external datum's content in bytes.
    pub max_datum_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            scan_timeout_ms: 5_000,
            max_message_bytes: 64 * 1024,
            max_external_items: 32,
            max_datum_bytes: 256 * 1024,
        }
    }
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// Largest HTTP body accepted for `/v1/chat`.
    ///
    /// Content limits count decoded bytes, so the raw allowance is doubled
    /// to leave room for JSON escaping. Anything that passes the body limit
    /// is still checked item by item during validation.
    pub fn max_body_bytes(&self) -> usize {
        let per_datum = self.max_datum_bytes.saturating_add(DATUM_ENVELOPE_BYTES);
        self.max_external_items
            .saturating_mul(per_datum)
            .saturating_add(self.max_message_bytes)
            .saturating_mul(2)
            .saturating_add(REQUEST_ENVELOPE_BYTES)
    }
}

/// Prompt composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Emit the `<context>` block in user content.
    pub include_context: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            include_context: true,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file, apply env overrides, validate.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                GatewayError::Config(format!(
                    "Failed to read config file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GatewayError::Config(format!("Invalid config: {}", e)))
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_RISK_URL).filter(|v| !v.is_empty()) {
            self.risk.base_url = url;
        }
        if let Some(url) = lookup(ENV_OUTPUT_URL).filter(|v| !v.is_empty()) {
            self.output_safety.base_url = url;
        }
        if let Some(image) = lookup(ENV_SANDBOX_IMAGE).filter(|v| !v.is_empty()) {
            self.sandbox.image = image;
        }
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> Result<()> {
        for (name, collaborator) in [("risk", &self.risk), ("output_safety", &self.output_safety)] {
            if collaborator.base_url.trim().is_empty() {
                return Err(GatewayError::Config(format!("{}.base_url is empty", name)));
            }
            if collaborator.timeout_ms == 0 {
                return Err(GatewayError::Config(format!("{}.timeout_ms must be > 0", name)));
            }
        }
        if self.limits.request_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "limits.request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.limits.scan_timeout_ms == 0 {
            return Err(GatewayError::Config("limits.scan_timeout_ms must be > 0".to_string()));
        }
        if self.sandbox.timeout_secs == 0 {
            return Err(GatewayError::Config("sandbox.timeout_secs must be > 0".to_string()));
        }
        if self.sandbox.timeout_secs > self.limits.request_timeout_secs {
            return Err(GatewayError::Config(format!(
                "sandbox.timeout_secs ({}) exceeds limits.request_timeout_secs ({})",
                self.sandbox.timeout_secs, self.limits.request_timeout_secs
            )));
        }
        if self.sandbox.image.trim().is_empty() {
            return Err(GatewayError::Config("sandbox.image is empty".to_string()));
        }
        Ok(())
    }

    /// Firewall settings derived from this config.
    pub fn firewall_config(&self) -> FirewallConfig {
        FirewallConfig {
            include_context: self.prompt.include_context,
            max_content_bytes: self.limits.max_datum_bytes,
        }
    }
}
