//! # NoPass Firewall - Prompt Isolation Layer
//!
//! The prompt firewall sits between an inbound chat request and the model.
//! It turns the request, its risk assessment and any scanned external content
//! into two separate artifacts: a fixed system prompt and a disarmed,
//! masked user-content block.
//!
//! ## Purpose
//!
//! This crate implements three defensive capabilities:
//!
//! 1. **Structural Isolation** - The policy block is a compile-time constant.
//!    Request text only ever lands in the user-content block, wrapped in
//!    `<data>` boundary markers when it comes from an external source.
//!
//! 2. **Sensitive-Data Masking** - Card-like, email-like and phone-like
//!    substrings are replaced with placeholder tokens before any text is
//!    composed.
//!
//! 3. **Content Disarm (CDR)** - Invisible characters are stripped and
//!    boundary markup inside request text is defanged, so external content
//!    cannot close its own `<data>` block.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Direct Injection | "Ignore previous instructions" in the message | Policy block priority |
//! | Indirect Injection | Instructions hidden in retrieved documents | `<data>` boundaries + taint status |
//! | Boundary Escape | Content that closes `</data>` early | Tag defanging |
//! | Hidden Text | Zero-width / bidi characters | Invisible-character stripping |
//! | PII Leakage | Card numbers, emails, phones in prompts | Masking |
//!
//! Masking is heuristic. It reduces exposure; it does not guarantee that no
//! personal data reaches the model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       PROMPT FIREWALL                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  request text ──▶ strip_invisible ──▶ mask ──▶ defang           │
//! │                                                  │              │
//! │                                                  ▼              │
//! │  ┌──────────────────────┐          ┌──────────────────────────┐ │
//! │  │    SYSTEM PROMPT     │          │       USER CONTENT       │ │
//! │  │  (static policy)     │          │ <context> request <data> │ │
//! │  └──────────────────────┘          └──────────────────────────┘ │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## References
//!
//! - **Greshake et al. (2023)** - "Not What You've Signed Up For: Compromising
//!   Real-World LLM-Integrated Applications with Indirect Prompt Injection"
//!   <https://arxiv.org/abs/2302.12173>
//!
//! - **OWASP LLM Top 10** - LLM01 Prompt Injection, LLM06 Sensitive
//!   Information Disclosure.
//!   <https://owasp.org/www-project-top-10-for-large-language-model-applications/>
//!
//! ## Usage
//!
//! ```rust
//! use nopass_firewall::{IsolationInput, PromptFirewall};
//!
//! let firewall = PromptFirewall::new();
//! let prompt = firewall.build_prompt(&IsolationInput {
//!     user_message: "My card is 4111 1111 1111 1111",
//!     assessment: None,
//!     external: &[],
//!     user_id: "u1",
//!     session_id: "s1",
//! });
//!
//! assert!(prompt.user_content().contains("CARD_TOKEN_1"));
//! assert_eq!(prompt.system_prompt(), firewall.system_prompt());
//! ```

pub mod cdr;
pub mod firewall;
pub mod isolation;
pub mod mask;
pub mod models;

pub use firewall::{FirewallConfig, PromptFirewall};
pub use isolation::{IsolationInput, SYSTEM_PROMPT};
pub use mask::{MaskKind, MaskReport, Masker};
pub use models::{
    ExternalDatum, RiskAssessment, RiskLevel, SandboxPrompt, SanitizeError, Taint, TaintError,
    TaintReason,
};
