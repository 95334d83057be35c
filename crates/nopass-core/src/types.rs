//! Wire types for the chat endpoint and the collaborator services.

use std::collections::BTreeMap;

use nopass_firewall::{ExternalDatum, RiskLevel};
use serde::{Deserialize, Serialize};

use crate::policy::HandlingPath;

/// Metadata sent alongside a prompt to the risk service.
pub type Metadata = BTreeMap<String, String>;

/// Inbound chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub session_id: String,

    /// The user's message. Required.
    pub message: String,

    /// Documents or tool outputs to be treated as untrusted data.
    #[serde(default)]
    pub external_data: Vec<ExternalDatum>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_id: String::new(),
            session_id: String::new(),
            message: message.into(),
            external_data: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_identity(mut self, user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.session_id = session_id.into();
        self
    }

    #[must_use]
    pub fn with_external(mut self, datum: ExternalDatum) -> Self {
        self.external_data.push(datum);
        self
    }

    /// Metadata for the primary message's risk call.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("user_id".to_string(), self.user_id.clone());
        metadata.insert("session_id".to_string(), self.session_id.clone());
        metadata
    }
}

/// Successful chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub risk_level: RiskLevel,
    pub path: HandlingPath,
}

/// Body of `POST {risk}/v1/risk-score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRequest {
    pub prompt: String,
    pub metadata: Metadata,
}

/// Body of `POST {output_safety}/v1/output-safety`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub user_prompt: String,
    pub draft_answer: String,
    pub risk_level: RiskLevel,
    pub flags: Vec<String>,
    pub mode: HandlingPath,
}

/// Output-safety verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReview {
    pub final_answer: String,

    #[serde(default)]
    pub was_modified: bool,

    #[serde(default)]
    pub reason_flags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(request.message, "hi");
        assert!(request.user_id.is_empty());
        assert!(request.external_data.is_empty());
    }

    #[test]
    fn test_chat_request_requires_message() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"user_id":"u1"}"#).is_err());
    }

    #[test]
    fn test_external_data_type_field() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"message":"m","external_data":[{"id":"d1","source":"web","type":"html","content":"x"}]}"#,
        )
        .unwrap();
        let datum = &request.external_data[0];
        assert_eq!(datum.kind, "html");
        assert!(!datum.taint().is_scanned());
    }

    #[test]
    fn test_response_wire_format() {
        let response = ChatResponse {
            answer: "ok".to_string(),
            risk_level: RiskLevel::Medium,
            path: HandlingPath::Fast,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"answer": "ok", "risk_level": "MEDIUM", "path": "fast"})
        );
    }

    #[test]
    fn test_review_request_wire_format() {
        let request = ReviewRequest {
            user_prompt: "p".to_string(),
            draft_answer: "d".to_string(),
            risk_level: RiskLevel::High,
            flags: vec!["jailbreak".to_string()],
            mode: HandlingPath::Slow,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "slow");
        assert_eq!(json["risk_level"], "HIGH");
    }

    #[test]
    fn test_safety_review_optional_fields() {
        let review: SafetyReview = serde_json::from_str(r#"{"final_answer":"a"}"#).unwrap();
        assert!(!review.was_modified);
        assert!(review.reason_flags.is_empty());
    }

    #[test]
    fn test_metadata() {
        let metadata = ChatRequest::new("m").with_identity("u1", "s1").metadata();
        assert_eq!(metadata.get("user_id").map(String::as_str), Some("u1"));
        assert_eq!(metadata.get("session_id").map(String::as_str), Some("s1"));
    }
}
