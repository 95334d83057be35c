//! Unit tests for nopass-core, plus in-process collaborators shared by the
//! module tests.

pub(crate) mod fakes {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use nopass_firewall::{RiskAssessment, RiskLevel, SandboxPrompt};
    use nopass_sandbox::{DispatchError, Executor};
    use tokio::time::Instant;

    use crate::clients::{ClientError, OutputReviewer, RiskScorer};
    use crate::types::{Metadata, ReviewRequest, SafetyReview};

    /// Scores everything at a fixed level, except content containing
    /// "ignore previous" (HIGH), "fail" (error) or "hang" (never answers).
    pub struct FakeScorer {
        level: RiskLevel,
        self_check: bool,
        flags: Vec<String>,
        fail: bool,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeScorer {
        pub fn new(level: RiskLevel) -> Self {
            Self {
                level,
                self_check: false,
                flags: Vec::new(),
                fail: false,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(RiskLevel::Low)
            }
        }

        pub fn with_self_check(mut self) -> Self {
            self.self_check = true;
            self
        }

        pub fn with_flag(mut self, flag: &str) -> Self {
            self.flags.push(flag.to_string());
            self
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RiskScorer for FakeScorer {
        async fn score(
            &self,
            prompt: &str,
            _metadata: &Metadata,
        ) -> Result<RiskAssessment, ClientError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail || prompt.contains("fail") {
                return Err(ClientError::Status {
                    service: "risk",
                    status: 503,
                });
            }
            if prompt.contains("hang") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            let level = if prompt.contains("ignore previous") {
                RiskLevel::High
            } else {
                self.level
            };
            let mut assessment = RiskAssessment::new(level).with_self_check(self.self_check);
            assessment.flags = self.flags.clone();
            Ok(assessment)
        }
    }

    /// Records every prompt pair and answers with a canned string.
    pub struct RecordingExecutor {
        answer: Option<String>,
        delay: Option<Duration>,
        prompts: Mutex<Vec<SandboxPrompt>>,
    }

    impl RecordingExecutor {
        pub fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                answer: None,
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn prompts(&self) -> Vec<SandboxPrompt> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn execute(
            &self,
            prompt: &SandboxPrompt,
            _deadline: Instant,
        ) -> nopass_sandbox::Result<String> {
            self.prompts.lock().unwrap().push(prompt.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.answer
                .clone()
                .ok_or_else(|| DispatchError::failure("exit status 1", "model crashed"))
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    /// Passes drafts through, rewrites them, or fails.
    pub struct FakeReviewer {
        rewrite: Option<String>,
        fail: bool,
        requests: Mutex<Vec<ReviewRequest>>,
    }

    impl FakeReviewer {
        pub fn passthrough() -> Self {
            Self {
                rewrite: None,
                fail: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn rewriting(answer: &str) -> Self {
            Self {
                rewrite: Some(answer.to_string()),
                ..Self::passthrough()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::passthrough()
            }
        }

        pub fn requests(&self) -> Vec<ReviewRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutputReviewer for FakeReviewer {
        async fn review(&self, request: &ReviewRequest) -> Result<SafetyReview, ClientError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(ClientError::Status {
                    service: "output_safety",
                    status: 502,
                });
            }
            Ok(match &self.rewrite {
                Some(answer) => SafetyReview {
                    final_answer: answer.clone(),
                    was_modified: true,
                    reason_flags: vec!["rewritten".to_string()],
                },
                None => SafetyReview {
                    final_answer: request.draft_answer.clone(),
                    was_modified: false,
                    reason_flags: Vec::new(),
                },
            })
        }
    }
}

#[test]
fn test_crate_structure() {
    // Smoke test - verifies the public surface compiles together
    use crate::{ChatRequest, GatewayConfig, HandlingPath, Stage};

    let _config = GatewayConfig::default();
    let _request = ChatRequest::new("hello");
    let _path = HandlingPath::Fast;
    assert_eq!(Stage::Received.next(), Some(Stage::RiskScored));
}
