//! In-process collaborators for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nopass_core::{
    ClientError, DispatchError, Executor, Gateway, GatewayConfig, Metadata, OutputReviewer,
    ReviewRequest, RiskAssessment, RiskLevel, RiskScorer, SafetyReview,
};
use nopass_firewall::SandboxPrompt;
use nopass_sandbox::effective_budget;
use tokio::time::Instant;

/// Risk service stand-in. Content containing "ignore previous" scores HIGH,
/// content containing "hang" never gets an answer.
pub struct ScriptedRisk {
    pub level: RiskLevel,
    pub self_check: bool,
    pub seen: Mutex<Vec<(String, Metadata)>>,
}

impl ScriptedRisk {
    pub fn new(level: RiskLevel) -> Self {
        Self {
            level,
            self_check: false,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RiskScorer for ScriptedRisk {
    async fn score(&self, prompt: &str, metadata: &Metadata) -> Result<RiskAssessment, ClientError> {
        self.seen
            .lock()
            .unwrap()
            .push((prompt.to_string(), metadata.clone()));
        if prompt.contains("hang") {
            std::future::pending::<()>().await;
        }
        let level = if prompt.contains("ignore previous") {
            RiskLevel::High
        } else {
            self.level
        };
        Ok(RiskAssessment::new(level).with_self_check(self.self_check))
    }
}

/// Sandbox stand-in that honors its budget the way the Docker executor does.
pub struct FakeSandbox {
    pub answer: String,
    pub run_time: Duration,
    pub limit: Duration,
    pub prompts: Mutex<Vec<SandboxPrompt>>,
}

impl FakeSandbox {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            run_time: Duration::ZERO,
            limit: Duration::from_secs(15),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> SandboxPrompt {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("sandbox was not called")
    }
}

#[async_trait]
impl Executor for FakeSandbox {
    async fn execute(&self, prompt: &SandboxPrompt, deadline: Instant) -> nopass_sandbox::Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let budget = effective_budget(self.limit, deadline, Instant::now()).ok_or(
            DispatchError::Timeout {
                budget: Duration::ZERO,
            },
        )?;
        if self.run_time > budget {
            tokio::time::sleep(budget).await;
            return Err(DispatchError::Timeout { budget });
        }
        tokio::time::sleep(self.run_time).await;
        Ok(self.answer.clone())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Output-safety stand-in that approves every draft unchanged.
#[derive(Default)]
pub struct ApprovingReview {
    pub requests: Mutex<Vec<ReviewRequest>>,
}

#[async_trait]
impl OutputReviewer for ApprovingReview {
    async fn review(&self, request: &ReviewRequest) -> Result<SafetyReview, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(SafetyReview {
            final_answer: request.draft_answer.clone(),
            was_modified: false,
            reason_flags: Vec::new(),
        })
    }
}

pub struct TestGateway {
    pub risk: Arc<ScriptedRisk>,
    pub sandbox: Arc<FakeSandbox>,
    pub review: Arc<ApprovingReview>,
    pub gateway: Arc<Gateway>,
}

pub fn test_gateway(config: GatewayConfig, risk: ScriptedRisk, sandbox: FakeSandbox) -> TestGateway {
    let risk = Arc::new(risk);
    let sandbox = Arc::new(sandbox);
    let review = Arc::new(ApprovingReview::default());
    let gateway = Arc::new(Gateway::new(
        &config,
        risk.clone(),
        sandbox.clone(),
        review.clone(),
    ));
    TestGateway {
        risk,
        sandbox,
        review,
        gateway,
    }
}
