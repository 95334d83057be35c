//! The gateway facade.
//!
//! [`Gateway`] owns the collaborators and runs one chat request through the
//! whole pipeline under a single deadline.

use std::future::Future;
use std::sync::Arc;

use nopass_firewall::{cdr, IsolationInput, PromptFirewall, RiskAssessment};
use nopass_sandbox::{DockerExecutor, Executor};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clients::{HttpOutputSafetyClient, HttpRiskClient, OutputReviewer, RiskScorer};
use crate::config::{GatewayConfig, LimitsConfig};
use crate::error::GatewayError;
use crate::policy::decide_path;
use crate::scanner::{ScanSummary, TaintScanner};
use crate::stage::{Lifecycle, Stage};
use crate::types::{ChatRequest, ChatResponse, ReviewRequest};
use crate::Result;

/// Review flag added when at least one external datum was flagged HIGH.
pub const FLAG_EXTERNAL_FLAGGED: &str = "external_data_flagged";
/// Review flag added when at least one external datum could not be scanned.
pub const FLAG_EXTERNAL_SCAN_DEGRADED: &str = "external_data_scan_degraded";

/// The NoPass request gateway.
///
/// # Pipeline
///
/// 1. Validate the request
/// 2. Score the message with the risk service
/// 3. Decide the handling path
/// 4. Scan every external datum (concurrently, fail-closed)
/// 5. Compose the isolated prompt pair
/// 6. Execute it in the sandbox
/// 7. Review the draft answer with the output-safety service
///
/// Any failure aborts the request. Nothing from the sandbox reaches the
/// caller unless step 7 succeeded.
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Gateway::from_config(&GatewayConfig::default())?;
/// let response = gateway.handle(ChatRequest::new("What is Rust?")).await?;
/// println!("{} ({})", response.answer, response.path);
/// ```
pub struct Gateway {
    limits: LimitsConfig,
    firewall: PromptFirewall,
    risk: Arc<dyn RiskScorer>,
    scanner: TaintScanner,
    executor: Arc<dyn Executor>,
    reviewer: Arc<dyn OutputReviewer>,
}

impl Gateway {
    /// Create a gateway from explicit collaborators.
    pub fn new(
        config: &GatewayConfig,
        risk: Arc<dyn RiskScorer>,
        executor: Arc<dyn Executor>,
        reviewer: Arc<dyn OutputReviewer>,
    ) -> Self {
        let scanner = TaintScanner::new(Arc::clone(&risk), config.limits.scan_timeout());
        Self {
            limits: config.limits.clone(),
            firewall: PromptFirewall::with_config(config.firewall_config()),
            risk,
            scanner,
            executor,
            reviewer,
        }
    }

    /// Create a gateway wired to the HTTP collaborators and the Docker sandbox.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let risk = HttpRiskClient::new(&config.risk).map_err(|source| GatewayError::Collaborator {
            service: "risk",
            source,
        })?;
        let reviewer = HttpOutputSafetyClient::new(&config.output_safety).map_err(|source| {
            GatewayError::Collaborator {
                service: "output_safety",
                source,
            }
        })?;
        let executor = DockerExecutor::new(config.sandbox.to_sandbox_config());

        info!(
            risk_url = risk.url(),
            output_url = reviewer.url(),
            image = %config.sandbox.image,
            "Gateway initialized"
        );

        Ok(Self::new(
            config,
            Arc::new(risk),
            Arc::new(executor),
            Arc::new(reviewer),
        ))
    }

    /// The prompt firewall in use.
    pub fn firewall(&self) -> &PromptFirewall {
        &self.firewall
    }

    /// Request limits in use.
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Handle one chat request.
    ///
    /// The deadline is established here and bounds every later step.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse> {
        let span = info_span!("chat", request_id = %Uuid::new_v4());
        self.handle_with_deadline(request, Instant::now() + self.limits.request_timeout())
            .instrument(span)
            .await
    }

    async fn handle_with_deadline(
        &self,
        mut request: ChatRequest,
        deadline: Instant,
    ) -> Result<ChatResponse> {
        let mut lifecycle = Lifecycle::new();
        match self.run(&mut request, deadline, &mut lifecycle).await {
            Ok(response) => {
                info!(
                    risk_level = %response.risk_level,
                    path = %response.path,
                    "Request completed"
                );
                Ok(response)
            }
            Err(e) => {
                let stage = lifecycle.abort(e.to_string());
                if e.is_client_error() {
                    info!(stage = %stage, error = %e, "Request rejected");
                } else {
                    warn!(stage = %stage, error = %e, "Request aborted");
                }
                if let GatewayError::Execution(dispatch) = &e {
                    if let Some(diagnostics) = dispatch.diagnostics() {
                        warn!(executor = self.executor.name(), %diagnostics, "Sandbox diagnostics");
                    }
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &mut ChatRequest,
        deadline: Instant,
        lifecycle: &mut Lifecycle,
    ) -> Result<ChatResponse> {
        self.validate(request)?;

        // Phase 1: risk scoring
        let metadata = request.metadata();
        let assessment = within(deadline, lifecycle.stage(), async {
            self.risk
                .score(&request.message, &metadata)
                .await
                .map_err(|source| GatewayError::Collaborator {
                    service: "risk",
                    source,
                })
        })
        .await?;
        lifecycle.advance(Stage::RiskScored);
        debug!(
            risk_level = %assessment.risk_level,
            flags = ?assessment.flags,
            self_check = assessment.self_check_required,
            "Message scored"
        );

        // Phase 2: path
        let path = decide_path(&assessment);
        lifecycle.advance(Stage::PathDecided);

        // Phase 3: external data
        let summary = self
            .scanner
            .scan(
                &mut request.external_data,
                &request.user_id,
                &request.session_id,
                deadline,
            )
            .await;
        lifecycle.advance(Stage::ExternalScanned);
        if summary.dangerous() > 0 {
            info!(
                flagged = summary.flagged,
                degraded = summary.degraded,
                "External data marked dangerous"
            );
        }
        if Instant::now() >= deadline {
            return Err(GatewayError::DeadlineExceeded {
                stage: lifecycle.stage(),
            });
        }

        // Phase 4: prompt
        let (prompt, report) = self.firewall.build_prompt_with_report(&IsolationInput {
            user_message: &request.message,
            assessment: Some(&assessment),
            external: &request.external_data,
            user_id: &request.user_id,
            session_id: &request.session_id,
        });
        lifecycle.advance(Stage::PromptBuilt);
        debug!(
            fingerprint = %prompt.fingerprint(),
            masked = report.total(),
            "Prompt built"
        );

        // Phase 5: sandbox
        let draft = within(deadline, lifecycle.stage(), async {
            self.executor
                .execute(&prompt, deadline)
                .await
                .map_err(GatewayError::from)
        })
        .await?;
        lifecycle.advance(Stage::Executed);
        debug!(executor = self.executor.name(), "Draft produced");

        // Phase 6: review
        let review_request = ReviewRequest {
            user_prompt: request.message.clone(),
            draft_answer: draft,
            risk_level: assessment.risk_level,
            flags: review_flags(&assessment, &summary),
            mode: path,
        };
        let review = within(deadline, lifecycle.stage(), async {
            self.reviewer
                .review(&review_request)
                .await
                .map_err(|source| GatewayError::Collaborator {
                    service: "output_safety",
                    source,
                })
        })
        .await?;
        lifecycle.advance(Stage::Reviewed);
        if review.was_modified {
            info!(reason_flags = ?review.reason_flags, "Answer modified by review");
        }

        lifecycle.advance(Stage::Responded);
        Ok(ChatResponse {
            answer: review.final_answer,
            risk_level: assessment.risk_level,
            path,
        })
    }

    fn validate(&self, request: &ChatRequest) -> Result<()> {
        if request.message.trim().is_empty() {
            return Err(GatewayError::MalformedInput("empty message".to_string()));
        }
        cdr::check_size(&request.message, self.limits.max_message_bytes)
            .map_err(|e| GatewayError::MalformedInput(format!("message: {}", e)))?;

        if request.external_data.len() > self.limits.max_external_items {
            return Err(GatewayError::MalformedInput(format!(
                "{} external data items (max {})",
                request.external_data.len(),
                self.limits.max_external_items
            )));
        }
        for datum in &request.external_data {
            self.firewall
                .check_content(&datum.content)
                .map_err(|e| GatewayError::MalformedInput(format!("external datum: {}", e)))?;
        }
        Ok(())
    }
}

/// Flags sent to the output-safety review: the message's own flags plus a
/// marker per kind of dangerous external data.
pub fn review_flags(assessment: &RiskAssessment, summary: &ScanSummary) -> Vec<String> {
    let mut flags = assessment.flags.clone();
    for (count, flag) in [
        (summary.flagged, FLAG_EXTERNAL_FLAGGED),
        (summary.degraded, FLAG_EXTERNAL_SCAN_DEGRADED),
    ] {
        if count > 0 && !flags.iter().any(|f| f == flag) {
            flags.push(flag.to_string());
        }
    }
    flags
}

async fn within<T>(
    deadline: Instant,
    stage: Stage,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    timeout_at(deadline, fut)
        .await
        .map_err(|_| GatewayError::DeadlineExceeded { stage })?
}
