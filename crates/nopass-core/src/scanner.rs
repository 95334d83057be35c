//! Taint scanning for external data.
//!
//! Every external datum is scored by the risk service, concurrently, before
//! any prompt is composed. The outcome is fail-closed: a HIGH score marks the
//! datum `Flagged`, and any error or timeout marks it `ScanDegraded`. Only an
//! explicit LOW or MEDIUM score makes a datum trusted.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use nopass_firewall::{ExternalDatum, RiskLevel, Taint, TaintReason};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::clients::RiskScorer;
use crate::types::Metadata;

/// Counts of scan outcomes for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub trusted: usize,
    pub flagged: usize,
    pub degraded: usize,
}

impl ScanSummary {
    /// Number of data the prompt builder will mark dangerous.
    pub fn dangerous(&self) -> usize {
        self.flagged + self.degraded
    }

    fn record(&mut self, taint: Taint) {
        match taint {
            Taint::Trusted => self.trusted += 1,
            Taint::Dangerous(TaintReason::Flagged) => self.flagged += 1,
            Taint::Dangerous(TaintReason::ScanDegraded) | Taint::Unscanned => self.degraded += 1,
        }
    }
}

/// Scores external data through a [`RiskScorer`].
pub struct TaintScanner {
    scorer: Arc<dyn RiskScorer>,
    scan_timeout: Duration,
}

impl TaintScanner {
    pub fn new(scorer: Arc<dyn RiskScorer>, scan_timeout: Duration) -> Self {
        Self {
            scorer,
            scan_timeout,
        }
    }

    /// Scan every unscanned datum in `data` and mark it.
    ///
    /// Each scan runs under the earlier of `deadline` and its own
    /// `scan_timeout`. A datum that was already marked is left as is.
    pub async fn scan(
        &self,
        data: &mut [ExternalDatum],
        user_id: &str,
        session_id: &str,
        deadline: Instant,
    ) -> ScanSummary {
        let scan_deadline = deadline.min(Instant::now() + self.scan_timeout);
        let outcomes = join_all(data.iter().map(|datum| async move {
            if datum.taint().is_scanned() {
                return None;
            }
            Some(self.scan_one(datum, user_id, session_id, scan_deadline).await)
        }))
        .await;

        let mut summary = ScanSummary::default();
        for (datum, outcome) in data.iter_mut().zip(outcomes) {
            if let Some(taint) = outcome {
                if let Err(e) = datum.mark(taint) {
                    warn!(datum_id = %datum.id, error = %e, "Could not mark external datum");
                }
            }
            summary.record(datum.taint());
        }
        summary
    }

    async fn scan_one(
        &self,
        datum: &ExternalDatum,
        user_id: &str,
        session_id: &str,
        deadline: Instant,
    ) -> Taint {
        let metadata = datum_metadata(datum, user_id, session_id);
        match timeout_at(deadline, self.scorer.score(&datum.content, &metadata)).await {
            Ok(Ok(assessment)) if assessment.risk_level == RiskLevel::High => {
                debug!(datum_id = %datum.id, "External datum flagged");
                Taint::Dangerous(TaintReason::Flagged)
            }
            Ok(Ok(_)) => Taint::Trusted,
            Ok(Err(e)) => {
                warn!(datum_id = %datum.id, error = %e, "External datum scan failed");
                Taint::Dangerous(TaintReason::ScanDegraded)
            }
            Err(_) => {
                warn!(datum_id = %datum.id, "External datum scan timed out");
                Taint::Dangerous(TaintReason::ScanDegraded)
            }
        }
    }
}

fn datum_metadata(datum: &ExternalDatum, user_id: &str, session_id: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("user_id".to_string(), user_id.to_string());
    metadata.insert("session_id".to_string(), session_id.to_string());
    metadata.insert("origin".to_string(), "external_data".to_string());
    metadata.insert("external_id".to_string(), datum.id.clone());
    metadata
}
