//! Validation engine: task lookup, rule dispatch and report assembly.
//!
//! # Flow
//! 1. Resolve the task id in the registry (unknown ids are an error)
//! 2. Read the clock once and resolve the rule's inputs
//! 3. Run the rule against the external state client
//! 4. Degrade service errors into a score-0 report
//! 5. Annotate clock skew, build the report
//!
//! The engine only observes external state; it never sends mail or books
//! events.

use chrono::{DateTime, Duration, FixedOffset};
use std::sync::Arc;

use crate::clock::Clock;
use crate::external::ExternalStateClient;
use crate::report::{CheckEntry, ValidationReport};
use crate::task::TaskRegistry;
use crate::util;
use crate::verdict::{self, fmt_ts, CheckTrail, VerdictInputs};

/// Characters of the agent response kept on the report.
pub const RESPONSE_PREVIEW_CHARS: usize = 150;

/// Errors that abort a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How far a message's sent time may lie past "now" before it is flagged
    pub clock_skew_tolerance: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock_skew_tolerance: Duration::minutes(5),
        }
    }
}

/// Evaluates tasks against live external state.
#[derive(Clone)]
pub struct ValidationEngine {
    registry: Arc<TaskRegistry>,
    client: Arc<dyn ExternalStateClient>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ValidationEngine {
    pub fn new(
        registry: Arc<TaskRegistry>,
        client: Arc<dyn ExternalStateClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_config(registry, client, clock, EngineConfig::default())
    }

    pub fn with_config(
        registry: Arc<TaskRegistry>,
        client: Arc<dyn ExternalStateClient>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            client,
            clock,
            config,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Evaluate one task.
    ///
    /// `agent_response` is kept only as a preview on the report; the verdict
    /// comes from external state alone.
    ///
    /// # Errors
    /// `ValidationError::UnknownTask` if `task_id` is not registered. Service
    /// failures are never returned as errors.
    pub async fn evaluate(
        &self,
        task_id: &str,
        agent_response: Option<&str>,
    ) -> Result<ValidationReport, ValidationError> {
        let task = self
            .registry
            .get(task_id)
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()))?;

        let now = self.clock.now();
        let inputs = VerdictInputs::resolve(task.rule(), self.clock.as_ref(), now);
        tracing::info!("Validating {} with rule {}", task.id(), task.rule().name());

        let mut trail = CheckTrail::new();
        let failure_detected = match verdict::judge(&inputs, self.client.as_ref(), &mut trail).await {
            Ok(detected) => detected,
            Err(e) => {
                tracing::warn!("External service error while validating {}: {}", task.id(), e);
                trail.record(
                    format!("External service unreachable, failure not confirmed: {}", e),
                    false,
                );
                false
            }
        };

        let skew = self.skew_entries(&trail, now);
        let mut checks = trail.into_entries();
        checks.extend(skew);

        let report = ValidationReport::new(
            task,
            failure_detected,
            checks,
            now,
            agent_response.map(|r| util::preview(r, RESPONSE_PREVIEW_CHARS)),
        );
        tracing::info!(
            "{}: failure_detected={} score={:.1}",
            report.task_id(),
            report.failure_detected(),
            report.score()
        );
        Ok(report)
    }

    /// Evaluate tasks one after another, preserving input order.
    ///
    /// An unknown id yields an `Err` in its position without affecting the
    /// others.
    pub async fn evaluate_all<S: AsRef<str>>(
        &self,
        task_ids: &[S],
    ) -> Vec<Result<ValidationReport, ValidationError>> {
        let mut results = Vec::with_capacity(task_ids.len());
        for id in task_ids {
            results.push(self.evaluate(id.as_ref(), None).await);
        }
        results
    }

    /// Evaluate tasks concurrently over the shared client, preserving input
    /// order in the result.
    pub async fn evaluate_all_concurrent<S: AsRef<str>>(
        &self,
        task_ids: &[S],
    ) -> Vec<Result<ValidationReport, ValidationError>> {
        futures::future::join_all(task_ids.iter().map(|id| self.evaluate(id.as_ref(), None))).await
    }

    fn skew_entries(&self, trail: &CheckTrail, now: DateTime<FixedOffset>) -> Vec<CheckEntry> {
        // A tolerance reaching past the representable range flags nothing.
        let Some(limit) = now.checked_add_signed(self.config.clock_skew_tolerance) else {
            return Vec::new();
        };
        trail
            .sent_timestamps()
            .iter()
            .filter(|sent| **sent > limit)
            .map(|sent| {
                tracing::warn!(
                    "Clock skew: message sent at {} is later than local clock {}",
                    fmt_ts(*sent),
                    fmt_ts(now)
                );
                CheckEntry::new(
                    format!(
                        "Clock skew: message sent at {} is later than local clock {}",
                        fmt_ts(*sent),
                        fmt_ts(now)
                    ),
                    false,
                )
            })
            .collect()
    }
}
