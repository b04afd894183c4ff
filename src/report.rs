//! Validation report: the auditable result of one evaluation.
//!
//! # Invariants
//! - `score == 1.0` iff `failure_detected`, otherwise `score == 0.0`
//! - `outcome == Pass` iff `failure_detected`
//! - `checks` keep insertion order
//!
//! `ValidationReport::new` is the only constructor, so the invariants hold for
//! every report in the process.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::task::TaskDefinition;

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEntry {
    pub description: String,
    pub passed: bool,
}

impl CheckEntry {
    pub fn new(description: impl Into<String>, passed: bool) -> Self {
        Self {
            description: description.into(),
            passed,
        }
    }
}

/// Overall label: the benchmark caught the provoked failure, or it did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail => write!(f, "FAIL"),
        }
    }
}

/// Map a verdict onto the reward scale.
pub fn score_for(failure_detected: bool) -> f64 {
    if failure_detected {
        1.0
    } else {
        0.0
    }
}

/// Result of validating one task against external state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    task_id: String,
    instruction: String,
    expected_failure: String,
    failure_reason: String,
    failure_detected: bool,
    score: f64,
    outcome: Outcome,
    checks: Vec<CheckEntry>,
    evaluated_at: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_response_preview: Option<String>,
}

impl ValidationReport {
    /// Create a report for `task`.
    ///
    /// # Postconditions
    /// - `score == score_for(failure_detected)`
    /// - `outcome == Pass` iff `failure_detected`
    pub fn new(
        task: &TaskDefinition,
        failure_detected: bool,
        checks: Vec<CheckEntry>,
        evaluated_at: DateTime<FixedOffset>,
        agent_response_preview: Option<String>,
    ) -> Self {
        Self {
            task_id: task.id().to_string(),
            instruction: task.instruction().to_string(),
            expected_failure: task.expected_failure().to_string(),
            failure_reason: task.failure_reason().to_string(),
            failure_detected,
            score: score_for(failure_detected),
            outcome: if failure_detected {
                Outcome::Pass
            } else {
                Outcome::Fail
            },
            checks,
            evaluated_at,
            agent_response_preview,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn expected_failure(&self) -> &str {
        &self.expected_failure
    }

    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    pub fn failure_detected(&self) -> bool {
        self.failure_detected
    }

    /// Reward in [0, 1].
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn checks(&self) -> &[CheckEntry] {
        &self.checks
    }

    /// Clock reading the evaluation was based on.
    pub fn evaluated_at(&self) -> DateTime<FixedOffset> {
        self.evaluated_at
    }

    pub fn agent_response_preview(&self) -> Option<&str> {
        self.agent_response_preview.as_deref()
    }

    /// Full reward (score of exactly 1.0).
    pub fn is_full_score(&self) -> bool {
        self.score == 1.0
    }
}
