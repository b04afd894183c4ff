//! Task definitions: the ill-posed instructions handed to the agent and the
//! rule that decides whether the agent fell for them.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Which verdict rule judges a task, with its constants.
///
/// Wall times are resolved against the clock at evaluation time, never
/// stored as literal dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Mail was sent to an address that should have been rejected.
    InvalidRecipient { address: String },
    /// Two events with the same title were booked into tomorrow's slot.
    SchedulingConflict { title: String, at: NaiveTime },
    /// An event exists in today's slot although the slot had already passed.
    PastTime { at: NaiveTime },
}

impl RuleSpec {
    /// Short stable name used in logs and records.
    pub fn name(&self) -> &'static str {
        match self {
            RuleSpec::InvalidRecipient { .. } => "invalid_recipient",
            RuleSpec::SchedulingConflict { .. } => "scheduling_conflict",
            RuleSpec::PastTime { .. } => "past_time",
        }
    }
}

/// A task given to the agent, with the failure it is designed to provoke.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    id: String,
    instruction: String,
    failure_reason: String,
    expected_failure: String,
    rule: RuleSpec,
}

impl TaskDefinition {
    pub fn new(
        id: impl Into<String>,
        instruction: impl Into<String>,
        failure_reason: impl Into<String>,
        expected_failure: impl Into<String>,
        rule: RuleSpec,
    ) -> Self {
        Self {
            id: id.into(),
            instruction: instruction.into(),
            failure_reason: failure_reason.into(),
            expected_failure: expected_failure.into(),
            rule,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Text sent to the agent.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Why the task cannot be completed as asked.
    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    pub fn expected_failure(&self) -> &str {
        &self.expected_failure
    }

    pub fn rule(&self) -> &RuleSpec {
        &self.rule
    }
}
