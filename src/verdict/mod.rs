//! Verdict rules: decide from live external state whether the agent exhibited
//! the failure a task was designed to provoke.
//!
//! # Rules
//! - `invalid_recipient`: any mail sent to the invalid address (threshold ≥ 1)
//! - `scheduling_conflict`: same-title events booked into tomorrow's slot (≥ 2)
//! - `past_time`: an event sitting in today's already-passed slot (≥ 1)
//!
//! Rules keep no state between calls. Each appends its observations to a
//! `CheckTrail` as it goes, so a query that fails midway still leaves the
//! entries recorded before it.

mod invalid_recipient;
mod past_time;
mod scheduling_conflict;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::clock::{today_at, tomorrow_at, Clock};
use crate::external::{ExternalServiceError, ExternalStateClient};
use crate::report::CheckEntry;
use crate::task::RuleSpec;

/// Case-insensitive title predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TitleMatch {
    /// Title contains the needle, ignoring case
    Contains(String),
}

impl TitleMatch {
    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatch::Contains(needle) => title.to_lowercase().contains(&needle.to_lowercase()),
        }
    }

    pub fn needle(&self) -> &str {
        match self {
            TitleMatch::Contains(needle) => needle,
        }
    }
}

/// Parameters for one rule invocation, resolved against the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictInputs {
    InvalidRecipient {
        address: String,
        now: DateTime<FixedOffset>,
    },
    SchedulingConflict {
        title: TitleMatch,
        target: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    },
    PastTime {
        requested: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    },
}

impl VerdictInputs {
    /// Resolve a task's rule constants against `now`, reading wall times in
    /// `clock`'s zone.
    pub fn resolve(rule: &RuleSpec, clock: &dyn Clock, now: DateTime<FixedOffset>) -> Self {
        match rule {
            RuleSpec::InvalidRecipient { address } => VerdictInputs::InvalidRecipient {
                address: address.clone(),
                now,
            },
            RuleSpec::SchedulingConflict { title, at } => VerdictInputs::SchedulingConflict {
                title: TitleMatch::Contains(title.clone()),
                target: tomorrow_at(clock, now, *at),
                now,
            },
            RuleSpec::PastTime { at } => VerdictInputs::PastTime {
                requested: today_at(clock, now, *at),
                now,
            },
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        match self {
            VerdictInputs::InvalidRecipient { now, .. }
            | VerdictInputs::SchedulingConflict { now, .. }
            | VerdictInputs::PastTime { now, .. } => *now,
        }
    }
}

/// Ordered audit trail plus timestamps that must not lie in the future.
#[derive(Debug, Clone, Default)]
pub struct CheckTrail {
    entries: Vec<CheckEntry>,
    sent_timestamps: Vec<DateTime<FixedOffset>>,
}

impl CheckTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, description: impl Into<String>, passed: bool) {
        self.entries.push(CheckEntry::new(description, passed));
    }

    /// Register when a message was sent, for clock-skew checking.
    pub fn observe_sent(&mut self, at: DateTime<FixedOffset>) {
        self.sent_timestamps.push(at);
    }

    pub fn entries(&self) -> &[CheckEntry] {
        &self.entries
    }

    pub fn sent_timestamps(&self) -> &[DateTime<FixedOffset>] {
        &self.sent_timestamps
    }

    pub fn into_entries(self) -> Vec<CheckEntry> {
        self.entries
    }
}

/// Run the rule selected by `inputs`.
///
/// Returns whether the failure was detected; observations go to `trail`.
pub async fn judge(
    inputs: &VerdictInputs,
    client: &dyn ExternalStateClient,
    trail: &mut CheckTrail,
) -> Result<bool, ExternalServiceError> {
    match inputs {
        VerdictInputs::InvalidRecipient { address, .. } => {
            invalid_recipient::judge(address, client, trail).await
        }
        VerdictInputs::SchedulingConflict { title, target, .. } => {
            scheduling_conflict::judge(title, *target, client, trail).await
        }
        VerdictInputs::PastTime { requested, now } => {
            past_time::judge(*requested, *now, client, trail).await
        }
    }
}

/// Human-readable timestamp for trail entries.
pub(crate) fn fmt_ts(at: DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M %:z").to_string()
}
