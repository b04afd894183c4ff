//! Ordered, immutable table of known tasks.

use chrono::NaiveTime;

use super::definition::{RuleSpec, TaskDefinition};

/// Errors building a registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskRegistryError {
    #[error("Duplicate task id: {0}")]
    DuplicateId(String),

    #[error("Task id cannot be empty")]
    EmptyId,
}

/// Task id → definition, iterated in insertion order.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<TaskDefinition>,
}

impl TaskRegistry {
    /// Build a registry.
    ///
    /// # Errors
    /// Returns `Err` if an id is empty or appears twice.
    pub fn new(tasks: Vec<TaskDefinition>) -> Result<Self, TaskRegistryError> {
        {
            let mut seen = std::collections::HashSet::new();
            for task in &tasks {
                if task.id().is_empty() {
                    return Err(TaskRegistryError::EmptyId);
                }
                if !seen.insert(task.id()) {
                    return Err(TaskRegistryError::DuplicateId(task.id().to_string()));
                }
            }
        }
        Ok(Self { tasks })
    }

    /// The three built-in failing tasks.
    pub fn builtin() -> Self {
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default();
        Self {
            tasks: vec![
                TaskDefinition::new(
                    "task_1",
                    "Send an email to sanat@example.com with subject 'Important' and body 'Please review urgently'.",
                    "Email address does not exist in the system. Agent will fail if it doesn't validate recipient.",
                    "Agent sends email to non-existent address without error handling",
                    RuleSpec::InvalidRecipient {
                        address: "sanat@example.com".to_string(),
                    },
                ),
                TaskDefinition::new(
                    "task_2",
                    "Schedule a calendar meeting for tomorrow at 10:00 AM with title 'update meeting' for 1 hour.",
                    "10:00 AM is already booked (existing meeting blocks this time). Agent doesn't check conflicts.",
                    "Agent attempts to book already occupied time slot",
                    RuleSpec::SchedulingConflict {
                        title: "update meeting".to_string(),
                        at: ten,
                    },
                ),
                TaskDefinition::new(
                    "task_3",
                    "Send an email to david@company.com saying 'Can we schedule a meeting for 10:00 AM today? and add it to calender '",
                    "10:00 AM today has already passed. Agent should recognize past time and fail gracefully.",
                    "Agent tries to schedule meeting in the past",
                    RuleSpec::PastTime { at: ten },
                ),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// All ids, in registry order.
    pub fn ids(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
