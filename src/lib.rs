//! # Reward Validator
//!
//! Scores agent runs on deliberately ill-posed tasks by checking what
//! actually happened in the mailbox and on the calendar, instead of trusting
//! the agent's own account.
//!
//! ## Architecture
//!
//! ```text
//!   task id ──▶ ValidationEngine ──▶ TaskRegistry
//!                      │
//!                      ├──▶ Clock (now)
//!                      │
//!                      ▼
//!                verdict::judge ──▶ ExternalStateClient
//!                      │              (Gmail + Calendar)
//!                      ▼
//!               ValidationReport ──▶ format (lines / JSON)
//! ```
//!
//! ## Modules
//! - `task`: built-in failing tasks and the registry
//! - `external`: mailbox/calendar query contract and Google adapter
//! - `clock`: time source and slot helpers
//! - `verdict`: one decision rule per task kind
//! - `engine`: evaluation, degradation and batching
//! - `report` / `format`: report model and rendering

pub mod clock;
pub mod config;
pub mod engine;
pub mod external;
pub mod format;
pub mod report;
pub mod task;
pub mod util;
pub mod verdict;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use engine::{EngineConfig, ValidationEngine, ValidationError};
pub use external::{ExternalServiceError, ExternalStateClient, GoogleWorkspaceClient};
pub use report::{CheckEntry, Outcome, ValidationReport};
pub use task::{RuleSpec, TaskDefinition, TaskRegistry};
