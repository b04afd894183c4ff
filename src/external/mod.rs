//! External state access for mailbox and calendar lookups.
//!
//! Verdict rules never trust what the agent says it did; they read the live
//! state of the services the agent was acting on. This module provides:
//! - `ExternalStateClient`: the read-only query contract
//! - `GoogleWorkspaceClient`: Gmail v1 + Calendar v3 REST adapter
//! - `StaticStateClient`: in-memory snapshot (tests, dry runs)
//!
//! Records are snapshots fetched per call and never cached.

mod error;
mod google;
mod memory;

pub use error::{classify_http_status, ExternalErrorKind, ExternalServiceError, RetryConfig};
pub use google::{GoogleWorkspaceClient, GoogleWorkspaceSettings};
pub use memory::StaticStateClient;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A message found in the mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    /// Raw `To` header (may hold several addresses and display names)
    pub recipient: String,
    pub subject: String,
    /// Body excerpt as returned by the service
    pub body: String,
    pub sent_at: DateTime<FixedOffset>,
}

/// An event found on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRecord {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Date-only events; `start`/`end` are midnight UTC of those dates
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

/// Address predicate for message searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "address", rename_all = "snake_case")]
pub enum MessageFilter {
    /// Messages whose recipients include this address (case-insensitive)
    SentTo(String),
}

impl MessageFilter {
    pub fn sent_to(address: impl Into<String>) -> Self {
        Self::SentTo(address.into())
    }

    /// Search expression understood by the mail service.
    pub fn to_query(&self) -> String {
        match self {
            MessageFilter::SentTo(address) => format!("to:{}", address),
        }
    }

    /// Local re-check of a record against the filter.
    pub fn matches(&self, message: &MessageRecord) -> bool {
        match self {
            MessageFilter::SentTo(address) => message
                .recipient
                .to_lowercase()
                .contains(&address.to_lowercase()),
        }
    }
}

/// Read-only access to mailbox and calendar state.
///
/// Implementations must be reentrant: the engine may run several evaluations
/// over one shared handle. Transport and auth failures are returned as
/// `ExternalServiceError`; an `Ok` empty vector always means "no records".
#[async_trait]
pub trait ExternalStateClient: Send + Sync {
    /// Search messages matching `filter`, capped at the adapter's page size.
    async fn search_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Vec<MessageRecord>, ExternalServiceError>;

    /// List calendar events within the adapter's lookahead window.
    async fn list_calendar_events(&self) -> Result<Vec<CalendarEventRecord>, ExternalServiceError>;
}
