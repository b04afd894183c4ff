//! In-memory external state (non-networked).

use super::{
    CalendarEventRecord, ExternalServiceError, ExternalStateClient, MessageFilter, MessageRecord,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Snapshot {
    messages: Vec<MessageRecord>,
    events: Vec<CalendarEventRecord>,
    failure: Option<ExternalServiceError>,
}

/// Fixed mailbox/calendar contents served from memory.
///
/// Contents can be swapped between calls to model state changing across runs.
#[derive(Clone, Default)]
pub struct StaticStateClient {
    state: Arc<RwLock<Snapshot>>,
}

impl StaticStateClient {
    pub fn new(messages: Vec<MessageRecord>, events: Vec<CalendarEventRecord>) -> Self {
        Self {
            state: Arc::new(RwLock::new(Snapshot {
                messages,
                events,
                failure: None,
            })),
        }
    }

    /// A client whose every query fails with `error`.
    pub fn failing(error: ExternalServiceError) -> Self {
        Self {
            state: Arc::new(RwLock::new(Snapshot {
                failure: Some(error),
                ..Snapshot::default()
            })),
        }
    }

    pub async fn set_messages(&self, messages: Vec<MessageRecord>) {
        self.state.write().await.messages = messages;
    }
}

#[async_trait]
impl ExternalStateClient for StaticStateClient {
    async fn search_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Vec<MessageRecord>, ExternalServiceError> {
        let state = self.state.read().await;
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn list_calendar_events(&self) -> Result<Vec<CalendarEventRecord>, ExternalServiceError> {
        let state = self.state.read().await;
        if let Some(err) = &state.failure {
            return Err(err.clone());
        }
        Ok(state.events.clone())
    }
}
