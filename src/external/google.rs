//! Gmail v1 and Calendar v3 REST adapter with retry for transient errors.
//!
//! The adapter receives an already-issued OAuth bearer token; acquiring and
//! refreshing it is the job of the authorization helper.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{ExternalServiceError, RetryConfig};
use super::{CalendarEventRecord, ExternalStateClient, MessageFilter, MessageRecord};
use crate::clock::{self, Clock};

pub const DEFAULT_GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Endpoint, paging and timeout settings for the Google adapter.
#[derive(Debug, Clone)]
pub struct GoogleWorkspaceSettings {
    pub gmail_api_url: String,
    pub calendar_api_url: String,
    pub calendar_id: String,
    /// Page size cap for message searches
    pub max_messages: usize,
    /// Page size cap for calendar listings
    pub max_events: usize,
    /// How far past "now" calendar listings reach
    pub lookahead_days: u32,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for GoogleWorkspaceSettings {
    fn default() -> Self {
        Self {
            gmail_api_url: DEFAULT_GMAIL_API_URL.to_string(),
            calendar_api_url: DEFAULT_CALENDAR_API_URL.to_string(),
            calendar_id: "primary".to_string(),
            max_messages: 10,
            max_events: 50,
            lookahead_days: 7,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// Authenticated Gmail + Calendar client.
pub struct GoogleWorkspaceClient {
    client: Client,
    access_token: String,
    settings: GoogleWorkspaceSettings,
    clock: Arc<dyn Clock>,
}

impl GoogleWorkspaceClient {
    /// Create a client around an OAuth access token.
    pub fn new(
        access_token: String,
        settings: GoogleWorkspaceSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ExternalServiceError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ExternalServiceError::network_error(format!("Client setup failed: {}", e)))?;

        Ok(Self {
            client,
            access_token,
            settings: GoogleWorkspaceSettings {
                gmail_api_url: settings.gmail_api_url.trim_end_matches('/').to_string(),
                calendar_api_url: settings.calendar_api_url.trim_end_matches('/').to_string(),
                ..settings
            },
            clock,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/users/me/messages", self.settings.gmail_api_url)
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.settings.calendar_api_url,
            urlencoding::encode(&self.settings.calendar_id)
        )
    }

    /// Parse Retry-After header if present (seconds form only).
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Execute a single GET without retry.
    async fn execute_get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExternalServiceError> {
        if self.access_token.trim().is_empty() {
            return Err(ExternalServiceError::unavailable(
                "No Google access token configured".to_string(),
            ));
        }

        let response = match self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(ExternalServiceError::network_error(format!("Request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(ExternalServiceError::network_error(format!("Connection failed: {}", e)));
                } else {
                    return Err(ExternalServiceError::network_error(format!("Request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ExternalServiceError::network_error(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(ExternalServiceError::from_status(status.as_u16(), &body, retry_after));
        }

        serde_json::from_str(&body).map_err(|e| {
            ExternalServiceError::parse_error(format!(
                "Failed to parse response from {}: {}, body: {}",
                url,
                e,
                &body[..crate::util::safe_truncate_index(&body, 500)]
            ))
        })
    }

    /// Execute a GET with automatic retry for transient errors.
    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExternalServiceError> {
        let retry = &self.settings.retry;
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match self.execute_get(url, query).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Request to {} succeeded after {} retries ({:?})",
                            url,
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !retry.should_retry(&error, attempt) {
                        tracing::error!("Request to {} failed: {}", url, error);
                        return Err(error);
                    }

                    let remaining = retry.max_retry_duration.saturating_sub(start.elapsed());
                    let delay = error.suggested_delay(attempt).min(remaining);
                    if delay.is_zero() {
                        tracing::warn!("No retry time left for {}: {}", url, error);
                        return Err(error);
                    }

                    tracing::warn!(
                        "Retry attempt {} for {} failed with {}, retrying in {:?}",
                        attempt + 1,
                        url,
                        error.kind,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl ExternalStateClient for GoogleWorkspaceClient {
    async fn search_messages(
        &self,
        filter: &MessageFilter,
    ) -> Result<Vec<MessageRecord>, ExternalServiceError> {
        let query = filter.to_query();
        tracing::debug!("Searching Gmail with q={}", query);

        let url = self.messages_url();
        let list: GmailMessageList = self
            .get_with_retry(
                &url,
                &[
                    ("q", query),
                    ("maxResults", self.settings.max_messages.to_string()),
                ],
            )
            .await?;

        let mut records = Vec::new();
        for stub in list.messages.into_iter().take(self.settings.max_messages) {
            let detail: GmailMessage = self
                .get_with_retry(
                    &format!("{}/{}", url, urlencoding::encode(&stub.id)),
                    &[("format", "full".to_string())],
                )
                .await?;
            records.push(detail.into_record()?);
        }

        tracing::debug!("Gmail returned {} message(s)", records.len());
        Ok(records)
    }

    async fn list_calendar_events(&self) -> Result<Vec<CalendarEventRecord>, ExternalServiceError> {
        let now = self.clock.now();
        let time_min = clock::start_of_day(self.clock.as_ref(), now)
            .checked_sub_signed(ChronoDuration::days(1))
            .ok_or_else(|| {
                ExternalServiceError::invalid_query("Calendar window start out of range".to_string())
            })?;
        let time_max = ChronoDuration::try_days(i64::from(self.settings.lookahead_days))
            .and_then(|lookahead| now.checked_add_signed(lookahead))
            .ok_or_else(|| {
                ExternalServiceError::invalid_query(format!(
                    "Calendar lookahead of {} days is out of range",
                    self.settings.lookahead_days
                ))
            })?;

        let list: CalendarEventList = self
            .get_with_retry(
                &self.events_url(),
                &[
                    ("timeMin", time_min.to_rfc3339()),
                    ("timeMax", time_max.to_rfc3339()),
                    ("maxResults", self.settings.max_events.to_string()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ],
            )
            .await?;

        let mut records = Vec::new();
        for item in list.items.into_iter().take(self.settings.max_events) {
            match item.into_record() {
                Some(record) => records.push(record),
                None => tracing::warn!("Skipping calendar item without usable start/end"),
            }
        }

        tracing::debug!("Calendar returned {} event(s)", records.len());
        Ok(records)
    }
}

// ==================== Wire types ====================

#[derive(Debug, Deserialize)]
struct GmailMessageList {
    #[serde(default)]
    messages: Vec<GmailMessageStub>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    #[serde(default)]
    snippet: String,
    /// Epoch milliseconds, sent as a string
    #[serde(default)]
    internal_date: Option<String>,
    #[serde(default)]
    payload: Option<GmailPayload>,
}

#[derive(Debug, Deserialize)]
struct GmailPayload {
    #[serde(default)]
    headers: Vec<GmailHeader>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

impl GmailMessage {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref().and_then(|p| {
            p.headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.as_str())
        })
    }

    fn sent_at(&self) -> Option<DateTime<FixedOffset>> {
        let from_internal = self
            .internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.fixed_offset());

        from_internal.or_else(|| {
            self.header("Date")
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
        })
    }

    fn into_record(self) -> Result<MessageRecord, ExternalServiceError> {
        let sent_at = self.sent_at().ok_or_else(|| {
            ExternalServiceError::parse_error(format!("Message {} has no usable timestamp", self.id))
        })?;

        Ok(MessageRecord {
            recipient: self.header("To").unwrap_or_default().to_string(),
            subject: self.header("Subject").unwrap_or_default().to_string(),
            body: self.snippet,
            sent_at,
            id: self.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CalendarEventList {
    #[serde(default)]
    items: Vec<CalendarItem>,
}

#[derive(Debug, Deserialize)]
struct CalendarItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<CalendarTime>,
    end: Option<CalendarTime>,
    #[serde(default)]
    organizer: Option<CalendarOrganizer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarOrganizer {
    email: Option<String>,
}

impl CalendarTime {
    /// Timed events parse as-is; all-day dates become midnight UTC.
    fn resolve(&self) -> Option<(DateTime<FixedOffset>, bool)> {
        if let Some(dt) = &self.date_time {
            return DateTime::parse_from_rfc3339(dt).ok().map(|t| (t, false));
        }
        let date = NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d").ok()?;
        Some((clock::at_local(date, NaiveTime::default(), Utc.fix()), true))
    }
}

impl CalendarItem {
    fn into_record(self) -> Option<CalendarEventRecord> {
        let (start, all_day) = self.start.as_ref()?.resolve()?;
        let (end, _) = self.end.as_ref()?.resolve()?;
        Some(CalendarEventRecord {
            id: self.id,
            title: self.summary.unwrap_or_default(),
            start,
            end,
            all_day,
            organizer: self.organizer.and_then(|o| o.email),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::external::ExternalErrorKind;
    use mockito::Matcher;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::parse("2026-10-19T13:40:00+02:00").unwrap())
    }

    fn settings_for(url: &str) -> GoogleWorkspaceSettings {
        GoogleWorkspaceSettings {
            gmail_api_url: url.to_string(),
            calendar_api_url: url.to_string(),
            retry: RetryConfig::disabled(),
            request_timeout: Duration::from_secs(5),
            ..GoogleWorkspaceSettings::default()
        }
    }

    fn client_for(url: &str, token: &str) -> GoogleWorkspaceClient {
        GoogleWorkspaceClient::new(token.to_string(), settings_for(url), clock()).unwrap()
    }

    fn timed_event(id: &str) -> String {
        format!(
            r#"{{"id": "{}", "summary": "update meeting",
                "start": {{"dateTime": "2026-10-20T10:00:00+02:00"}},
                "end": {{"dateTime": "2026-10-20T11:00:00+02:00"}}}}"#,
            id
        )
    }

    #[tokio::test]
    async fn search_messages_fetches_details_per_id() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages(\?.*)?$".to_string()))
            .match_query(Matcher::UrlEncoded(
                "q".to_string(),
                "to:sanat@example.com".to_string(),
            ))
            .match_header("authorization", "Bearer token-123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"messages":[{"id":"m1","threadId":"t1"}],"resultSizeEstimate":1}"#)
            .create_async()
            .await;
        let _detail = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages/m1".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "m1",
                    "snippet": "Please review urgently",
                    "internalDate": "1792400000000",
                    "payload": {"headers": [
                        {"name": "To", "value": "sanat@example.com"},
                        {"name": "Subject", "value": "Important"}
                    ]}
                }"#,
            )
            .create_async()
            .await;

        let client = client_for(&server.url(), "token-123");
        let messages = client
            .search_messages(&MessageFilter::sent_to("sanat@example.com"))
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].recipient, "sanat@example.com");
        assert_eq!(messages[0].subject, "Important");
        assert_eq!(messages[0].body, "Please review urgently");
        assert_eq!(messages[0].sent_at.timestamp_millis(), 1_792_400_000_000);
    }

    #[tokio::test]
    async fn empty_mailbox_is_ok_and_empty() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages(\?.*)?$".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resultSizeEstimate":0}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), "token");
        let messages = client
            .search_messages(&MessageFilter::sent_to("nobody@example.com"))
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_surfaces_as_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages(\?.*)?$".to_string()))
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), "stale");
        let err = client
            .search_messages(&MessageFilter::sent_to("sanat@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::AuthError);
        assert_eq!(err.status_code, Some(401));
    }

    #[tokio::test]
    async fn list_calendar_events_parses_timed_and_all_day() {
        let mut server = mockito::Server::new_async().await;
        let _events = server
            .mock("GET", Matcher::Regex(r"^/calendars/primary/events".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("singleEvents".to_string(), "true".to_string()),
                Matcher::UrlEncoded("maxResults".to_string(), "50".to_string()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"items": [
                    {"id": "e1", "summary": "update meeting",
                     "start": {"dateTime": "2026-10-20T10:00:00+02:00"},
                     "end": {"dateTime": "2026-10-20T11:00:00+02:00"},
                     "organizer": {"email": "me@example.com"}},
                    {"id": "e2", "summary": "Holiday",
                     "start": {"date": "2026-10-21"}, "end": {"date": "2026-10-22"}},
                    {"id": "e3", "status": "cancelled"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server.url(), "token");
        let events = client.list_calendar_events().await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "update meeting");
        assert!(!events[0].all_day);
        assert_eq!(events[0].organizer.as_deref(), Some("me@example.com"));
        assert!(events[1].all_day);
        assert_eq!(events[1].start.to_rfc3339(), "2026-10-21T00:00:00+00:00");
    }

    #[tokio::test]
    async fn message_search_is_capped_at_max_messages() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages(\?.*)?$".to_string()))
            .match_query(Matcher::UrlEncoded("maxResults".to_string(), "2".to_string()))
            .with_status(200)
            .with_body(r#"{"messages":[{"id":"m1"},{"id":"m2"},{"id":"m3"}]}"#)
            .create_async()
            .await;
        let details = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages/m[12]".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"id": "m", "internalDate": "1792400000000",
                    "payload": {"headers": [{"name": "To", "value": "sanat@example.com"}]}}"#,
            )
            .expect(2)
            .create_async()
            .await;
        let third = server
            .mock("GET", Matcher::Regex(r"^/users/me/messages/m3".to_string()))
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let settings = GoogleWorkspaceSettings {
            max_messages: 2,
            ..settings_for(&server.url())
        };
        let client = GoogleWorkspaceClient::new("token".to_string(), settings, clock()).unwrap();
        let messages = client
            .search_messages(&MessageFilter::sent_to("sanat@example.com"))
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
        details.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn calendar_query_sends_window_and_caps_page() {
        let mut server = mockito::Server::new_async().await;
        let events = server
            .mock("GET", Matcher::Regex(r"^/calendars/primary/events".to_string()))
            .match_query(Matcher::AllOf(vec![
                // Start of yesterday through now + 7 days, in the clock's offset.
                Matcher::UrlEncoded("timeMin".to_string(), "2026-10-18T00:00:00+02:00".to_string()),
                Matcher::UrlEncoded("timeMax".to_string(), "2026-10-26T13:40:00+02:00".to_string()),
                Matcher::UrlEncoded("maxResults".to_string(), "2".to_string()),
                Matcher::UrlEncoded("orderBy".to_string(), "startTime".to_string()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{"items": [{}, {}, {}]}}"#,
                timed_event("e1"),
                timed_event("e2"),
                timed_event("e3")
            ))
            .create_async()
            .await;

        let settings = GoogleWorkspaceSettings {
            max_events: 2,
            ..settings_for(&server.url())
        };
        let client = GoogleWorkspaceClient::new("token".to_string(), settings, clock()).unwrap();
        let listed = client.list_calendar_events().await.unwrap();

        events.assert_async().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "e1");
        assert_eq!(listed[1].id, "e2");
    }

    #[tokio::test]
    async fn oversized_lookahead_is_an_error_not_a_panic() {
        let settings = GoogleWorkspaceSettings {
            lookahead_days: u32::MAX,
            ..settings_for("http://127.0.0.1:9")
        };
        let client = GoogleWorkspaceClient::new("token".to_string(), settings, clock()).unwrap();
        let err = client.list_calendar_events().await.unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::ClientError);
        assert!(err.message.contains("lookahead"));
    }

    #[tokio::test]
    async fn server_error_without_retry_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _events = server
            .mock("GET", Matcher::Regex(r"^/calendars/primary/events".to_string()))
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("backend unavailable")
            .create_async()
            .await;

        let client = client_for(&server.url(), "token");
        let err = client.list_calendar_events().await.unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::ServerError);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn missing_token_is_unavailable_without_network() {
        let client = client_for("http://127.0.0.1:9", "");
        let err = client.list_calendar_events().await.unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let client = client_for("http://127.0.0.1:9", "token");
        let err = client
            .search_messages(&MessageFilter::sent_to("a@b.c"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ExternalErrorKind::NetworkError);
    }

    #[test]
    fn message_falls_back_to_date_header() {
        let message = GmailMessage {
            id: "m2".to_string(),
            snippet: String::new(),
            internal_date: None,
            payload: Some(GmailPayload {
                headers: vec![GmailHeader {
                    name: "date".to_string(),
                    value: "Mon, 19 Oct 2026 09:15:00 +0200".to_string(),
                }],
            }),
        };
        let record = message.into_record().unwrap();
        assert_eq!(record.sent_at.to_rfc3339(), "2026-10-19T09:15:00+02:00");
        assert_eq!(record.recipient, "");
    }

    #[test]
    fn message_without_timestamp_is_parse_error() {
        let message = GmailMessage {
            id: "m3".to_string(),
            snippet: String::new(),
            internal_date: Some("not-a-number".to_string()),
            payload: None,
        };
        assert_eq!(
            message.into_record().unwrap_err().kind,
            ExternalErrorKind::ParseError
        );
    }
}
