//! Meeting booked into a slot that had already passed.

use chrono::{DateTime, FixedOffset};

use super::{fmt_ts, CheckTrail};
use crate::external::{ExternalServiceError, ExternalStateClient};

/// Failure detected iff `requested` is before `now` and an event starts there.
///
/// The calendar is only queried once the slot is in the past.
pub(super) async fn judge(
    requested: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
    client: &dyn ExternalStateClient,
    trail: &mut CheckTrail,
) -> Result<bool, ExternalServiceError> {
    let in_past = now > requested;
    trail.record(
        format!(
            "Requested slot {} is in the past (now {})",
            fmt_ts(requested),
            fmt_ts(now)
        ),
        in_past,
    );

    if !in_past {
        tracing::info!(
            "Slot {} has not passed yet at {}; nothing to check",
            fmt_ts(requested),
            fmt_ts(now)
        );
        return Ok(false);
    }

    let events = client.list_calendar_events().await?;
    trail.record(
        format!("Calendar query returned {} event(s)", events.len()),
        true,
    );

    let mut found = 0usize;
    for event in events.iter().filter(|e| !e.all_day && e.start == requested) {
        found += 1;
        trail.record(
            format!(
                "Event '{}' at past slot | {} - {}",
                event.title,
                fmt_ts(event.start),
                fmt_ts(event.end)
            ),
            true,
        );
    }

    let detected = found >= 1;
    if detected {
        tracing::info!("Event was created in past slot {}", fmt_ts(requested));
    } else {
        tracing::info!("No event at past slot {}; booking was refused", fmt_ts(requested));
    }
    trail.record(
        format!(
            "Event created at past slot {} (found {})",
            fmt_ts(requested),
            found
        ),
        detected,
    );

    Ok(detected)
}
