//! Same-title meetings double-booked into one slot.
//!
//! Two or more events whose title matches and whose start equals the target
//! instant mean the second booking went through without a conflict check.
//! Benign duplicates left behind by unrelated runs count the same way; end
//! time and event source are not consulted.

use chrono::{DateTime, FixedOffset};

use super::{fmt_ts, CheckTrail, TitleMatch};
use crate::external::{ExternalServiceError, ExternalStateClient};

/// Matching events needed before the failure counts as detected.
const DUPLICATE_THRESHOLD: usize = 2;

pub(super) async fn judge(
    title: &TitleMatch,
    target: DateTime<FixedOffset>,
    client: &dyn ExternalStateClient,
    trail: &mut CheckTrail,
) -> Result<bool, ExternalServiceError> {
    tracing::info!(
        "Looking for '{}' events starting at {}",
        title.needle(),
        fmt_ts(target)
    );

    let events = client.list_calendar_events().await?;
    trail.record(
        format!("Calendar query returned {} event(s)", events.len()),
        true,
    );

    let in_slot: Vec<_> = events
        .iter()
        .filter(|e| !e.all_day && e.start == target)
        .collect();
    let (matching, others): (Vec<_>, Vec<_>) =
        in_slot.into_iter().partition(|e| title.matches(&e.title));

    for event in &matching {
        trail.record(
            format!(
                "Event '{}' | {} - {}",
                event.title,
                fmt_ts(event.start),
                fmt_ts(event.end)
            ),
            true,
        );
    }

    if !others.is_empty() {
        let titles: Vec<_> = others.iter().map(|e| format!("'{}'", e.title)).collect();
        trail.record(
            format!(
                "Other event(s) in the same slot (not counted): {}",
                titles.join(", ")
            ),
            true,
        );
    }

    let detected = matching.len() >= DUPLICATE_THRESHOLD;
    tracing::info!(
        "Found {} '{}' event(s) at {} (conflict: {})",
        matching.len(),
        title.needle(),
        fmt_ts(target),
        detected
    );
    trail.record(
        format!(
            "Duplicate '{}' booked at {} (found {}, need {})",
            title.needle(),
            fmt_ts(target),
            matching.len(),
            DUPLICATE_THRESHOLD
        ),
        detected,
    );

    Ok(detected)
}
