//! Mail sent to an address that should have been rejected.

use super::{fmt_ts, CheckTrail};
use crate::external::{ExternalServiceError, ExternalStateClient, MessageFilter};

/// Failure detected iff at least one message reached `address`.
pub(super) async fn judge(
    address: &str,
    client: &dyn ExternalStateClient,
    trail: &mut CheckTrail,
) -> Result<bool, ExternalServiceError> {
    let filter = MessageFilter::sent_to(address);
    tracing::info!("Looking for messages sent to {}", address);

    let messages = client.search_messages(&filter).await?;
    trail.record(
        format!(
            "Mailbox query '{}' returned {} message(s)",
            filter.to_query(),
            messages.len()
        ),
        true,
    );

    let mut found = 0usize;
    for message in messages.iter().filter(|m| filter.matches(m)) {
        found += 1;
        trail.observe_sent(message.sent_at);
        trail.record(
            format!(
                "Message to {} | subject '{}' | sent {}",
                message.recipient,
                message.subject,
                fmt_ts(message.sent_at)
            ),
            true,
        );
    }

    let detected = found >= 1;
    if detected {
        tracing::info!("Found {} message(s) to invalid address {}", found, address);
    } else {
        tracing::info!("No message reached {}; recipient was rejected", address);
    }
    trail.record(
        format!("Message delivered to invalid address {} (found {})", address, found),
        detected,
    );

    Ok(detected)
}
