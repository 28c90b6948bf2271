//! Backward paging through a doorbell's event history.

use std::collections::HashSet;

use crate::retry::{self, RetryPolicy};
use crate::ring::{Device, EventId, FetchError, HistoryEvent, RingApi};

/// Largest page Ring serves in one history request.
pub const PAGE_SIZE: u32 = 100;

/// Fetch up to `limit` events for `device`, newest first, strictly older than
/// `older_than` when given.
///
/// Pages are chained on the id of the last raw entry of the previous page.
/// Paging stops on an empty or short page, at the limit, or when the cursor
/// stops moving.
pub async fn fetch_history(
    api: &dyn RingApi,
    device: &Device,
    limit: u32,
    older_than: Option<EventId>,
    policy: &RetryPolicy,
) -> Result<Vec<HistoryEvent>, FetchError> {
    let limit = limit.max(1) as usize;
    let mut events: Vec<HistoryEvent> = Vec::new();
    let mut seen: HashSet<EventId> = HashSet::new();
    let mut cursor = older_than;
    let mut page_number = 0u32;

    while events.len() < limit {
        let remaining = limit - events.len();
        // Leave room for the boundary event in case the API echoes it back
        let wanted = if cursor.is_some() { remaining + 1 } else { remaining };
        let requested = wanted.min(PAGE_SIZE as usize) as u32;
        page_number += 1;

        let what = format!("History page {} for {}", page_number, device.name);
        let page = retry::with_backoff(policy, &what, || {
            api.history_page(device, requested, cursor)
        })
        .await
        .map_err(|source| FetchError {
            device: device.name.clone(),
            source,
        })?;

        let received = page.received;
        for event in page.events {
            // older_than is exclusive; drop the boundary event if it comes back
            if Some(event.id) == cursor || !seen.insert(event.id) {
                continue;
            }
            if events.len() < limit {
                events.push(event);
            }
        }

        tracing::info!(
            "{}: page {} returned {} entries ({} events so far)",
            device.name,
            page_number,
            received,
            events.len()
        );

        if received == 0 || received < requested as usize {
            break;
        }
        match page.last_id {
            Some(last) if Some(last) != cursor => cursor = Some(last),
            _ => break,
        }
    }

    Ok(events)
}
