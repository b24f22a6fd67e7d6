//! Event loop that applies inbound frames to the tracker

use tokio::sync::mpsc;

use crate::modules::events::InboundEvent;
use crate::state::UploadTracker;

/// Apply inbound frames one at a time, in delivery order, until every sender
/// is dropped. Frames that fail to decode are logged and skipped.
///
/// Returns the number of events applied.
pub async fn run_event_loop(tracker: UploadTracker, mut rx: mpsc::Receiver<InboundEvent>) -> usize {
    let mut applied = 0;

    while let Some(frame) = rx.recv().await {
        match frame.decode() {
            Ok(event) => {
                log::trace!("Applying {}", event.name());
                tracker.apply(event).await;
                applied += 1;
            }
            Err(e) => log::warn!("Skipping event: {e}"),
        }
    }

    log::debug!("Event source closed after {applied} events");
    applied
}
