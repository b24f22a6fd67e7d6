//! Tracker state management
//!
//! Provides the single canonical upload tracker. It is constructed once and
//! shared by cloning the handle, replacing a global mutable instance.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex};

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::modules::aggregator::{ProgressAggregator, UploadResults, UploadState};
use crate::modules::commands::{CommandEmitter, ControlChannel};
use crate::modules::events::UploadEvent;
use crate::modules::export::{export_results, serialize_results, TextSink};

/// Type alias for the shared aggregator
pub type SharedAggregator = Arc<Mutex<ProgressAggregator>>;

/// Shared handle to the aggregator, its observers and the control channel
#[derive(Clone, Debug)]
pub struct UploadTracker {
    /// Aggregator, only ever mutated through [`UploadTracker::apply`]
    aggregator: SharedAggregator,

    /// Latest published snapshot
    snapshot_tx: Arc<watch::Sender<UploadState>>,

    /// Outbound commands to the event source
    commands: CommandEmitter,
}

impl UploadTracker {
    /// Idle tracker sending outbound commands to `control`
    pub fn new(config: &TrackerConfig, control: impl ControlChannel + 'static) -> Self {
        let aggregator = ProgressAggregator::from_config(config);
        let (snapshot_tx, _) = watch::channel(aggregator.snapshot());
        Self {
            aggregator: Arc::new(Mutex::new(aggregator)),
            snapshot_tx: Arc::new(snapshot_tx),
            commands: CommandEmitter::new(control),
        }
    }

    /// Apply one event and publish the resulting snapshot
    pub async fn apply(&self, event: UploadEvent) {
        self.apply_at(event, Instant::now()).await;
    }

    /// [`UploadTracker::apply`] with an explicit speed sampling clock
    pub async fn apply_at(&self, event: UploadEvent, now: Instant) {
        let mut aggregator = self.aggregator.lock().await;
        aggregator.apply_at(event, now);
        self.snapshot_tx.send_replace(aggregator.snapshot());
    }

    /// Latest applied state
    pub fn snapshot(&self) -> UploadState {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver that is notified after every applied event
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.snapshot_tx.subscribe()
    }

    /// Completed-byte ledger of the running batch
    pub async fn completed_bytes(&self) -> u64 {
        self.aggregator.lock().await.completed_bytes()
    }

    /// Clear the success and failure lists only
    pub async fn reset_results(&self) {
        let mut aggregator = self.aggregator.lock().await;
        aggregator.reset_results();
        self.snapshot_tx.send_replace(aggregator.snapshot());
    }

    /// Ask the event source to cancel; local state is left untouched
    pub fn request_cancel(&self) -> Result<()> {
        self.commands.request_cancel()
    }

    /// Current results as pretty JSON
    pub fn results_json(&self) -> Result<String> {
        serialize_results(&self.snapshot().results)
    }

    /// Write current results to a sink, returning whether it succeeded.
    ///
    /// The results are copied out first so events keep applying while the
    /// sink write is pending.
    pub async fn copy_results(&self, sink: &dyn TextSink) -> bool {
        let results: UploadResults = self.snapshot().results;
        export_results(&results, sink).await
    }
}
