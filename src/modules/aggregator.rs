//! Upload progress aggregation
//!
//! Folds the inbound event stream into a single [`UploadState`]. Bytes are
//! accounted only through worker status transitions: while a worker is
//! uploading its live `BytesUploaded` counts, and once it leaves the
//! uploading phase its `BytesTotal` is settled into a completed-byte ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::TrackerConfig;
use crate::modules::events::{
    FileUploadResult, ThreadStatus, UploadBatchStart, UploadEvent, WorkerPhase,
};
use crate::modules::speed::SpeedEstimator;

/// Successfully uploaded file and the content key the backend assigned to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSuccess {
    /// Local path of the uploaded file
    pub path: String,
    /// Backend key of the created media item
    pub media_key: String,
}

/// Per-batch outcome lists
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResults {
    /// Files uploaded successfully, in report order
    pub success: Vec<UploadSuccess>,
    /// Paths of files that failed
    pub fail: Vec<String>,
}

impl UploadResults {
    /// Empty both lists
    pub fn clear(&mut self) {
        self.success.clear();
        self.fail.clear();
    }

    /// True when neither list has entries
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.fail.is_empty()
    }
}

/// Canonical batch state, also the snapshot handed to observers
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    /// Id of the current batch, `None` before the first batch starts
    pub batch_id: Option<Uuid>,
    /// Between batch start and batch stop
    pub is_uploading: bool,
    /// File count announced at batch start
    pub total_files: usize,
    /// Successful file outcomes so far
    pub uploaded_files: usize,
    /// Byte total for the batch, 0 when unknown
    pub total_bytes: u64,
    /// Completed-byte ledger plus live bytes of uploading workers
    pub uploaded_bytes: u64,
    /// Wall-clock time of the batch start
    pub started_at: Option<DateTime<Utc>>,
    /// Smoothed speed in bytes per second
    pub upload_speed: f64,
    /// Latest status per worker id
    pub threads: BTreeMap<u32, ThreadStatus>,
    /// Outcome lists for export
    pub results: UploadResults,
}

/// Applies upload events to the batch state
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    state: UploadState,
    completed_bytes: u64,
    speed: SpeedEstimator,
}

impl ProgressAggregator {
    /// Idle aggregator sampling speed every `sample_interval` over `sample_window` samples
    pub fn new(sample_interval: Duration, sample_window: usize) -> Self {
        Self {
            state: UploadState::default(),
            completed_bytes: 0,
            speed: SpeedEstimator::new(sample_interval, sample_window, Instant::now()),
        }
    }

    /// Aggregator using the configured sampling parameters
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.sample_interval, config.sample_window)
    }

    /// Apply an event using the current time for speed sampling
    pub fn apply(&mut self, event: UploadEvent) {
        self.apply_at(event, Instant::now());
    }

    /// Apply an event with `now` as the speed sampling clock
    pub fn apply_at(&mut self, event: UploadEvent, now: Instant) {
        match event {
            UploadEvent::BatchStart(start) => self.start_batch(start, now),
            UploadEvent::WorkerStatus(status) => self.update_worker(status, now),
            UploadEvent::FileStatus(result) => self.record_file(result),
            UploadEvent::TotalBytes(total_bytes) => self.set_total_bytes(total_bytes),
            UploadEvent::BatchStop => self.stop_batch(),
        }
    }

    /// Reset everything for a new batch
    pub fn start_batch(&mut self, start: UploadBatchStart, now: Instant) {
        let batch_id = Uuid::new_v4();
        log::info!(
            "Upload batch {batch_id} started: {} files, {} bytes",
            start.total,
            start.total_bytes
        );

        self.state = UploadState {
            batch_id: Some(batch_id),
            is_uploading: true,
            total_files: start.total,
            total_bytes: start.total_bytes,
            started_at: Some(Utc::now()),
            ..UploadState::default()
        };
        self.completed_bytes = 0;
        self.speed.reset(now);
        self.reset_results();
    }

    /// Replace a worker's record and refresh byte totals and speed
    pub fn update_worker(&mut self, status: ThreadStatus, now: Instant) {
        if let Some(prev) = self.state.threads.get(&status.worker_id) {
            let finished_upload = prev.status == WorkerPhase::Uploading
                && status.status != WorkerPhase::Uploading;
            if finished_upload && prev.bytes_total > 0 {
                self.completed_bytes = self.completed_bytes.saturating_add(prev.bytes_total);
                log::debug!(
                    "Worker {} left upload of '{}', settled {} bytes",
                    status.worker_id,
                    prev.file_name,
                    prev.bytes_total
                );
            }
        }

        if status.status == WorkerPhase::Error {
            log::warn!(
                "Worker {} error on '{}': {}",
                status.worker_id,
                status.file_path,
                status.message
            );
        }

        self.state.threads.insert(status.worker_id, status);
        self.refresh_bytes_and_speed(now);
    }

    /// Record a per-file outcome; bytes are not touched here
    pub fn record_file(&mut self, result: FileUploadResult) {
        if result.is_error {
            log::warn!("Upload failed: {}", result.path);
            self.state.results.fail.push(result.path);
            return;
        }

        self.state.uploaded_files += 1;
        if self.state.total_files > 0 && self.state.uploaded_files > self.state.total_files {
            log::warn!(
                "Uploaded file count {} exceeds batch total {}",
                self.state.uploaded_files,
                self.state.total_files
            );
        }
        log::info!("Upload success: {}", result.path);
        self.state.results.success.push(UploadSuccess {
            path: result.path,
            media_key: result.media_key,
        });
    }

    /// Late byte total for the running batch
    pub fn set_total_bytes(&mut self, total_bytes: u64) {
        log::debug!("Batch total bytes updated to {total_bytes}");
        self.state.total_bytes = total_bytes;
    }

    /// Mark the batch as no longer uploading; counters and results stay
    pub fn stop_batch(&mut self) {
        log::info!(
            "Upload batch stopped: {}/{} files, {} failed",
            self.state.uploaded_files,
            self.state.total_files,
            self.state.results.fail.len()
        );
        self.state.is_uploading = false;
    }

    /// Clear the result lists without touching counters
    pub fn reset_results(&mut self) {
        self.state.results.clear();
    }

    /// Borrow the current state
    pub const fn state(&self) -> &UploadState {
        &self.state
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> UploadState {
        self.state.clone()
    }

    /// Bytes settled from workers that have left the uploading phase
    pub const fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    fn refresh_bytes_and_speed(&mut self, now: Instant) {
        let active: u64 = self
            .state
            .threads
            .values()
            .filter(|t| t.status == WorkerPhase::Uploading && t.bytes_total > 0)
            .map(|t| t.bytes_uploaded)
            .fold(0, u64::saturating_add);

        // Wire byte counts are unbounded; saturate rather than wrap
        self.state.uploaded_bytes = self.completed_bytes.saturating_add(active);
        if let Some(speed) = self.speed.record(self.state.uploaded_bytes, now) {
            self.state.upload_speed = speed;
        }
    }
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}
