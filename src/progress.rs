//! Progress reporting derived from tracker snapshots

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::modules::aggregator::UploadState;
use crate::utils::format::{format_bytes, format_speed};

/// Progress observer fed with every published snapshot
pub trait ProgressReporter: Send + Sync {
    /// Handle one derived update
    fn report(&self, update: &ProgressUpdate);
}

/// Display metrics derived from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Batch the update belongs to
    pub batch_id: Option<Uuid>,
    /// Batch still running
    pub is_uploading: bool,
    /// Successful files
    pub uploaded_files: usize,
    /// Failed files
    pub failed_files: usize,
    /// Files announced at batch start
    pub total_files: usize,
    /// Uploaded bytes (ledger plus live)
    pub bytes_processed: u64,
    /// Batch byte total, 0 when unknown
    pub total_bytes: u64,
    /// 0 to 100, by bytes when the total is known, by files otherwise
    pub percent: f64,
    /// Workers hashing, checking, uploading or finalizing
    pub active_workers: usize,
    /// Smoothed speed in bytes per second
    pub speed_bps: f64,
    /// Seconds left at the current speed, if it can be estimated
    pub eta_seconds: Option<u64>,
}

impl ProgressUpdate {
    /// Derive display metrics from a tracker snapshot
    pub fn from_state(state: &UploadState) -> Self {
        // Bytes when the batch size is known, file counts otherwise
        let percent = if state.total_bytes > 0 {
            state.uploaded_bytes as f64 / state.total_bytes as f64 * 100.0
        } else if state.total_files > 0 {
            state.uploaded_files as f64 / state.total_files as f64 * 100.0
        } else {
            0.0
        };

        let remaining_bytes = state.total_bytes.saturating_sub(state.uploaded_bytes);
        let eta_seconds = (state.upload_speed > 0.0 && state.total_bytes > 0)
            .then(|| (remaining_bytes as f64 / state.upload_speed).ceil() as u64);

        Self {
            batch_id: state.batch_id,
            is_uploading: state.is_uploading,
            uploaded_files: state.uploaded_files,
            failed_files: state.results.fail.len(),
            total_files: state.total_files,
            bytes_processed: state.uploaded_bytes,
            total_bytes: state.total_bytes,
            percent: percent.clamp(0.0, 100.0),
            active_workers: state
                .threads
                .values()
                .filter(|t| t.status.is_active())
                .count(),
            speed_bps: state.upload_speed,
            eta_seconds,
        }
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}/{} files, {} of {} ({:.1}%), {}, {} active",
            self.uploaded_files,
            self.total_files,
            format_bytes(self.bytes_processed),
            format_bytes(self.total_bytes),
            self.percent,
            format_speed(self.speed_bps),
            self.active_workers,
        );
        if self.failed_files > 0 {
            line.push_str(&format!(", {} failed", self.failed_files));
        }
        if let Some(eta) = self.eta_seconds {
            line.push_str(&format!(", ETA {eta}s"));
        }
        line
    }
}

/// Reporter that writes progress through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn report(&self, update: &ProgressUpdate) {
        log::info!("{}", update.summary());
    }
}

/// Forward every snapshot change to `reporter` until the tracker is dropped
/// or `stop` is cancelled.
///
/// On stop, a snapshot published but not yet reported is still forwarded
/// before the task ends.
pub fn spawn_reporter<R>(
    mut updates: watch::Receiver<UploadState>,
    reporter: R,
    stop: CancellationToken,
) -> JoinHandle<()>
where
    R: ProgressReporter + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let update = ProgressUpdate::from_state(&updates.borrow_and_update());
                    reporter.report(&update);
                }
                () = stop.cancelled() => break,
            }
        }
        log::trace!("Progress reporter stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::aggregator::UploadResults;
    use crate::modules::events::{ThreadStatus, WorkerPhase};
    use std::sync::{Arc, Mutex};

    fn worker(id: u32, phase: WorkerPhase) -> ThreadStatus {
        ThreadStatus {
            worker_id: id,
            status: phase,
            file_path: String::new(),
            file_name: String::new(),
            message: String::new(),
            bytes_uploaded: 0,
            bytes_total: 0,
            attempt: 0,
        }
    }

    #[test]
    fn test_progress_update_serialization() {
        let update = ProgressUpdate::from_state(&UploadState {
            total_files: 10,
            uploaded_files: 5,
            ..UploadState::default()
        });

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("bytesProcessed")); // Check camelCase
        assert!(json.contains("speedBps"));
        assert!(json.contains("etaSeconds"));
    }

    #[test]
    fn test_percent_prefers_bytes() {
        let update = ProgressUpdate::from_state(&UploadState {
            total_files: 4,
            uploaded_files: 1,
            total_bytes: 1000,
            uploaded_bytes: 750,
            ..UploadState::default()
        });
        assert!((update.percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_falls_back_to_files_and_clamps() {
        let update = ProgressUpdate::from_state(&UploadState {
            total_files: 4,
            uploaded_files: 1,
            ..UploadState::default()
        });
        assert!((update.percent - 25.0).abs() < 1e-9);

        let over = ProgressUpdate::from_state(&UploadState {
            total_bytes: 100,
            uploaded_bytes: 150,
            ..UploadState::default()
        });
        assert!((over.percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_eta_and_active_workers() {
        let mut state = UploadState {
            total_bytes: 10_000,
            uploaded_bytes: 4_000,
            upload_speed: 1_000.0,
            results: UploadResults {
                success: Vec::new(),
                fail: vec!["x.jpg".to_owned()],
            },
            ..UploadState::default()
        };
        state.threads.insert(0, worker(0, WorkerPhase::Uploading));
        state.threads.insert(1, worker(1, WorkerPhase::Hashing));
        state.threads.insert(2, worker(2, WorkerPhase::Idle));
        state.threads.insert(3, worker(3, WorkerPhase::Error));

        let update = ProgressUpdate::from_state(&state);
        assert_eq!(update.eta_seconds, Some(6));
        assert_eq!(update.active_workers, 2);
        assert_eq!(update.failed_files, 1);
        assert!(update.summary().contains("1 failed"));
        assert!(update.summary().contains("ETA 6s"));
    }

    #[test]
    fn test_no_eta_without_speed() {
        let update = ProgressUpdate::from_state(&UploadState {
            total_bytes: 10_000,
            ..UploadState::default()
        });
        assert_eq!(update.eta_seconds, None);
    }

    #[derive(Default, Clone)]
    struct CollectingReporter(Arc<Mutex<Vec<ProgressUpdate>>>);

    impl ProgressReporter for CollectingReporter {
        fn report(&self, update: &ProgressUpdate) {
            self.0.lock().unwrap().push(update.clone());
        }
    }

    #[tokio::test]
    async fn test_spawn_reporter_forwards_changes() {
        let (tx, rx) = watch::channel(UploadState::default());
        let reporter = CollectingReporter::default();
        let handle = spawn_reporter(rx, reporter.clone(), CancellationToken::new());

        tx.send_replace(UploadState {
            is_uploading: true,
            total_files: 2,
            ..UploadState::default()
        });
        drop(tx);
        handle.await.unwrap();

        let seen = reporter.0.lock().unwrap();
        assert!(!seen.is_empty());
        let last = seen.last().unwrap();
        assert!(last.is_uploading);
        assert_eq!(last.total_files, 2);
    }

    #[tokio::test]
    async fn test_spawn_reporter_drains_pending_change_on_stop() {
        let (tx, rx) = watch::channel(UploadState::default());
        let reporter = CollectingReporter::default();
        let stop = CancellationToken::new();
        let handle = spawn_reporter(rx, reporter.clone(), stop.clone());

        tx.send_replace(UploadState {
            total_files: 3,
            uploaded_files: 3,
            ..UploadState::default()
        });
        stop.cancel();
        handle.await.unwrap();

        let seen = reporter.0.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!(last.uploaded_files, 3);
        assert!(!last.is_uploading);
        // Sender is still alive; the task ended on the stop token
        drop(tx);
    }
}
