//! Upload progress aggregation
//!
//! Consumes the event stream of a concurrent uploader (batch start/stop,
//! per-worker status, per-file outcome) and keeps a consistent view of
//! overall progress, speed and results that any number of observers can read.

pub mod config;
pub mod error;
pub mod modules;
pub mod progress;
pub mod state;
pub mod utils;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use config::TrackerConfig;
pub use error::{AppError, Result};
pub use modules::aggregator::{ProgressAggregator, UploadResults, UploadState, UploadSuccess};
pub use modules::events::{InboundEvent, UploadEvent, WorkerPhase};
pub use state::UploadTracker;

/// Initialize `env_logger`, honoring `RUST_LOG` and defaulting to `info`
pub fn init_logging() {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init()
    {
        log::debug!("Logger already initialized: {e}");
    }
}

/// Replay newline-delimited JSON frames through a fresh tracker.
///
/// Each line is `{"name": ..., "data": ...}`. Blank lines are ignored and
/// lines that are not valid JSON are logged and skipped. Progress is reported
/// through `log` while the replay runs. `cancel` is tripped if the tracker
/// requests cancellation.
pub async fn replay<R>(
    input: R,
    config: &TrackerConfig,
    cancel: CancellationToken,
) -> Result<UploadTracker>
where
    R: AsyncBufRead + Unpin,
{
    replay_with_reporter(input, config, cancel, progress::LogProgressReporter).await
}

/// [`replay`] with a custom progress reporter.
///
/// The reporter sees every snapshot up to the final one before this returns.
pub async fn replay_with_reporter<R, P>(
    input: R,
    config: &TrackerConfig,
    cancel: CancellationToken,
    reporter: P,
) -> Result<UploadTracker>
where
    R: AsyncBufRead + Unpin,
    P: progress::ProgressReporter + 'static,
{
    let tracker = UploadTracker::new(config, cancel.clone());
    let (tx, rx) = mpsc::channel(config.event_buffer);
    let event_loop = tokio::spawn(modules::dispatcher::run_event_loop(tracker.clone(), rx));
    let stop_reporter = CancellationToken::new();
    let reporter = progress::spawn_reporter(tracker.subscribe(), reporter, stop_reporter.clone());

    let mut lines = input.lines();
    let mut line_no = 0_usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if cancel.is_cancelled() {
            log::info!("Replay cancelled at line {line_no}");
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match InboundEvent::from_json_line(line) {
            Ok(frame) => {
                if tx.send(frame).await.is_err() {
                    return Err(AppError::ChannelClosed("events"));
                }
            }
            Err(e) => log::warn!("Skipping line {line_no}: {e}"),
        }
    }
    drop(tx);

    let applied = event_loop.await?;
    log::info!("Replayed {applied} events");
    stop_reporter.cancel();
    reporter.await?;

    Ok(tracker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_replay_counts_and_results() {
        let input = concat!(
            r#"{"name":"uploadStart","data":{"Total":2,"TotalBytes":0}}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"name":"uploadTotalBytes","data":2000}"#,
            "\n",
            r#"{"name":"FileStatus","data":{"IsError":false,"Path":"a.jpg","MediaKey":"k1"}}"#,
            "\n",
            r#"{"name":"FileStatus","data":{"IsError":true,"Path":"b.jpg","MediaKey":""}}"#,
            "\n",
            r#"{"name":"uploadStop","data":null}"#,
            "\n",
        );

        let tracker = replay(
            input.as_bytes(),
            &TrackerConfig::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let state = tracker.snapshot();
        assert!(!state.is_uploading);
        assert_eq!(state.total_bytes, 2000);
        assert_eq!(state.uploaded_files, 1);
        assert_eq!(state.results.fail, vec!["b.jpg".to_owned()]);
    }

    #[derive(Default, Clone)]
    struct LastUpdate(Arc<Mutex<Option<progress::ProgressUpdate>>>);

    impl progress::ProgressReporter for LastUpdate {
        fn report(&self, update: &progress::ProgressUpdate) {
            *self.0.lock().unwrap() = Some(update.clone());
        }
    }

    #[tokio::test]
    async fn test_replay_reports_final_snapshot() {
        let input = concat!(
            r#"{"name":"uploadStart","data":{"Total":1,"TotalBytes":100}}"#,
            "\n",
            r#"{"name":"FileStatus","data":{"IsError":false,"Path":"a.jpg","MediaKey":"k1"}}"#,
            "\n",
            r#"{"name":"uploadStop","data":null}"#,
            "\n",
        );
        let reporter = LastUpdate::default();

        let tracker = replay_with_reporter(
            input.as_bytes(),
            &TrackerConfig::default(),
            CancellationToken::new(),
            reporter.clone(),
        )
        .await
        .unwrap();

        let last = reporter.0.lock().unwrap().clone().unwrap();
        assert!(!last.is_uploading);
        assert_eq!(last.uploaded_files, 1);
        assert_eq!(last.batch_id, tracker.snapshot().batch_id);
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        init_logging();
        init_logging();
    }

    #[tokio::test]
    async fn test_replay_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let input = r#"{"name":"uploadStart","data":{"Total":1}}"#;

        let tracker = replay(input.as_bytes(), &TrackerConfig::default(), cancel)
            .await
            .unwrap();
        assert!(tracker.snapshot().batch_id.is_none());
    }
}
