//! Result export
//!
//! Serializes the success/failure lists as pretty JSON and hands the text to a
//! [`TextSink`]. The system clipboard and plain files are supported out of the
//! box; anything else can implement the trait.

use futures::future::BoxFuture;
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::modules::aggregator::UploadResults;
use crate::utils::file_ops::{run_blocking, write_text_file};

/// Destination for exported text
pub trait TextSink: Send + Sync {
    /// Short label used in log lines
    fn name(&self) -> &str;

    /// Replace the sink's contents with `text`
    fn write_text(&self, text: String) -> BoxFuture<'_, Result<()>>;
}

/// System clipboard via arboard
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipboardSink;

impl TextSink for ClipboardSink {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn write_text(&self, text: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(run_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| AppError::Clipboard(format!("failed to access clipboard: {e}")))?;
            clipboard
                .set_text(text)
                .map_err(|e| AppError::Clipboard(format!("failed to set text: {e}")))
        }))
    }
}

/// Plain file on disk, overwritten on every export
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    label: String,
}

impl FileSink {
    /// Sink that writes to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("file {}", path.display());
        Self { path, label }
    }
}

impl TextSink for FileSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn write_text(&self, text: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(write_text_file(&self.path, text))
    }
}

/// Pretty JSON of the result lists: `{"success": [...], "fail": [...]}`
pub fn serialize_results(results: &UploadResults) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Serialize and write results to a sink; failures are logged and reported
/// as `false`
pub async fn export_results(results: &UploadResults, sink: &dyn TextSink) -> bool {
    let text = match serialize_results(results) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to serialize upload results: {e}");
            return false;
        }
    };

    match sink.write_text(text).await {
        Ok(()) => {
            log::info!("Upload results copied to {}", sink.name());
            true
        }
        Err(e) => {
            log::error!("Failed to copy results to {}: {e}", sink.name());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::aggregator::UploadSuccess;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default, Clone)]
    struct MemorySink(Arc<Mutex<Vec<String>>>);

    impl TextSink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        fn write_text(&self, text: String) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                self.0.lock().map_err(|_| AppError::LockFailed)?.push(text);
                Ok(())
            })
        }
    }

    struct BrokenSink;

    impl TextSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn write_text(&self, _text: String) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Err(AppError::Clipboard("no display".to_owned())) })
        }
    }

    fn sample_results() -> UploadResults {
        UploadResults {
            success: vec![UploadSuccess {
                path: "a.jpg".to_owned(),
                media_key: "k1".to_owned(),
            }],
            fail: vec!["b.jpg".to_owned()],
        }
    }

    #[test]
    fn test_serialize_results_shape() {
        let text = serialize_results(&sample_results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["success"][0]["path"], "a.jpg");
        assert_eq!(value["success"][0]["mediaKey"], "k1");
        assert_eq!(value["fail"][0], "b.jpg");
        // Pretty-printed for diffing
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_serialize_empty_results() {
        let text = serialize_results(&UploadResults::default()).unwrap();
        let back: UploadResults = serde_json::from_str(&text).unwrap();
        assert!(back.is_empty());
    }

    #[tokio::test]
    async fn test_export_to_memory_sink() {
        let sink = MemorySink::default();
        assert!(export_results(&sample_results(), &sink).await);

        let written = sink.0.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].contains("mediaKey"));
    }

    #[tokio::test]
    async fn test_export_reports_sink_failure() {
        assert!(!export_results(&sample_results(), &BrokenSink).await);
    }

    #[tokio::test]
    async fn test_export_to_file_sink() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        let sink = FileSink::new(&path);

        assert!(export_results(&sample_results(), &sink).await);
        let written: UploadResults =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, sample_results());
        assert!(sink.name().contains("results.json"));
    }
}
