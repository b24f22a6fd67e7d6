//! Wire events exchanged with the uploader

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Event name for batch start
pub const EVENT_UPLOAD_START: &str = "uploadStart";
/// Event name for per-worker status
pub const EVENT_THREAD_STATUS: &str = "ThreadStatus";
/// Event name for per-file outcome
pub const EVENT_FILE_STATUS: &str = "FileStatus";
/// Event name for the late batch byte total
pub const EVENT_UPLOAD_TOTAL_BYTES: &str = "uploadTotalBytes";
/// Event name for batch stop
pub const EVENT_UPLOAD_STOP: &str = "uploadStop";
/// Outbound event name for cancellation
pub const EVENT_UPLOAD_CANCEL: &str = "uploadCancel";

/// Lifecycle phase of a worker's current operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkerPhase {
    /// Waiting for the next file
    Idle,
    /// Computing the content hash
    Hashing,
    /// Asking the backend whether the file already exists
    Checking,
    /// Sending bytes; the only phase whose byte counts are live
    Uploading,
    /// Creating the media item after the bytes are sent
    Finalizing,
    /// File done
    Completed,
    /// File failed
    Error,
}

impl WorkerPhase {
    /// Whether a worker in this phase is busy with a file
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Hashing | Self::Checking | Self::Uploading | Self::Finalizing
        )
    }
}

/// Status of one upload worker, replaced wholesale on every update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ThreadStatus {
    /// Stable worker id within a batch
    #[serde(rename = "WorkerID")]
    pub worker_id: u32,
    /// Current phase
    pub status: WorkerPhase,
    /// Full path of the file being processed
    #[serde(default)]
    pub file_path: String,
    /// Display name of the file
    #[serde(default)]
    pub file_name: String,
    /// Free-form status text
    #[serde(default)]
    pub message: String,
    /// Bytes sent so far for the current file
    #[serde(default)]
    pub bytes_uploaded: u64,
    /// Size of the current file, 0 when unknown
    #[serde(default)]
    pub bytes_total: u64,
    /// Retry attempt number
    #[serde(default)]
    pub attempt: u32,
}

/// Outcome of a single file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct FileUploadResult {
    /// The file failed to upload
    pub is_error: bool,
    /// Local path of the file
    pub path: String,
    /// Backend key, empty on failure
    #[serde(default)]
    pub media_key: String,
}

/// Payload of the batch start event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UploadBatchStart {
    /// Number of files in the batch
    pub total: usize,
    /// Byte total if already known, else 0
    #[serde(default)]
    pub total_bytes: u64,
}

/// Decoded inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// `uploadStart`
    BatchStart(UploadBatchStart),
    /// `ThreadStatus`
    WorkerStatus(ThreadStatus),
    /// `FileStatus`
    FileStatus(FileUploadResult),
    /// `uploadTotalBytes`
    TotalBytes(u64),
    /// `uploadStop`
    BatchStop,
}

impl UploadEvent {
    /// Decode a named event and its JSON payload.
    ///
    /// Unknown names and payloads that do not match the schema are rejected
    /// with [`AppError::InvalidEvent`]; the caller decides whether to skip them.
    pub fn from_wire(name: &str, data: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| AppError::InvalidEvent {
            name: name.to_owned(),
            reason: e.to_string(),
        };

        match name {
            EVENT_UPLOAD_START => serde_json::from_value(data)
                .map(Self::BatchStart)
                .map_err(invalid),
            EVENT_THREAD_STATUS => serde_json::from_value(data)
                .map(Self::WorkerStatus)
                .map_err(invalid),
            EVENT_FILE_STATUS => serde_json::from_value(data)
                .map(Self::FileStatus)
                .map_err(invalid),
            EVENT_UPLOAD_TOTAL_BYTES => serde_json::from_value(data)
                .map(Self::TotalBytes)
                .map_err(invalid),
            EVENT_UPLOAD_STOP => Ok(Self::BatchStop),
            other => Err(AppError::InvalidEvent {
                name: other.to_owned(),
                reason: "unknown event name".to_owned(),
            }),
        }
    }

    /// Wire name of this event
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BatchStart(_) => EVENT_UPLOAD_START,
            Self::WorkerStatus(_) => EVENT_THREAD_STATUS,
            Self::FileStatus(_) => EVENT_FILE_STATUS,
            Self::TotalBytes(_) => EVENT_UPLOAD_TOTAL_BYTES,
            Self::BatchStop => EVENT_UPLOAD_STOP,
        }
    }
}

/// Raw frame as delivered by the event source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Event name
    pub name: String,
    /// Raw JSON payload
    #[serde(default)]
    pub data: Value,
}

impl InboundEvent {
    /// Frame with the given name and payload
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Parse one line of newline-delimited JSON
    pub fn from_json_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Decode the payload into an [`UploadEvent`]
    pub fn decode(self) -> Result<UploadEvent> {
        UploadEvent::from_wire(&self.name, self.data)
    }
}
