//! Blocking helpers for sink writes
//!
//! Sink writes (file and clipboard) are synchronous calls, so they run on the
//! blocking pool and the caller simply awaits the join handle.

use std::path::Path;

use crate::error::{AppError, Result};

/// Run a synchronous, fallible job on the blocking pool
pub async fn run_blocking<F, T>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await?
}

/// Write text to a file using `spawn_blocking`, creating parent directories
pub async fn write_text_file(path: &Path, text: String) -> Result<()> {
    let path = path.to_path_buf();

    run_blocking(move || {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text).map_err(AppError::from)
    })
    .await
}
