//! Fail-open helper for side work that must never end a run
//!
//! Used for appending to the progress log file. The upload step and
//! bootstrap do not go through here: an upload error is the file's failure
//! reason, and a missing upload form at bootstrap is fatal.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Await `op`; on error log a warning tagged with `what` and yield `None`
///
/// ```no_run
/// use imgdrop_core::fail_open::fail_open;
///
/// async fn append() -> imgdrop_core::Result<()> {
///     Ok(())
/// }
///
/// async fn log_line() {
///     if fail_open("progress::log_file", append).await.is_none() {
///         // the line only reached stdout
///     }
/// }
/// ```
pub async fn fail_open<F, Fut, T>(what: &str, op: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    op().await
        .map_err(|e| warn!("{} failed, continuing: {}", what, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DropError;

    #[tokio::test]
    async fn test_value_passes_through() {
        let lines = fail_open("count_lines", || async { Ok::<_, DropError>(3usize) }).await;
        assert_eq!(lines, Some(3));
    }

    #[tokio::test]
    async fn test_io_error_is_swallowed() {
        let written = fail_open("append", || async {
            Err::<(), _>(DropError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only log file",
            )))
        })
        .await;
        assert!(written.is_none());
    }
}
