//! Schema version detection for data files of any size.
//!
//! Two scans race under one deadline:
//!
//! - forward: stream-parse from the start, stop at the top-level `version`
//! - backward: regex over the last [`VersionDetector::window`] bytes
//!
//! The first scan to produce a value wins and the other is abandoned. Nothing
//! started by [`VersionDetector::detect`] outlives the call.

mod backward;
mod forward;

pub use backward::scan_backward;
pub use forward::{CancelFlag, scan_forward};

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

pub const DEFAULT_WINDOW: u64 = 1024;
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("no top-level version field found reading forward")]
    NoVersionForward,

    #[error("no version field found in the trailing bytes")]
    NoVersionBackward,

    #[error("could not find a version field in the file")]
    NoVersionFound,

    #[error("version detection timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error during version detection: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct VersionDetector {
    /// Bytes read from the end of the file by the backward scan.
    pub window: u64,
    /// Upper bound on the whole detection.
    pub deadline: Duration,
}

impl Default for VersionDetector {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl VersionDetector {
    pub fn new(window: u64, deadline: Duration) -> Self {
        Self { window, deadline }
    }

    /// Version the file at `path` claims to target.
    pub async fn detect(&self, path: &Path) -> Result<String, DetectionError> {
        let cancel = CancelFlag::new();
        let forward_path = path.to_path_buf();
        let forward_cancel = cancel.clone();
        let mut forward_task =
            tokio::task::spawn_blocking(move || scan_forward(&forward_path, &forward_cancel));

        let result = race(
            async {
                match (&mut forward_task).await {
                    Ok(result) => result,
                    Err(join_error) => Err(DetectionError::Io(std::io::Error::other(join_error))),
                }
            },
            scan_backward(path, self.window),
            self.deadline,
        )
        .await;

        // The backward scan was dropped inside `race`; the forward scan runs
        // on a blocking thread and has to be told to stop, then joined so its
        // file handle is closed before we return.
        cancel.cancel();
        if !forward_task.is_finished() {
            let _ = forward_task.await;
        }

        match &result {
            Ok(version) => debug!("Detected version {version} for {}", path.display()),
            Err(e) => debug!("Version detection failed for {}: {e}", path.display()),
        }
        result
    }
}

/// Run both scans until one succeeds, both fail, or the deadline passes.
///
/// Whichever future has not finished when this returns is dropped.
pub(crate) async fn race<F, B>(
    forward: F,
    backward: B,
    deadline: Duration,
) -> Result<String, DetectionError>
where
    F: Future<Output = Result<String, DetectionError>>,
    B: Future<Output = Result<String, DetectionError>>,
{
    tokio::pin!(forward);
    tokio::pin!(backward);
    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    let mut forward_done = false;
    let mut backward_done = false;

    loop {
        tokio::select! {
            result = &mut forward, if !forward_done => {
                match result {
                    Ok(version) => return Ok(version),
                    Err(e) => {
                        debug!("Forward scan failed: {e}");
                        forward_done = true;
                    }
                }
            }
            result = &mut backward, if !backward_done => {
                match result {
                    Ok(version) => return Ok(version),
                    Err(e) => {
                        debug!("Backward scan failed: {e}");
                        backward_done = true;
                    }
                }
            }
            _ = &mut timer => return Err(DetectionError::Timeout(deadline)),
        }

        if forward_done && backward_done {
            return Err(DetectionError::NoVersionFound);
        }
    }
}

#[cfg(test)]
mod tests;
