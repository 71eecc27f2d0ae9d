//! Backward scan: look for a trailing `"version": "..."` in the last bytes.

use std::io::SeekFrom;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::DetectionError;

/// Quoted value may contain escaped quotes.
static VERSION_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""version"\s*:\s*("(?:[^"\\]|\\.)*")"#).expect("version pattern is valid")
});

/// Reads at most `window` bytes from the end of the file and searches them.
///
/// Files shorter than the window are searched in full.
pub async fn scan_backward(path: &Path, window: u64) -> Result<String, DetectionError> {
    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    let start = len.saturating_sub(window);

    file.seek(SeekFrom::Start(start)).await?;
    let mut tail = Vec::with_capacity((len - start) as usize);
    file.take(window).read_to_end(&mut tail).await?;

    if tail.is_empty() {
        return Err(DetectionError::NoVersionBackward);
    }

    find_trailing_version(&String::from_utf8_lossy(&tail)).ok_or(DetectionError::NoVersionBackward)
}

/// Last `"version": "<value>"` occurrence in `text`, decoded.
pub(crate) fn find_trailing_version(text: &str) -> Option<String> {
    let quoted = VERSION_FIELD
        .captures_iter(text)
        .last()
        .and_then(|captures| captures.get(1))?;
    serde_json::from_str::<String>(quoted.as_str()).ok()
}
