//! Retrieval of referenced files into a job's workspace.

mod http;
mod payload;

pub use http::HttpFetcher;
pub use payload::{PayloadKind, extract_payload};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// What a fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// A local JSON payload ready for validation.
    Payload(PathBuf),
    /// An archive with several eligible entries; the caller has to pick one.
    Ambiguous(Vec<String>),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("could not retrieve {uri}: {reason}")]
    Unreachable { uri: String, reason: String },

    #[error("{uri} answered with HTTP {status}")]
    Status { uri: String, status: u16 },

    #[error("archive {uri} contains no JSON payload")]
    NoEligiblePayload { uri: String },

    #[error("archive {uri} has no entry named '{entry}'")]
    EntryNotFound { uri: String, entry: String },

    #[error("io error while fetching: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve `uri` into `dest_dir`.
    ///
    /// `entry` names the archive member to extract when the resource is an
    /// archive holding more than one payload.
    async fn fetch(
        &self,
        uri: &str,
        dest_dir: &Path,
        entry: Option<&str>,
    ) -> Result<Fetched, FetchError>;
}

/// True for URIs the fetcher has to download.
pub fn is_remote(uri: &str) -> bool {
    let lower = uri.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
