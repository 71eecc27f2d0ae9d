use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{FetchError, Fetched, Fetcher, extract_payload, is_remote};

const DOWNLOAD_FILE: &str = "download.bin";

/// Downloads `http(s)` resources with `reqwest`; everything else is read from
/// the local filesystem. Compressed or archived payloads are unpacked.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("mrfcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Unreachable {
                uri: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn download(&self, uri: &str, target: &Path) -> Result<(), FetchError> {
        info!("Downloading {uri}");
        let unreachable = |e: reqwest::Error| FetchError::Unreachable {
            uri: uri.to_string(),
            reason: e.to_string(),
        };

        let mut response = self.client.get(uri).send().await.map_err(unreachable)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(target).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(unreachable)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!("Downloaded {written} bytes from {uri}");
        Ok(())
    }
}

fn local_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        uri: &str,
        dest_dir: &Path,
        entry: Option<&str>,
    ) -> Result<Fetched, FetchError> {
        let source = if is_remote(uri) {
            let target = dest_dir.join(DOWNLOAD_FILE);
            self.download(uri, &target).await?;
            target
        } else {
            let path = local_path(uri);
            if !path.is_file() {
                return Err(FetchError::Unreachable {
                    uri: uri.to_string(),
                    reason: "no such file".to_string(),
                });
            }
            path
        };

        let uri = uri.to_string();
        let dest_dir = dest_dir.to_path_buf();
        let entry = entry.map(str::to_string);
        tokio::task::spawn_blocking(move || {
            extract_payload(&uri, &source, &dest_dir, entry.as_deref())
        })
        .await
        .map_err(|e| FetchError::Io(std::io::Error::other(e)))?
    }
}
