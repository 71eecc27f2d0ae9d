//! Content sniffing and extraction of the JSON payload from a download.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::debug;
use zip::ZipArchive;

use super::{FetchError, Fetched};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Gzip,
    Zip,
    Plain,
}

impl PayloadKind {
    pub fn sniff(path: &Path) -> io::Result<Self> {
        let mut header = [0u8; 4];
        let mut file = File::open(path)?;
        let mut filled = 0;
        while filled < header.len() {
            let n = file.read(&mut header[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Ok(if filled >= 2 && header[..2] == GZIP_MAGIC {
            PayloadKind::Gzip
        } else if filled == 4 && header == ZIP_MAGIC {
            PayloadKind::Zip
        } else {
            PayloadKind::Plain
        })
    }
}

/// Turn the downloaded file at `source` into a JSON payload in `dest_dir`.
///
/// `uri` is only used in error messages.
pub fn extract_payload(
    uri: &str,
    source: &Path,
    dest_dir: &Path,
    entry: Option<&str>,
) -> Result<Fetched, FetchError> {
    match PayloadKind::sniff(source)? {
        PayloadKind::Plain => Ok(Fetched::Payload(source.to_path_buf())),
        PayloadKind::Gzip => {
            let target = extraction_target(dest_dir, payload_name(uri, "payload.json"), source);
            let mut decoder = MultiGzDecoder::new(File::open(source)?);
            let mut out = File::create(&target)?;
            io::copy(&mut decoder, &mut out)?;
            debug!("Inflated {uri} into {}", target.display());
            Ok(Fetched::Payload(target))
        }
        PayloadKind::Zip => extract_zip(uri, source, dest_dir, entry),
    }
}

fn extract_zip(
    uri: &str,
    source: &Path,
    dest_dir: &Path,
    entry: Option<&str>,
) -> Result<Fetched, FetchError> {
    let mut archive = ZipArchive::new(File::open(source)?).map_err(|e| zip_error(uri, e))?;

    let mut candidates = Vec::new();
    for index in 0..archive.len() {
        let file = archive.by_index(index).map_err(|e| zip_error(uri, e))?;
        if !file.is_dir() && file.name().to_ascii_lowercase().ends_with(".json") {
            candidates.push(file.name().to_string());
        }
    }

    let chosen = match (entry, candidates.as_slice()) {
        (_, []) => {
            return Err(FetchError::NoEligiblePayload {
                uri: uri.to_string(),
            });
        }
        (Some(wanted), _) => {
            if !candidates.iter().any(|name| name == wanted) {
                return Err(FetchError::EntryNotFound {
                    uri: uri.to_string(),
                    entry: wanted.to_string(),
                });
            }
            wanted.to_string()
        }
        (None, [only]) => only.clone(),
        (None, _) => return Ok(Fetched::Ambiguous(candidates)),
    };

    let target = extraction_target(dest_dir, payload_name(&chosen, "payload.json"), source);
    let mut member = archive.by_name(&chosen).map_err(|e| zip_error(uri, e))?;
    let mut out = File::create(&target)?;
    io::copy(&mut member, &mut out)?;
    debug!("Extracted {chosen} from {uri}");
    Ok(Fetched::Payload(target))
}

fn zip_error(uri: &str, error: zip::result::ZipError) -> FetchError {
    FetchError::Unreachable {
        uri: uri.to_string(),
        reason: format!("unreadable zip archive: {error}"),
    }
}

/// Where to write an extracted payload. Never the archive being read, which
/// `File::create` would truncate mid-read.
fn extraction_target(dest_dir: &Path, name: PathBuf, source: &Path) -> PathBuf {
    let target = dest_dir.join(&name);
    if target == source {
        let mut renamed = OsString::from("extracted-");
        renamed.push(name.as_os_str());
        dest_dir.join(renamed)
    } else {
        target
    }
}

/// Local file name for a payload: the last path segment with any `.gz`
/// suffix removed, or `fallback`.
fn payload_name(uri: &str, fallback: &str) -> PathBuf {
    let without_query = uri.split(['?', '#']).next().unwrap_or(uri);
    let last = without_query.rsplit(['/', '\\']).next().unwrap_or("");
    let trimmed = last.strip_suffix(".gz").unwrap_or(last);
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        PathBuf::from(fallback)
    } else {
        PathBuf::from(trimmed)
    }
}
