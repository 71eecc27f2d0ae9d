//! Forward scan: stream-parse from the start until the top-level `version`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;
use tracing::debug;

use super::DetectionError;

/// Cooperative stop signal shared with a blocking scan.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fails every read once the flag is raised, which unwinds the parser.
struct CancellableRead<R> {
    inner: R,
    cancel: CancelFlag,
}

impl<R: Read> Read for CancellableRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other("scan cancelled"));
        }
        self.inner.read(buf)
    }
}

/// Blocking forward scan over the file at `path`.
///
/// Only a string-valued `version` key of the root object counts. The file is
/// closed as soon as it is found.
pub fn scan_forward(path: &Path, cancel: &CancelFlag) -> Result<String, DetectionError> {
    let file = File::open(path)?;
    let reader = BufReader::new(CancellableRead {
        inner: file,
        cancel: cancel.clone(),
    });
    scan_reader(reader)
}

pub(crate) fn scan_reader<R: Read>(reader: R) -> Result<String, DetectionError> {
    let mut found = None;
    let mut deserializer = serde_json::Deserializer::from_reader(reader);

    // The parser reports an error once we stop consuming the root object
    // early; what matters is whether the version was captured first.
    if let Err(e) = (TopLevelVersion { found: &mut found }).deserialize(&mut deserializer) {
        if found.is_none() {
            debug!("Forward scan ended without a version: {e}");
        }
    }

    found.ok_or(DetectionError::NoVersionForward)
}

struct TopLevelVersion<'a> {
    found: &'a mut Option<String>,
}

impl<'de> DeserializeSeed<'de> for TopLevelVersion<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for TopLevelVersion<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            if key != "version" {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            if let Value::String(version) = map.next_value::<Value>()? {
                *self.found = Some(version);
                return Ok(());
            }
        }
        Ok(())
    }
}
