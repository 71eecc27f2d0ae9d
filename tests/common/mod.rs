#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;

use mrfcheck::fetch::{FetchError, Fetched, Fetcher};
use mrfcheck::schema::SchemaName;
use mrfcheck::validator::{ReferenceLocations, Validator, ValidatorError, ValidatorOutcome};

pub const PERMISSIVE_SCHEMA: &str = r#"{"type": "object"}"#;

/// Snapshot repository with every schema published under each of `tags`.
pub fn snapshot_repo(tags: &[&str]) -> TempDir {
    let root = TempDir::new().unwrap();
    for tag in tags {
        for name in SchemaName::ALL {
            let dir = root.path().join(tag).join("schemas").join(name.as_str());
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(format!("{name}.json")), PERMISSIVE_SCHEMA).unwrap();
        }
    }
    root
}

/// Serves documents from memory; unknown URIs are unreachable.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    documents: HashMap<String, String>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: &str, body: impl Into<String>) -> Self {
        self.documents.insert(uri.to_string(), body.into());
        self
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(
        &self,
        uri: &str,
        dest_dir: &Path,
        _entry: Option<&str>,
    ) -> Result<Fetched, FetchError> {
        let body = self
            .documents
            .get(uri)
            .ok_or_else(|| FetchError::Unreachable {
                uri: uri.to_string(),
                reason: "no such document".to_string(),
            })?;
        let path = dest_dir.join("payload.json");
        fs::write(&path, body)?;
        Ok(Fetched::Payload(path))
    }
}

#[derive(Debug, Deserialize)]
struct Instructions {
    #[serde(default = "passes")]
    pass: bool,
    #[serde(default)]
    locations: ReferenceLocations,
}

fn passes() -> bool {
    true
}

/// Takes its verdict and the referenced locations from the document itself:
/// `{"pass": false, "locations": {"inNetwork": ["..."]}}`.
#[derive(Debug, Default)]
pub struct FakeValidator;

#[async_trait]
impl Validator for FakeValidator {
    async fn run(
        &self,
        _schema: &Path,
        data: &Path,
        output_dir: &Path,
    ) -> Result<ValidatorOutcome, ValidatorError> {
        let body = fs::read_to_string(data)?;
        let instructions: Instructions =
            serde_json::from_str(&body).map_err(|e| ValidatorError::MalformedOutput {
                path: data.to_path_buf(),
                reason: e.to_string(),
            })?;

        let report = output_dir.join("errors.json");
        fs::write(&report, format!(r#"{{"valid": {}}}"#, instructions.pass))?;

        Ok(ValidatorOutcome {
            pass: instructions.pass,
            locations: instructions.locations,
            reports: vec![report],
        })
    }
}

/// Table of contents referencing two allowed-amount files and one in-network file.
pub fn table_of_contents(version: &str) -> String {
    format!(
        r#"{{
  "version": "{version}",
  "locations": {{
    "allowedAmount": ["https://example.com/aa1.json", "https://example.com/aa2.json"],
    "inNetwork": ["https://example.com/in1.json"]
  }}
}}"#
    )
}

pub fn leaf(version: &str) -> String {
    format!(r#"{{"version": "{version}"}}"#)
}

pub fn read_index(output_dir: &Path) -> Vec<String> {
    fs::read_to_string(output_dir.join("index.txt"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn output_dir(root: &TempDir) -> PathBuf {
    root.path().join("results")
}
