//! Conformance checking collaborators.
//!
//! The orchestrator only needs a pass/fail verdict, the reference locations a
//! document carries and the report files produced along the way.
//! [`ProcessValidator`] shells out to an external tool; [`BuiltinValidator`]
//! checks in-process with the `jsonschema` crate.

mod builtin;
mod process;

pub use builtin::BuiltinValidator;
pub use process::ProcessValidator;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ReferenceRole;

/// Locations of referenced files, grouped by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceLocations {
    pub allowed_amount: Vec<String>,
    pub in_network: Vec<String>,
    pub provider_reference: Vec<String>,
}

impl ReferenceLocations {
    pub fn for_role(&self, role: ReferenceRole) -> &[String] {
        match role {
            ReferenceRole::AllowedAmount => &self.allowed_amount,
            ReferenceRole::InNetwork => &self.in_network,
            ReferenceRole::ProviderReference => &self.provider_reference,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed_amount.is_empty()
            && self.in_network.is_empty()
            && self.provider_reference.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorOutcome {
    pub pass: bool,
    pub locations: ReferenceLocations,
    /// Report files written into the output directory.
    pub reports: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum ValidatorError {
    /// The validator cannot be invoked at all.
    #[error("validator '{tool}' is unavailable: {reason}")]
    Unavailable { tool: String, reason: String },

    #[error("validator '{tool}' exited abnormally ({status}): {stderr}")]
    Crashed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("validator produced unreadable output {}: {reason}", path.display())]
    MalformedOutput { path: PathBuf, reason: String },

    #[error("io error while validating: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Validator: Send + Sync {
    /// Check `data` against `schema`, writing reports into `output_dir`.
    async fn run(
        &self,
        schema: &Path,
        data: &Path,
        output_dir: &Path,
    ) -> Result<ValidatorOutcome, ValidatorError>;
}

/// JSON report files in `dir`, sorted by name, excluding `skip`.
pub(crate) fn collect_reports(dir: &Path, skip: &[&str]) -> std::io::Result<Vec<PathBuf>> {
    let mut reports = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let skipped = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| skip.contains(&name));
        if path.is_file() && is_json && !skipped {
            reports.push(path);
        }
    }
    reports.sort();
    Ok(reports)
}
