use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{ReferenceLocations, Validator, ValidatorError, ValidatorOutcome};
use crate::orchestrator::NEGOTIATED_TYPE_REPORT;

const TOOL_NAME: &str = "builtin";
const ERRORS_REPORT: &str = "errors.json";

/// In-process validator backed by the `jsonschema` crate.
///
/// Loads the whole document into memory, so it is meant for files that fit.
#[derive(Debug, Clone, Default)]
pub struct BuiltinValidator;

impl BuiltinValidator {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Violation {
    instance_path: String,
    schema_path: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorsReport {
    valid: bool,
    errors: Vec<Violation>,
}

#[async_trait]
impl Validator for BuiltinValidator {
    async fn run(
        &self,
        schema: &Path,
        data: &Path,
        output_dir: &Path,
    ) -> Result<ValidatorOutcome, ValidatorError> {
        let schema = schema.to_path_buf();
        let data = data.to_path_buf();
        let output_dir = output_dir.to_path_buf();
        tokio::task::spawn_blocking(move || check(&schema, &data, &output_dir))
            .await
            .map_err(|e| ValidatorError::Io(std::io::Error::other(e)))?
    }
}

fn check(schema_path: &Path, data: &Path, output_dir: &Path) -> Result<ValidatorOutcome, ValidatorError> {
    let schema: Value = serde_json::from_slice(&fs::read(schema_path)?).map_err(|e| {
        ValidatorError::MalformedOutput {
            path: schema_path.to_path_buf(),
            reason: format!("schema is not valid JSON: {e}"),
        }
    })?;
    let validator = jsonschema::validator_for(&schema).map_err(|e| ValidatorError::Crashed {
        tool: TOOL_NAME.to_string(),
        status: "invalid schema".to_string(),
        stderr: e.to_string(),
    })?;

    let mut reports = Vec::new();
    let document: Value = match serde_json::from_slice(&fs::read(data)?) {
        Ok(document) => document,
        Err(e) => {
            let report = ErrorsReport {
                valid: false,
                errors: vec![Violation {
                    instance_path: String::new(),
                    schema_path: String::new(),
                    message: format!("document is not valid JSON: {e}"),
                }],
            };
            reports.push(write_report(output_dir, ERRORS_REPORT, &report)?);
            return Ok(ValidatorOutcome {
                pass: false,
                locations: ReferenceLocations::default(),
                reports,
            });
        }
    };

    let errors: Vec<Violation> = validator
        .iter_errors(&document)
        .map(|error| Violation {
            instance_path: error.instance_path.to_string(),
            schema_path: error.schema_path.to_string(),
            message: error.to_string(),
        })
        .collect();
    let pass = errors.is_empty();
    debug!("{} violation(s) in {}", errors.len(), data.display());

    reports.push(write_report(
        output_dir,
        ERRORS_REPORT,
        &ErrorsReport {
            valid: pass,
            errors,
        },
    )?);

    let negotiated_types = negotiated_types(&document);
    if !negotiated_types.is_empty() {
        reports.push(write_report(output_dir, NEGOTIATED_TYPE_REPORT, &negotiated_types)?);
    }

    Ok(ValidatorOutcome {
        pass,
        locations: extract_locations(&document),
        reports,
    })
}

fn write_report<T: Serialize>(dir: &Path, name: &str, report: &T) -> Result<PathBuf, ValidatorError> {
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(report).map_err(|e| ValidatorError::MalformedOutput {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&path, body)?;
    Ok(path)
}

fn strings_at<'a>(items: &'a Value, field: &'a str) -> impl Iterator<Item = String> + 'a {
    items
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(move |item| item[field].as_str().map(str::to_string))
}

/// Reference locations carried by table-of-contents and in-network documents.
pub(crate) fn extract_locations(document: &Value) -> ReferenceLocations {
    let mut locations = ReferenceLocations::default();

    for structure in document["reporting_structure"].as_array().into_iter().flatten() {
        if let Some(location) = structure["allowed_amount_file"]["location"].as_str() {
            locations.allowed_amount.push(location.to_string());
        }
        locations
            .in_network
            .extend(strings_at(&structure["in_network_files"], "location"));
    }

    locations
        .provider_reference
        .extend(strings_at(&document["provider_references"], "location"));

    locations
}

/// Flat map from negotiated-price record path to its `negotiated_type`.
pub(crate) fn negotiated_types(document: &Value) -> BTreeMap<String, String> {
    let mut types = BTreeMap::new();
    for (i, item) in document["in_network"].as_array().into_iter().flatten().enumerate() {
        for (j, rate) in item["negotiated_rates"].as_array().into_iter().flatten().enumerate() {
            for (k, price) in rate["negotiated_prices"]
                .as_array()
                .into_iter()
                .flatten()
                .enumerate()
            {
                if let Some(kind) = price["negotiated_type"].as_str() {
                    types.insert(
                        format!("/in_network/{i}/negotiated_rates/{j}/negotiated_prices/{k}"),
                        kind.to_string(),
                    );
                }
            }
        }
    }
    types
}
