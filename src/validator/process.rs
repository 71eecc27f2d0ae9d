use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{
    ReferenceLocations, Validator, ValidatorError, ValidatorOutcome, collect_reports,
};

const LOCATIONS_FILE: &str = "locations.json";

/// External validation tool invoked once per job.
///
/// Invocation: `<tool> <schema> <data> --output-dir <dir>`. Exit status 0
/// means the document conforms, 1 means it does not; anything else is a crash.
/// The tool may leave `locations.json` in the output directory; every other
/// JSON file there is treated as a report.
#[derive(Debug, Clone)]
pub struct ProcessValidator {
    program: String,
}

impl ProcessValidator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn resolve(&self) -> Result<PathBuf, ValidatorError> {
        which::which(&self.program).map_err(|e| ValidatorError::Unavailable {
            tool: self.program.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Validator for ProcessValidator {
    async fn run(
        &self,
        schema: &Path,
        data: &Path,
        output_dir: &Path,
    ) -> Result<ValidatorOutcome, ValidatorError> {
        let program = self.resolve()?;
        debug!("Running {} on {}", program.display(), data.display());

        let output = Command::new(&program)
            .arg(schema)
            .arg(data)
            .arg("--output-dir")
            .arg(output_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ValidatorError::Unavailable {
                tool: self.program.clone(),
                reason: e.to_string(),
            })?;

        let pass = match output.status.code() {
            Some(0) => true,
            Some(1) => false,
            _ => {
                return Err(ValidatorError::Crashed {
                    tool: self.program.clone(),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        };

        let locations_path = output_dir.join(LOCATIONS_FILE);
        let locations = if locations_path.is_file() {
            let raw = tokio::fs::read_to_string(&locations_path).await?;
            serde_json::from_str::<ReferenceLocations>(&raw).map_err(|e| {
                ValidatorError::MalformedOutput {
                    path: locations_path.clone(),
                    reason: e.to_string(),
                }
            })?
        } else {
            ReferenceLocations::default()
        };

        Ok(ValidatorOutcome {
            pass,
            locations,
            reports: collect_reports(output_dir, &[LOCATIONS_FILE])?,
        })
    }
}
