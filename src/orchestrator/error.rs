use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use super::job::JobStateError;
use crate::detect::DetectionError;
use crate::fetch::FetchError;
use crate::repository::RepositoryError;
use crate::schema::{SchemaError, SchemaName};
use crate::validator::ValidatorError;

/// Conditions that end a whole run.
#[derive(Error, Debug, Diagnostic)]
pub enum RunError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Repository(#[from] RepositoryError),

    #[error("could not determine the schema version of {uri}")]
    #[diagnostic(
        code(mrfcheck::no_version),
        help("pass --schema-version <VERSION> to choose the schema version explicitly")
    )]
    VersionUndetermined {
        uri: String,
        #[source]
        source: DetectionError,
    },

    #[error("no {schema} schema available at version {version}")]
    #[diagnostic(
        code(mrfcheck::schema_unavailable),
        help("check --target, or run `mrfcheck versions` to pick another version")
    )]
    SchemaUnavailable { schema: SchemaName, version: String },

    #[error(transparent)]
    #[diagnostic(code(mrfcheck::schema))]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(
        code(mrfcheck::validator_unavailable),
        help("install the validation tool or use --validator builtin")
    )]
    ValidatorUnavailable(ValidatorError),

    #[error("failed to validate {uri}")]
    #[diagnostic(code(mrfcheck::validator))]
    Validator {
        uri: String,
        #[source]
        source: ValidatorError,
    },

    #[error("failed to fetch {uri}")]
    #[diagnostic(code(mrfcheck::fetch))]
    Fetch {
        uri: String,
        #[source]
        source: FetchError,
    },

    #[error("{uri} is an archive with several JSON payloads")]
    #[diagnostic(
        code(mrfcheck::ambiguous_archive),
        help("re-run with --entry <NAME>; candidates: {}", .candidates.join(", "))
    )]
    AmbiguousArchive { uri: String, candidates: Vec<String> },

    #[error("failed to prepare the run workspace: {0}")]
    #[diagnostic(code(mrfcheck::io))]
    Workspace(#[source] std::io::Error),

    #[error("failed to write results to {}: {source}", path.display())]
    #[diagnostic(code(mrfcheck::io))]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(mrfcheck::internal))]
    InvalidTransition(#[from] JobStateError),
}
