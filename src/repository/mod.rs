//! Tag-addressed schema sources.
//!
//! A [`VersionRepository`] exposes one active revision at a time. Callers go
//! through the trait so they never depend on how switching is done: the git
//! variant mutates a single working copy in place, the snapshot variant keeps
//! one immutable directory per tag.

mod git;
mod snapshot;

pub use git::GitCheckout;
pub use snapshot::SnapshotRepository;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

/// Named, immutable revision of the schema repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::new(value)
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum RepositoryError {
    #[error("schema repository unavailable ({source_url}): {reason}")]
    #[diagnostic(
        code(mrfcheck::repository),
        help(
            "check --repo-url and network access, point --schema-dir at a local copy, \
             or pass --repo-dir to use a checkout no other run holds"
        )
    )]
    Unavailable { source_url: String, reason: String },

    #[error("unknown schema version '{requested}'; available versions: {}", format_tags(.available))]
    #[diagnostic(
        code(mrfcheck::unknown_version),
        help("available versions: {}", format_tags(.available))
    )]
    UnknownVersion {
        requested: String,
        available: Vec<Tag>,
    },

    #[error("no schema version is checked out")]
    #[diagnostic(code(mrfcheck::repository))]
    NoActiveVersion,

    #[error("`git {command}` failed: {stderr}")]
    #[diagnostic(code(mrfcheck::repository))]
    Git { command: String, stderr: String },

    #[error("io error in schema repository at {}: {source}", path.display())]
    #[diagnostic(code(mrfcheck::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepositoryError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn format_tags(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "(none)".to_string();
    }
    tags.iter()
        .map(Tag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A schema source whose contents are addressed by tag.
///
/// Exactly one tag is active per instance. Implementations are not safe to
/// share between concurrent runs; each run owns its repository.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Make sure the local copy exists and is held by this instance. Idempotent.
    async fn ensure(&mut self) -> Result<(), RepositoryError>;

    /// All tags, oldest first. Empty for an untagged repository.
    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError>;

    /// Make `tag` the active revision. Re-activating the current tag does not
    /// touch the filesystem.
    async fn checkout(&mut self, tag: &str) -> Result<(), RepositoryError>;

    fn active_tag(&self) -> Option<&Tag>;

    /// Path of the raw schema document for `name` in the active revision, or
    /// `None` when that revision does not publish it.
    fn locate_schema(&self, name: &str) -> Result<Option<PathBuf>, RepositoryError>;

    /// Pull newly published tags without changing the active one.
    async fn update(&mut self) -> Result<(), RepositoryError>;
}

/// Relative location of a schema inside a revision.
pub(crate) fn schema_relative_path(name: &str) -> PathBuf {
    Path::new("schemas").join(name).join(format!("{name}.json"))
}

/// Builds an [`RepositoryError::UnknownVersion`] when `tag` is not in `tags`.
pub(crate) fn require_known(tag: &str, tags: Vec<Tag>) -> Result<Tag, RepositoryError> {
    match tags.iter().find(|known| known.as_str() == tag) {
        Some(found) => Ok(found.clone()),
        None => Err(RepositoryError::UnknownVersion {
            requested: tag.to_string(),
            available: tags,
        }),
    }
}
