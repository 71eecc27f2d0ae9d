use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use super::SchemaName;
use super::strict::apply_strict;
use crate::repository::{RepositoryError, Tag, VersionRepository};

/// Identity of one materialized schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub name: SchemaName,
    pub tag: Tag,
    pub strict: bool,
}

impl SchemaKey {
    /// Stable file name for the materialized copy.
    fn file_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.tag.as_str().as_bytes());
        let digest = hex::encode(hasher.finalize());
        let suffix = if self.strict { "-strict" } else { "" };
        format!("{}-{}{suffix}.json", self.name, &digest[..16])
    }
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to read schema {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write schema {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Memoizes ready-to-use schema files for one run.
///
/// Entries are keyed on the repository's active tag at call time. A hit is
/// answered from memory without touching the repository.
#[derive(Debug)]
pub struct SchemaCache {
    dir: PathBuf,
    entries: HashMap<SchemaKey, PathBuf>,
}

impl SchemaCache {
    /// `dir` must be private to the run; materialized files are written there.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path to the schema for `name` at the repository's active tag.
    ///
    /// Returns `Ok(None)` when the active revision does not publish `name`.
    pub fn use_schema(
        &mut self,
        repo: &dyn VersionRepository,
        name: SchemaName,
        strict: bool,
    ) -> Result<Option<PathBuf>, SchemaError> {
        let tag = repo
            .active_tag()
            .ok_or(RepositoryError::NoActiveVersion)?
            .clone();
        let key = SchemaKey { name, tag, strict };

        if let Some(path) = self.entries.get(&key) {
            debug!("Schema cache hit for {name}@{} (strict: {strict})", key.tag);
            return Ok(Some(path.clone()));
        }

        let Some(source) = repo.locate_schema(name.as_str())? else {
            debug!("Schema {name} is not published at {}", key.tag);
            return Ok(None);
        };

        fs::create_dir_all(&self.dir).map_err(|e| SchemaError::Write {
            path: self.dir.clone(),
            source: e,
        })?;
        let target = self.dir.join(key.file_name());

        if strict {
            let raw = fs::read_to_string(&source).map_err(|e| SchemaError::Read {
                path: source.clone(),
                source: e,
            })?;
            let mut schema: serde_json::Value =
                serde_json::from_str(&raw).map_err(|e| SchemaError::Parse {
                    path: source.clone(),
                    source: e,
                })?;
            apply_strict(&mut schema);
            let rendered = serde_json::to_string_pretty(&schema).map_err(|e| SchemaError::Parse {
                path: source.clone(),
                source: e,
            })?;
            fs::write(&target, rendered).map_err(|e| SchemaError::Write {
                path: target.clone(),
                source: e,
            })?;
        } else {
            fs::copy(&source, &target).map_err(|e| SchemaError::Write {
                path: target.clone(),
                source: e,
            })?;
        }

        debug!(
            "Materialized {name}@{} (strict: {strict}) at {}",
            key.tag,
            target.display()
        );
        self.entries.insert(key, target.clone());
        Ok(Some(target))
    }
}
