use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::debug;

use super::{RepositoryError, Tag, VersionRepository, require_known, schema_relative_path};

/// Read-only directory holding one sub-directory per tag.
///
/// ```text
/// <root>/v1.0/schemas/in-network-rates/in-network-rates.json
/// <root>/v1.1/schemas/...
/// ```
///
/// Nothing is switched on disk; checking out a tag only changes which
/// sub-directory is read.
#[derive(Debug)]
pub struct SnapshotRepository {
    root: PathBuf,
    active: Option<Tag>,
}

impl SnapshotRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl VersionRepository for SnapshotRepository {
    async fn ensure(&mut self) -> Result<(), RepositoryError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable {
                source_url: self.root.display().to_string(),
                reason: "snapshot directory does not exist".to_string(),
            })
        }
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let entries = fs::read_dir(&self.root).map_err(|e| RepositoryError::io(&self.root, e))?;

        // Creation order approximated by modification time, then name.
        let mut tags: Vec<(SystemTime, String)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RepositoryError::io(&self.root, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| RepositoryError::io(&entry.path(), e))?;
            if !metadata.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            tags.push((modified, name));
        }
        tags.sort();

        Ok(tags.into_iter().map(|(_, name)| Tag::new(name)).collect())
    }

    async fn checkout(&mut self, tag: &str) -> Result<(), RepositoryError> {
        if self.active.as_ref().is_some_and(|active| active.as_str() == tag) {
            return Ok(());
        }
        let tag = require_known(tag, self.list_tags().await?)?;
        debug!("Using schema snapshot {}", self.root.join(tag.as_str()).display());
        self.active = Some(tag);
        Ok(())
    }

    fn active_tag(&self) -> Option<&Tag> {
        self.active.as_ref()
    }

    fn locate_schema(&self, name: &str) -> Result<Option<PathBuf>, RepositoryError> {
        let tag = self.active.as_ref().ok_or(RepositoryError::NoActiveVersion)?;
        let path = self.root.join(tag.as_str()).join(schema_relative_path(name));
        Ok(path.is_file().then_some(path))
    }

    async fn update(&mut self) -> Result<(), RepositoryError> {
        debug!("Snapshot repositories have no upstream to update from");
        Ok(())
    }
}
