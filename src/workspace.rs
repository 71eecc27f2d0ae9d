//! Private scratch storage for one validation run.
//!
//! Everything a run materializes (strict schemas, downloads, validator output)
//! lives under one temporary directory that is removed when the workspace is
//! dropped, whichever way the run ends.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

#[derive(Debug)]
pub struct RunWorkspace {
    root: TempDir,
}

impl RunWorkspace {
    pub fn new() -> io::Result<Self> {
        let root = tempfile::Builder::new().prefix("mrfcheck-").tempdir()?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Directory for materialized schemas.
    pub fn schemas_dir(&self) -> io::Result<PathBuf> {
        self.subdir("schemas")
    }

    /// Fresh directory pair for job number `sequence`: `(data, output)`.
    pub fn job_dirs(&self, sequence: usize) -> io::Result<(PathBuf, PathBuf)> {
        let job = format!("job-{sequence}");
        let data = self.subdir(&format!("{job}/data"))?;
        let output = self.subdir(&format!("{job}/output"))?;
        Ok((data, output))
    }

    fn subdir(&self, relative: &str) -> io::Result<PathBuf> {
        let dir = self.root.path().join(relative);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
