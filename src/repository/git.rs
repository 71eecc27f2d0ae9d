use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{RepositoryError, Tag, VersionRepository, require_known, schema_relative_path};

/// Single git working copy switched between tags in place.
///
/// Switching a tag changes what every later [`VersionRepository::locate_schema`]
/// call sees, so an instance holds an exclusive lock on `<dir>.lock` from
/// [`VersionRepository::ensure`] until it is dropped. A second instance on the
/// same directory is refused with [`RepositoryError::Unavailable`].
#[derive(Debug)]
pub struct GitCheckout {
    source_url: String,
    dir: PathBuf,
    active: Option<Tag>,
    lock: Option<File>,
}

impl GitCheckout {
    pub fn new(source_url: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            dir: dir.into(),
            active: None,
            lock: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.dir.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn is_cloned(&self) -> bool {
        self.dir.join(".git").exists()
    }

    fn unavailable(&self, reason: impl Into<String>) -> RepositoryError {
        RepositoryError::Unavailable {
            source_url: self.source_url.clone(),
            reason: reason.into(),
        }
    }

    fn acquire_lock(&mut self) -> Result<(), RepositoryError> {
        if self.lock.is_some() {
            return Ok(());
        }

        let path = self.lock_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RepositoryError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| RepositoryError::io(&path, e))?;

        if !file
            .try_lock_exclusive()
            .map_err(|e| RepositoryError::io(&path, e))?
        {
            return Err(self.unavailable(format!(
                "checkout {} is in use by another run; pass --repo-dir to use a separate one",
                self.dir.display()
            )));
        }

        debug!("Locked {}", path.display());
        self.lock = Some(file);
        Ok(())
    }

    /// Run git inside the checkout and return trimmed stdout.
    async fn git(&self, args: &[&str]) -> Result<String, RepositoryError> {
        debug!("git {} (in {})", args.join(" "), self.dir.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .await
            .map_err(|e| self.unavailable(format!("failed to execute git: {e}")))?;

        if !output.status.success() {
            return Err(RepositoryError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl VersionRepository for GitCheckout {
    async fn ensure(&mut self) -> Result<(), RepositoryError> {
        self.acquire_lock()?;
        if self.is_cloned() {
            return Ok(());
        }

        info!("Cloning schema repository {} into {}", self.source_url, self.dir.display());
        let output = Command::new("git")
            .arg("clone")
            .arg("--quiet")
            .arg(&self.source_url)
            .arg(&self.dir)
            .output()
            .await
            .map_err(|e| self.unavailable(format!("failed to execute git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(stderr.trim()));
        }

        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let stdout = self
            .git(&[
                "for-each-ref",
                "--sort=creatordate",
                "--format=%(refname:short)",
                "refs/tags",
            ])
            .await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Tag::new)
            .collect())
    }

    async fn checkout(&mut self, tag: &str) -> Result<(), RepositoryError> {
        if self.active.as_ref().is_some_and(|active| active.as_str() == tag) {
            return Ok(());
        }

        self.acquire_lock()?;
        let tag = require_known(tag, self.list_tags().await?)?;
        self.git(&[
            "-c",
            "advice.detachedHead=false",
            "checkout",
            "--quiet",
            "--force",
            tag.as_str(),
        ])
        .await?;
        debug!("Checked out schema version {tag}");
        self.active = Some(tag);
        Ok(())
    }

    fn active_tag(&self) -> Option<&Tag> {
        self.active.as_ref()
    }

    fn locate_schema(&self, name: &str) -> Result<Option<PathBuf>, RepositoryError> {
        if self.active.is_none() {
            return Err(RepositoryError::NoActiveVersion);
        }
        let path = self.dir.join(schema_relative_path(name));
        Ok(path.is_file().then_some(path))
    }

    async fn update(&mut self) -> Result<(), RepositoryError> {
        self.ensure().await?;
        info!("Fetching new schema versions from {}", self.source_url);
        self.git(&["fetch", "--tags", "--quiet", "origin"])
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn git_in(dir: &Path, args: &[&str], date: &str) {
        let status = StdCommand::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_DATE", date)
            .env("GIT_COMMITTER_DATE", date)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {args:?} failed: {status:?}");
    }

    /// Builds an upstream repository tagged v0.3 then v1.0.
    fn upstream() -> Option<TempDir> {
        if which::which("git").is_err() {
            eprintln!("git not installed; skipping");
            return None;
        }
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let schema_dir = root.join("schemas/in-network-rates");
        fs::create_dir_all(&schema_dir).unwrap();

        git_in(root, &["init", "--quiet"], "2022-01-01T00:00:00Z");
        fs::write(schema_dir.join("in-network-rates.json"), r#"{"title":"old"}"#).unwrap();
        git_in(root, &["add", "."], "2022-01-01T00:00:00Z");
        git_in(root, &["commit", "--quiet", "-m", "first"], "2022-01-01T00:00:00Z");
        git_in(root, &["tag", "v0.3"], "2022-01-01T00:00:00Z");

        fs::write(schema_dir.join("in-network-rates.json"), r#"{"title":"new"}"#).unwrap();
        git_in(root, &["commit", "--quiet", "-am", "second"], "2023-01-01T00:00:00Z");
        git_in(root, &["tag", "v1.0"], "2023-01-01T00:00:00Z");
        Some(dir)
    }

    #[tokio::test]
    async fn clones_lists_and_switches_tags() {
        let Some(upstream) = upstream() else { return };
        let work = TempDir::new().unwrap();
        let mut repo = GitCheckout::new(
            upstream.path().to_string_lossy(),
            work.path().join("checkout"),
        );

        repo.ensure().await.unwrap();
        repo.ensure().await.unwrap();
        assert_eq!(repo.list_tags().await.unwrap(), vec![Tag::new("v0.3"), Tag::new("v1.0")]);

        repo.checkout("v0.3").await.unwrap();
        let path = repo.locate_schema("in-network-rates").unwrap().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"title":"old"}"#);

        repo.checkout("v1.0").await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"title":"new"}"#);
        assert_eq!(repo.active_tag(), Some(&Tag::new("v1.0")));
        assert!(repo.locate_schema("provider-reference").unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_tag_reports_available_tags() {
        let Some(upstream) = upstream() else { return };
        let work = TempDir::new().unwrap();
        let mut repo = GitCheckout::new(
            upstream.path().to_string_lossy(),
            work.path().join("checkout"),
        );
        repo.ensure().await.unwrap();

        match repo.checkout("v9.9").await {
            Err(RepositoryError::UnknownVersion { available, .. }) => {
                assert_eq!(available, repo.list_tags().await.unwrap());
            }
            other => panic!("expected UnknownVersion, got {other:?}"),
        }
        assert!(repo.active_tag().is_none());
    }

    #[tokio::test]
    async fn clone_failure_is_unavailable() {
        if which::which("git").is_err() {
            return;
        }
        let work = TempDir::new().unwrap();
        let mut repo = GitCheckout::new(
            work.path().join("missing").to_string_lossy(),
            work.path().join("checkout"),
        );
        assert!(matches!(
            repo.ensure().await,
            Err(RepositoryError::Unavailable { .. })
        ));
    }

    #[test]
    fn locate_requires_a_checkout() {
        let repo = GitCheckout::new("unused", "/nonexistent");
        assert!(matches!(
            repo.locate_schema("in-network-rates"),
            Err(RepositoryError::NoActiveVersion)
        ));
    }

    #[tokio::test]
    async fn second_instance_on_same_checkout_is_refused() {
        let Some(upstream) = upstream() else { return };
        let work = TempDir::new().unwrap();
        let dir = work.path().join("checkout");
        let url = upstream.path().to_string_lossy().to_string();

        let mut first = GitCheckout::new(&url, &dir);
        first.ensure().await.unwrap();
        first.checkout("v0.3").await.unwrap();

        let mut second = GitCheckout::new(&url, &dir);
        assert!(matches!(
            second.ensure().await,
            Err(RepositoryError::Unavailable { .. })
        ));
        assert!(matches!(
            second.checkout("v1.0").await,
            Err(RepositoryError::Unavailable { .. })
        ));

        // The first instance still reads the tag it checked out.
        let path = first.locate_schema("in-network-rates").unwrap().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"title":"old"}"#);

        drop(first);
        second.ensure().await.unwrap();
        second.checkout("v1.0").await.unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"title":"new"}"#);
    }

    #[test]
    fn lock_file_sits_next_to_the_checkout() {
        let repo = GitCheckout::new("unused", "/srv/mrfcheck/schema-repo");
        assert_eq!(
            repo.lock_path(),
            PathBuf::from("/srv/mrfcheck/schema-repo.lock")
        );
    }

    #[test]
    fn independent_checkouts_do_not_contend() {
        let work = TempDir::new().unwrap();
        let mut a = GitCheckout::new("unused", work.path().join("a"));
        let mut b = GitCheckout::new("unused", work.path().join("b"));
        a.acquire_lock().unwrap();
        b.acquire_lock().unwrap();
        assert!(work.path().join("a.lock").exists());
    }
}
