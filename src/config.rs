//! Settings shared by every subcommand.
//!
//! Values come from command-line flags, then `MRFCHECK_*` environment
//! variables, then the defaults below.

use std::path::PathBuf;

use clap::Args;

use crate::repository::{GitCheckout, SnapshotRepository, VersionRepository};
use crate::validator::{BuiltinValidator, ProcessValidator, Validator};

pub const DEFAULT_REPO_URL: &str = "https://github.com/CMSgov/price-transparency-guide.git";
pub const BUILTIN_VALIDATOR: &str = "builtin";

const REPO_SUBDIR: &str = ".mrfcheck/schema-repo";

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Git URL of the schema repository
    #[arg(long, env = "MRFCHECK_REPO_URL", default_value = DEFAULT_REPO_URL, global = true)]
    pub repo_url: String,

    /// Local checkout of the schema repository [default: ~/.mrfcheck/schema-repo]
    #[arg(long, env = "MRFCHECK_REPO_DIR", global = true)]
    pub repo_dir: Option<PathBuf>,

    /// Directory with one sub-directory per schema version, used instead of git
    #[arg(long, env = "MRFCHECK_SCHEMA_DIR", global = true)]
    pub schema_dir: Option<PathBuf>,

    /// `builtin`, or the name or path of an external validation tool
    #[arg(long, env = "MRFCHECK_VALIDATOR", default_value = BUILTIN_VALIDATOR, global = true)]
    pub validator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            repo_dir: None,
            schema_dir: None,
            validator: BUILTIN_VALIDATOR.to_string(),
        }
    }
}

impl Settings {
    /// Where the git checkout lives.
    pub fn repo_dir(&self) -> PathBuf {
        self.repo_dir
            .clone()
            .unwrap_or_else(|| default_repo_dir(std::env::var_os("HOME").map(PathBuf::from)))
    }

    pub fn repository(&self) -> Box<dyn VersionRepository> {
        match &self.schema_dir {
            Some(dir) => Box::new(SnapshotRepository::new(dir)),
            None => Box::new(GitCheckout::new(&self.repo_url, self.repo_dir())),
        }
    }

    pub fn validator(&self) -> Box<dyn Validator> {
        if self.validator == BUILTIN_VALIDATOR {
            Box::new(BuiltinValidator::new())
        } else {
            Box::new(ProcessValidator::new(&self.validator))
        }
    }
}

fn default_repo_dir(home: Option<PathBuf>) -> PathBuf {
    home.unwrap_or_else(|| PathBuf::from(".")).join(REPO_SUBDIR)
}
