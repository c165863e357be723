//! Scratch directory for one deployment attempt

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::errors::GokError;
use crate::filesys::file::File;

const WORKSPACE_PREFIX: &str = "gokrazy-bins-";

/// Directory that holds the build artifact
///
/// An ephemeral workspace is removed when dropped, which covers every exit
/// path of a run. A kept workspace is the system temp directory and is never
/// removed.
#[derive(Debug)]
pub enum Workspace {
    Ephemeral(TempDir),
    Kept(PathBuf),
}

impl Workspace {
    /// Acquire a workspace; `keep` retains the artifact after the run
    pub fn acquire(keep: bool) -> Result<Self, GokError> {
        if keep {
            let path = std::env::temp_dir();
            debug!("using kept workspace {}", path.display());
            return Ok(Workspace::Kept(path));
        }
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()?;
        debug!("created workspace {}", dir.path().display());
        Ok(Workspace::Ephemeral(dir))
    }

    pub fn path(&self) -> &Path {
        match self {
            Workspace::Ephemeral(dir) => dir.path(),
            Workspace::Kept(path) => path,
        }
    }

    /// The file a build for `name` is expected to produce
    pub fn artifact_file(&self, name: &str) -> File {
        File::new(self.path().join(name))
    }

    /// Remove whatever an earlier run left at the artifact path of `name`
    ///
    /// A kept workspace outlives its run, so this must happen before every
    /// build: afterwards the path holds only what this run's build wrote.
    pub async fn clear_artifact(&self, name: &str) -> Result<(), GokError> {
        let file = self.artifact_file(name);
        match tokio::fs::remove_file(file.path()).await {
            Ok(()) => {
                debug!("removed stale {}", file.path().display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
