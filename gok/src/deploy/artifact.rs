//! Built binaries and their staged copies on the instance

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::GokError;
use crate::filesys::file::File;
use crate::filesys::workspace::Workspace;

/// Staging namespace for hot-swapped binaries, below `uploadtemp/`
pub const STAGING_PREFIX: &str = "gok-run";

/// Directory on the instance that receives uploaded-but-not-yet-diverted files
pub const UPLOAD_TEMP: &str = "uploadtemp";

/// A locally built executable
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub name: String,
    pub file: File,
    pub size: u64,
}

impl BuildArtifact {
    /// Find the binary a build for `name` put into `workspace`
    ///
    /// A successful build that produced nothing usually means the directory
    /// is not a main package, so absence is reported as
    /// [`GokError::ArtifactMissing`] rather than an I/O error.
    pub async fn locate(workspace: &Workspace, name: &str) -> Result<Self, GokError> {
        let file = workspace.artifact_file(name);
        match tokio::fs::metadata(file.path()).await {
            Ok(meta) if meta.is_file() => Ok(Self {
                name: name.to_string(),
                size: meta.len(),
                file,
            }),
            Ok(_) => Err(GokError::ArtifactMissing {
                name: name.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GokError::ArtifactMissing {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Name a program is deployed under: the basename of its build directory
pub async fn artifact_name(build_dir: &Path) -> Result<String, GokError> {
    let dir: PathBuf = tokio::fs::canonicalize(build_dir).await?;
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            GokError::ConfigError(format!("{} has no basename", dir.display()))
        })
}

/// Where a binary lands on the instance and how it is diverted to
///
/// Paths depend only on the program name, so a second run for the same
/// program overwrites the previous staged copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub name: String,
    pub size: u64,
}

impl StagedUpload {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Upload destination, relative to the instance's base URL
    pub fn remote_path(&self) -> String {
        format!("{}/{}/{}", UPLOAD_TEMP, STAGING_PREFIX, self.name)
    }

    /// Diversion source, relative to the instance's upload temp directory
    pub fn diversion_source(&self) -> String {
        format!("{}/{}", STAGING_PREFIX, self.name)
    }

    /// Path the service normally executes from
    pub fn production_path(&self) -> String {
        format!("/user/{}", self.name)
    }
}
