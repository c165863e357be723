//! Build step

use std::ffi::OsString;
use std::path::{Path, MAIN_SEPARATOR_STR};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::GokError;

/// Produces the binary for the program in a build directory
#[async_trait]
pub trait Builder: Send + Sync {
    /// Build the main package in `build_dir`, writing the executable into
    /// `output_dir` under the name of its package directory
    ///
    /// A build that succeeds without producing a binary is not an error
    /// here; the caller checks for the artifact.
    async fn build(&self, build_dir: &Path, output_dir: &Path) -> Result<(), GokError>;
}

#[async_trait]
impl<T: Builder + ?Sized> Builder for Arc<T> {
    async fn build(&self, build_dir: &Path, output_dir: &Path) -> Result<(), GokError> {
        (**self).build(build_dir, output_dir).await
    }
}

/// Cross-compiles Go programs for the instance
#[derive(Debug, Clone)]
pub struct GoBuilder {
    /// `go` binary to invoke
    pub go: OsString,
    pub goos: String,
    pub goarch: String,
}

impl Default for GoBuilder {
    fn default() -> Self {
        Self {
            go: OsString::from("go"),
            goos: "linux".to_string(),
            goarch: std::env::var("GOARCH").unwrap_or_else(|_| "arm64".to_string()),
        }
    }
}

/// `-o` argument that makes `go build` write into a directory, skipping
/// non-main packages
fn output_arg(output_dir: &Path) -> OsString {
    let mut arg = output_dir.as_os_str().to_owned();
    if !arg.to_string_lossy().ends_with(MAIN_SEPARATOR_STR) {
        arg.push(MAIN_SEPARATOR_STR);
    }
    arg
}

#[async_trait]
impl Builder for GoBuilder {
    async fn build(&self, build_dir: &Path, output_dir: &Path) -> Result<(), GokError> {
        info!("Building {} for {}/{}", build_dir.display(), self.goos, self.goarch);

        let mut cmd = Command::new(&self.go);
        cmd.arg("build")
            .arg("-o")
            .arg(output_arg(output_dir))
            .arg(".")
            .current_dir(build_dir)
            .env("GOOS", &self.goos)
            .env("GOARCH", &self.goarch)
            .env("CGO_ENABLED", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        debug!("running {:?}", cmd);

        let status = cmd
            .status()
            .await
            .map_err(|e| GokError::Build(format!("failed to run {:?}: {}", self.go, e)))?;

        if !status.success() {
            return Err(GokError::Build(format!(
                "go build in {} failed: {}",
                build_dir.display(),
                status
            )));
        }
        Ok(())
    }
}
