//! Streams a build artifact into the instance's staging area

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::TryStreamExt;
use reqwest::Body;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::info;

use crate::deploy::artifact::{BuildArtifact, StagedUpload};
use crate::errors::GokError;
use crate::http::client::HttpClient;
use crate::progress::ProgressSession;

/// Outcome of a completed upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport {
    pub staged: StagedUpload,
    pub transferred: u64,
    pub duration: Duration,
}

pub struct Uploader<'a> {
    client: &'a HttpClient,
    progress: Arc<ProgressSession>,
}

impl<'a> Uploader<'a> {
    pub fn new(client: &'a HttpClient, progress: Arc<ProgressSession>) -> Self {
        Self { client, progress }
    }

    /// Stream `source` (`size` bytes) to `remote_path`
    ///
    /// Each chunk is counted in the progress session as it is handed to the
    /// transport. The session is reset afterwards whether or not the request
    /// succeeded. Returns the bytes counted since the session was last reset.
    pub async fn put<R>(&self, remote_path: &str, source: R, size: u64) -> Result<u64, GokError>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let progress = self.progress.clone();
        let stream = ReaderStream::new(source).inspect_ok(move |chunk| {
            progress.observe(chunk.len() as u64);
        });

        let result = self
            .client
            .put(remote_path, Body::wrap_stream(stream))
            .await;
        let transferred = self.progress.reset();
        result?;

        if transferred != size {
            return Err(GokError::TruncatedTransfer {
                sent: transferred,
                expected: size,
            });
        }
        Ok(transferred)
    }

    /// Upload `artifact` to its staging path on the instance
    pub async fn upload(&self, artifact: &BuildArtifact) -> Result<UploadReport, GokError> {
        let staged = StagedUpload::new(&artifact.name, artifact.size);
        let source = artifact
            .file
            .open()
            .await
            .map_err(|e| GokError::transfer(&artifact.name, e))?;

        self.progress.set_status(format!("uploading {}", artifact.name));
        self.progress.set_total(artifact.size);
        self.progress.reset();

        info!("Uploading {} to {}", artifact.name, staged.remote_path());
        let start = Instant::now();
        let transferred = self
            .put(&staged.remote_path(), source, artifact.size)
            .await
            .map_err(|e| GokError::transfer(&artifact.name, e))?;

        Ok(UploadReport {
            staged,
            transferred,
            duration: start.elapsed(),
        })
    }
}
