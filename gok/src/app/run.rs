//! `gok run`: build, hot-swap and follow a program on a running instance

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::options::RunOptions;
use crate::deploy::artifact::{artifact_name, BuildArtifact};
use crate::deploy::builder::Builder;
use crate::deploy::diversion::DiversionController;
use crate::deploy::log_streamer::LogStreamer;
use crate::deploy::uploader::Uploader;
use crate::errors::GokError;
use crate::filesys::workspace::Workspace;
use crate::http::client::HttpClient;
use crate::progress::ProgressSession;
use crate::utils::transfer_summary;

/// Sequences one hot-swap deployment
///
/// Every step is a hard sequence point: a failure aborts the run without
/// attempting later steps, and the workspace is released on every path.
pub struct Orchestrator<B> {
    builder: B,
    options: RunOptions,
}

impl<B: Builder> Orchestrator<B> {
    pub fn new(builder: B, options: RunOptions) -> Self {
        Self { builder, options }
    }

    /// Build, upload, divert, then follow the service's logs
    ///
    /// `cancel` aborts the run up to the diversion. Once the instance has
    /// been told to divert, cancelling only ends log streaming; the
    /// diversion stays in place.
    pub async fn deploy<O, E>(
        &self,
        cancel: &CancellationToken,
        stdout: &mut O,
        stderr: &mut E,
    ) -> Result<(), GokError>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        let build_dir = &self.options.build_dir;
        let name = artifact_name(build_dir).await?;
        info!("basename: {:?}", name);

        let workspace = Workspace::acquire(self.options.keep)?;
        workspace.clear_artifact(&name).await?;

        until_cancelled(cancel, self.builder.build(build_dir, workspace.path())).await?;
        let artifact = BuildArtifact::locate(&workspace, &name).await?;
        debug!("built {} ({} bytes)", artifact.path().display(), artifact.size);

        let client = until_cancelled(
            cancel,
            HttpClient::for_instance(&self.options.layout, &self.options.update),
        )
        .await?;
        let features = until_cancelled(cancel, client.features()).await?;
        debug!("target features: {:?}", features);

        // The reporter has stopped and ended its line once the upload
        // returns, so no progress output follows.
        let progress = Arc::new(ProgressSession::new());
        let uploader = Uploader::new(&client, progress.clone());
        let report = progress
            .while_reporting(
                cancel,
                &mut *stderr,
                until_cancelled(cancel, uploader.upload(&artifact)),
            )
            .await?;

        let summary = transfer_summary(&artifact.name, report.transferred, report.duration);
        stdout.write_all(format!("{}\n", summary).as_bytes()).await?;
        stdout.flush().await?;

        // Last point at which the run can be abandoned without touching the
        // instance's service configuration.
        if cancel.is_cancelled() {
            return Err(GokError::Cancelled);
        }
        DiversionController::new(&client)
            .divert_staged(&report.staged)
            .await?;

        LogStreamer::new(&client)
            .stream(&name, stdout, stderr, cancel)
            .await
    }
}

/// Run `fut` unless `cancel` fires first
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, GokError>
where
    F: Future<Output = Result<T, GokError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GokError::Cancelled),
        result = fut => result,
    }
}
