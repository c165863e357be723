//! `gok logs`: follow a service's logs without deploying

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::app::options::LogsOptions;
use crate::deploy::log_streamer::LogStreamer;
use crate::errors::GokError;
use crate::http::client::HttpClient;

pub async fn follow<O, E>(
    options: &LogsOptions,
    cancel: &CancellationToken,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<(), GokError>
where
    O: AsyncWrite + Unpin + Send,
    E: AsyncWrite + Unpin + Send,
{
    let client = HttpClient::for_instance(&options.layout, &options.update).await?;
    LogStreamer::new(&client)
        .stream(&options.service, stdout, stderr, cancel)
        .await
}
