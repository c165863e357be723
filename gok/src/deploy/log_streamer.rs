//! Relays a service's live logs to the operator

use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::GokError;
use crate::http::client::HttpClient;
use crate::http::logs::{service_path, LogLineDecoder, LogStream};

pub struct LogStreamer<'a> {
    client: &'a HttpClient,
}

impl<'a> LogStreamer<'a> {
    pub fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }

    /// Follow stdout and stderr of `service` until `cancel` fires
    ///
    /// Cancellation is the normal way out and returns `Ok(())`. A feed that
    /// fails or ends on the instance's side is a [`GokError::Stream`].
    pub async fn stream<O, E>(
        &self,
        service: &str,
        stdout: &mut O,
        stderr: &mut E,
        cancel: &CancellationToken,
    ) -> Result<(), GokError>
    where
        O: AsyncWrite + Unpin + Send,
        E: AsyncWrite + Unpin + Send,
    {
        info!("Streaming logs of {}", service_path(service));

        let relays = futures::future::try_join(
            self.relay(service, LogStream::Stdout, stdout),
            self.relay(service, LogStream::Stderr, stderr),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("log streaming cancelled");
                Ok(())
            }
            result = relays => {
                let source = match result {
                    Err(e) => e,
                    Ok(_) => GokError::StreamClosed { stream: "log" },
                };
                Err(GokError::stream(service, source))
            }
        }
    }

    /// Copy one feed into `sink` line by line; only returns on failure or
    /// when the feed ends
    async fn relay<W>(&self, service: &str, which: LogStream, sink: &mut W) -> Result<(), GokError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let response = self.client.open_log_stream(service, which).await?;

        let mut body = response.bytes_stream();
        let mut decoder = LogLineDecoder::new();

        while let Some(chunk) = body.next().await {
            for line in decoder.push(&chunk?) {
                sink.write_all(line.as_bytes()).await?;
                sink.write_all(b"\n").await?;
            }
            sink.flush().await?;
        }

        Err(GokError::StreamClosed {
            stream: which.as_str(),
        })
    }
}
