//! Log feed of an instance (server-sent events)

use reqwest::header::ACCEPT;
use reqwest::{Method, Response};

use crate::errors::GokError;
use crate::http::client::{check_status, HttpClient};

/// Which output of a service to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
        }
    }
}

/// Full path of a service: bare names live under `/user/`
pub fn service_path(service: &str) -> String {
    if service.starts_with('/') {
        service.to_string()
    } else {
        format!("/user/{}", service)
    }
}

impl HttpClient {
    /// Open the live log feed of `service`
    ///
    /// The returned response body is an event stream; feed its chunks
    /// through a [`LogLineDecoder`].
    pub async fn open_log_stream(&self, service: &str, stream: LogStream) -> Result<Response, GokError> {
        let mut url = self.url("log")?;
        url.query_pairs_mut()
            .append_pair("path", &service_path(service))
            .append_pair("stream", stream.as_str());

        let response = self
            .request_url(Method::GET, url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        check_status(response).await
    }
}

/// Incremental decoder for `data:` lines of an event stream
#[derive(Debug, Default)]
pub struct LogLineDecoder {
    buf: Vec<u8>,
}

impl LogLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the log lines it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(data) = line.strip_prefix("data:") {
                lines.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
        }
        lines
    }
}
