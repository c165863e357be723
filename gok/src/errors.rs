//! Error types for gok

use thiserror::Error;

/// Main error type for gok
///
/// The stage variants (`Build` through `Stream`) identify which step of a
/// hot-swap deployment failed.
#[derive(Error, Debug)]
pub enum GokError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("build failed: {0}")]
    Build(String),

    #[error(
        "binary {name} not installed; verify this is a main-package directory \
         (do the .go files here declare “package main”?)"
    )]
    ArtifactMissing { name: String },

    #[error("uploading temporary binary {artifact}: {source}")]
    Transfer {
        artifact: String,
        #[source]
        source: Box<GokError>,
    },

    #[error("diverting {path}: {source}")]
    Diversion {
        path: String,
        #[source]
        source: Box<GokError>,
    },

    #[error("streaming logs of {service}: {source}")]
    Stream {
        service: String,
        #[source]
        source: Box<GokError>,
    },

    #[error("checking target features: {source}")]
    Connect {
        #[source]
        source: Box<GokError>,
    },

    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("truncated transfer: sent {sent} of {expected} bytes")]
    TruncatedTransfer { sent: u64, expected: u64 },

    #[error("{stream} connection closed by instance")]
    StreamClosed { stream: &'static str },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("cancelled")]
    Cancelled,
}

impl GokError {
    pub fn transfer(artifact: impl Into<String>, source: GokError) -> Self {
        GokError::Transfer {
            artifact: artifact.into(),
            source: Box::new(source),
        }
    }

    pub fn diversion(path: impl Into<String>, source: GokError) -> Self {
        GokError::Diversion {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn stream(service: impl Into<String>, source: GokError) -> Self {
        GokError::Stream {
            service: service.into(),
            source: Box::new(source),
        }
    }

    /// Short name of the deployment stage an error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            GokError::Build(_) => "build",
            GokError::ArtifactMissing { .. } => "artifact",
            GokError::Transfer { .. } => "upload",
            GokError::Diversion { .. } => "divert",
            GokError::Stream { .. } => "logs",
            GokError::ConfigError(_) => "config",
            GokError::Connect { .. } => "connect",
            GokError::HttpStatus { .. } => "http",
            GokError::TruncatedTransfer { .. } => "upload",
            GokError::StreamClosed { .. } => "logs",
            GokError::Usage(_) => "usage",
            GokError::Cancelled => "cancelled",
            GokError::IoError(_) | GokError::JsonError(_) | GokError::HttpError(_) => "internal",
        }
    }
}
