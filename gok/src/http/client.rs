//! HTTP client implementation

use std::time::Duration;

use reqwest::{Certificate, Client, Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use tracing::debug;
use url::Url;

use crate::app::options::UpdateMode;
use crate::errors::GokError;
use crate::http::endpoint::Endpoint;
use crate::storage::layout::InstanceLayout;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated HTTP client scoped to one instance
///
/// No overall request timeout is set: uploads of large binaries and log
/// streams legitimately stay open for a long time.
pub struct HttpClient {
    client: Client,
    endpoint: Endpoint,
}

impl HttpClient {
    /// Create a new HTTP client for `endpoint`
    pub async fn new(endpoint: Endpoint) -> Result<Self, GokError> {
        let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);

        if let Some(path) = &endpoint.root_cert {
            let pem = tokio::fs::read(path).await?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// Create a client for the instance selected by `layout`
    pub async fn for_instance(layout: &InstanceLayout, update: &UpdateMode) -> Result<Self, GokError> {
        let endpoint = Endpoint::for_instance(layout, update).await?;
        Self::new(endpoint).await
    }

    /// Resolve `path` against the base URL
    pub fn url(&self, path: &str) -> Result<Url, GokError> {
        self.endpoint
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GokError::ConfigError(format!("invalid request path {:?}: {}", path, e)))
    }

    /// Start an authenticated request
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GokError> {
        let url = self.url(path)?;
        Ok(self.request_url(method, url))
    }

    /// Start an authenticated request to an already resolved URL
    pub fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);

        self.client.request(method, url).basic_auth(
            &self.endpoint.username,
            self.endpoint.password.as_ref().map(|p| p.expose_secret()),
        )
    }
}

/// Turn a non-success response into [`GokError::HttpStatus`] carrying its body
pub(crate) async fn check_status(response: Response) -> Result<Response, GokError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!("HTTP request failed: {} - {}", status, body.trim());
    Err(GokError::HttpStatus {
        status,
        body: body.trim().to_string(),
    })
}
