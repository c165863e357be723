//! Update API of an instance: feature probing, staging uploads, diversions

use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Method, StatusCode};
use tracing::debug;

use crate::errors::GokError;
use crate::http::client::{check_status, HttpClient};

impl HttpClient {
    /// Features advertised by the instance's update API
    ///
    /// Instances that predate feature negotiation answer 404, which is
    /// treated as an empty feature list.
    pub async fn features(&self) -> Result<Vec<String>, GokError> {
        let connect_error = |source: GokError| GokError::Connect {
            source: Box::new(source),
        };

        let response = self
            .request(Method::GET, "update/features")?
            .send()
            .await
            .map_err(|e| connect_error(e.into()))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("target does not advertise features");
            return Ok(Vec::new());
        }

        let response = check_status(response).await.map_err(connect_error)?;
        let body = response.text().await?;
        Ok(parse_features(&body))
    }

    /// Upload `body` to `dest` on the instance
    pub async fn put(&self, dest: &str, body: Body) -> Result<(), GokError> {
        let response = self
            .request(Method::PUT, dest)?
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Make the service at `path` execute the staged `diversion` and
    /// restart it
    pub async fn divert(&self, path: &str, diversion: &str) -> Result<(), GokError> {
        let response = self
            .request(Method::POST, "divert")?
            .form(&[("path", path), ("diversion", diversion)])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

fn parse_features(body: &str) -> Vec<String> {
    body.trim()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
