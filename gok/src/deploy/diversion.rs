//! Points a production service at a staged binary

use tracing::info;

use crate::deploy::artifact::StagedUpload;
use crate::errors::GokError;
use crate::http::client::HttpClient;

pub struct DiversionController<'a> {
    client: &'a HttpClient,
}

impl<'a> DiversionController<'a> {
    pub fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }

    /// Make the service at `production_path` execute `staged_path` and
    /// restart it
    ///
    /// The instance keeps one diversion per production path, so repeating a
    /// call replaces the previous mapping. Nothing is rolled back on failure.
    pub async fn divert(&self, production_path: &str, staged_path: &str) -> Result<(), GokError> {
        info!("Diverting {} to {}", production_path, staged_path);
        self.client
            .divert(production_path, staged_path)
            .await
            .map_err(|e| GokError::diversion(production_path, e))
    }

    /// Divert the production path of `staged` to its staged copy
    pub async fn divert_staged(&self, staged: &StagedUpload) -> Result<(), GokError> {
        self.divert(&staged.production_path(), &staged.diversion_source())
            .await
    }
}
