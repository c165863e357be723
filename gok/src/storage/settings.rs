//! Instance config file

use serde::Deserialize;

use crate::errors::GokError;
use crate::storage::layout::InstanceLayout;

/// The parts of an instance's `config.json` needed to reach it
///
/// Fields the deployment does not use (package lists, kernel settings and so
/// on) are ignored when deserializing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceConfig {
    /// Hostname of the instance
    #[serde(default)]
    pub hostname: String,

    /// Network update settings
    #[serde(default)]
    pub update: UpdateSettings,
}

/// Update endpoint settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettings {
    /// Overrides the instance hostname for updates
    #[serde(rename = "Hostname", default)]
    pub hostname: String,

    #[serde(rename = "HTTPPassword", default)]
    pub http_password: String,

    #[serde(rename = "HTTPPort", default)]
    pub http_port: String,

    #[serde(rename = "HTTPSPort", default)]
    pub https_port: String,

    /// `""` or `"off"` disables TLS; anything else (e.g. `"self-signed"`)
    /// enables it
    #[serde(rename = "UseTLS", default)]
    pub use_tls: String,
}

impl UpdateSettings {
    pub fn tls_enabled(&self) -> bool {
        !(self.use_tls.is_empty() || self.use_tls == "off")
    }
}

impl InstanceConfig {
    /// Read the config of the instance selected by `layout`
    pub async fn load(layout: &InstanceLayout) -> Result<Self, GokError> {
        let file = layout.config_file();
        if !file.exists().await {
            return Err(GokError::ConfigError(format!(
                "instance {} has no config at {}",
                layout.instance,
                file.path().display()
            )));
        }
        file.read_json::<InstanceConfig>().await.map_err(|e| {
            GokError::ConfigError(format!("reading {}: {}", file.path().display(), e))
        })
    }

    /// Hostname updates are sent to
    pub fn update_hostname(&self) -> &str {
        if self.update.hostname.is_empty() {
            &self.hostname
        } else {
            &self.update.hostname
        }
    }
}
