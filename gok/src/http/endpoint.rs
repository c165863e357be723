//! Instance endpoint resolution

use std::path::PathBuf;

use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::app::options::UpdateMode;
use crate::errors::GokError;
use crate::storage::layout::InstanceLayout;
use crate::storage::settings::InstanceConfig;

/// User name the instance's HTTP server expects
pub const DEFAULT_USERNAME: &str = "gokrazy";

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HTTPS_PORT: u16 = 443;

/// Base URL and credentials of one instance
#[derive(Debug)]
pub struct Endpoint {
    /// Always ends in `/`, carries no userinfo
    pub base_url: Url,
    pub username: String,
    pub password: Option<SecretString>,
    /// Extra root certificate for instances with self-signed TLS
    pub root_cert: Option<PathBuf>,
}

impl Endpoint {
    /// Resolve the endpoint of the instance selected by `layout`
    pub async fn for_instance(layout: &InstanceLayout, update: &UpdateMode) -> Result<Self, GokError> {
        let config = match update {
            UpdateMode::Yes => InstanceConfig::load(layout).await?,
            // An explicit URL is enough to reach the instance.
            UpdateMode::Url(_) => InstanceConfig::load(layout).await.unwrap_or_default(),
        };

        let fallback_password = if config.update.http_password.trim().is_empty() {
            match InstanceLayout::password_file() {
                Some(file) if file.exists().await => Some(file.read_string().await?),
                _ => None,
            }
        } else {
            None
        };

        let mut endpoint = Self::resolve(&config, update, fallback_password)?;

        if endpoint.base_url.scheme() == "https" {
            let cert = layout.instance_dir().join("cert.pem");
            if tokio::fs::metadata(&cert).await.is_ok() {
                debug!("trusting instance certificate {}", cert.display());
                endpoint.root_cert = Some(cert);
            }
        }

        debug!("instance {} reachable at {}", layout.instance, endpoint.base_url);
        Ok(endpoint)
    }

    /// Resolve an endpoint from an already loaded config
    pub fn resolve(
        config: &InstanceConfig,
        update: &UpdateMode,
        fallback_password: Option<String>,
    ) -> Result<Self, GokError> {
        let configured_password = Some(config.update.http_password.trim().to_string())
            .filter(|p| !p.is_empty())
            .or_else(|| {
                fallback_password
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
            });

        let (base_url, username, password) = match update {
            UpdateMode::Yes => {
                let host = config.update_hostname();
                if host.is_empty() {
                    return Err(GokError::ConfigError(
                        "instance config has no Hostname".to_string(),
                    ));
                }
                let (scheme, port, default_port) = if config.update.tls_enabled() {
                    ("https", &config.update.https_port, DEFAULT_HTTPS_PORT)
                } else {
                    ("http", &config.update.http_port, DEFAULT_HTTP_PORT)
                };
                let port = parse_port(port, default_port)?;
                let url = Url::parse(&format!("{}://{}:{}/", scheme, host, port))
                    .map_err(|e| GokError::ConfigError(format!("invalid hostname {:?}: {}", host, e)))?;
                (url, DEFAULT_USERNAME.to_string(), configured_password)
            }
            UpdateMode::Url(url) => {
                let mut url = url.clone();
                let username = match url.username() {
                    "" => DEFAULT_USERNAME.to_string(),
                    user => user.to_string(),
                };
                let password = url.password().map(str::to_string).or(configured_password);
                // Credentials travel as basic auth, not inside the URL.
                let _ = url.set_username("");
                let _ = url.set_password(None);
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                (url, username, password)
            }
        };

        Ok(Self {
            base_url,
            username,
            password: password.map(SecretString::from),
            root_cert: None,
        })
    }
}

fn parse_port(value: &str, default: u16) -> Result<u16, GokError> {
    if value.is_empty() {
        return Ok(default);
    }
    value
        .parse()
        .map_err(|_| GokError::ConfigError(format!("invalid port {:?}", value)))
}
