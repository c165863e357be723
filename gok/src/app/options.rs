//! Run configuration
//!
//! Everything a run needs is collected into these values once, at startup,
//! and passed down explicitly.

use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use crate::storage::layout::InstanceLayout;

/// How the update endpoint of the instance is determined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Use the hostname, ports and password from the instance config
    #[default]
    Yes,

    /// Send updates to this base URL; userinfo in the URL overrides the
    /// configured credentials
    Url(Url),
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "yes" => Ok(UpdateMode::Yes),
            other => Url::parse(other)
                .map(UpdateMode::Url)
                .map_err(|e| format!("invalid update target {:?}: {}", other, e)),
        }
    }
}

/// Options for one hot-swap deployment
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory containing the program to build
    pub build_dir: PathBuf,

    /// Keep the built binary after the run
    pub keep: bool,

    /// Which instance to deploy to
    pub layout: InstanceLayout,

    /// Update endpoint selection
    pub update: UpdateMode,
}

impl RunOptions {
    pub fn new(build_dir: impl Into<PathBuf>, layout: InstanceLayout) -> Self {
        Self {
            build_dir: build_dir.into(),
            keep: false,
            layout,
            update: UpdateMode::Yes,
        }
    }
}

/// Options for following a service's logs
#[derive(Debug, Clone)]
pub struct LogsOptions {
    /// Service name (`scan2drive`) or full path (`/user/scan2drive`)
    pub service: String,

    /// Which instance to read from
    pub layout: InstanceLayout,

    /// Update endpoint selection
    pub update: UpdateMode,
}
