//! Instance directory layout

use std::path::PathBuf;

use crate::filesys::file::File;

/// Instance used when none is selected
pub const DEFAULT_INSTANCE: &str = "hello";

/// Where an instance's configuration lives on the operator's machine
///
/// Each instance has its own directory below the parent directory
/// (`~/gokrazy/<instance>/config.json` by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    /// Directory containing one subdirectory per instance
    pub parent_dir: PathBuf,

    /// Selected instance name
    pub instance: String,
}

impl InstanceLayout {
    /// Create a new instance layout
    pub fn new(parent_dir: impl Into<PathBuf>, instance: impl Into<String>) -> Self {
        Self {
            parent_dir: parent_dir.into(),
            instance: instance.into(),
        }
    }

    /// Get the instance directory
    pub fn instance_dir(&self) -> PathBuf {
        self.parent_dir.join(&self.instance)
    }

    /// Get the instance config file
    pub fn config_file(&self) -> File {
        File::new(self.instance_dir().join("config.json"))
    }

    /// Default parent directory (`~/gokrazy`)
    pub fn default_parent_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gokrazy")
    }

    /// Shared HTTP password file used when the instance config has none
    pub fn password_file() -> Option<File> {
        dirs::config_dir().map(|dir| File::new(dir.join("gokrazy").join("http-password.txt")))
    }
}

impl Default for InstanceLayout {
    fn default() -> Self {
        Self::new(Self::default_parent_dir(), DEFAULT_INSTANCE)
    }
}
