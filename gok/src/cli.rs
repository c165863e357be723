//! Command-line surface

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::app::options::{LogsOptions, RunOptions, UpdateMode};
use crate::errors::GokError;
use crate::logs::{LogFormat, LogLevel};
use crate::storage::layout::{InstanceLayout, DEFAULT_INSTANCE};

/// gok - manage gokrazy instances
#[derive(Parser, Debug)]
#[command(name = "gok")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Instance, identified by hostname
    #[arg(short, long, global = true, env = "GOKRAZY_INSTANCE", default_value = DEFAULT_INSTANCE)]
    pub instance: String,

    /// Directory holding one subdirectory per instance (default: ~/gokrazy)
    #[arg(long, global = true, env = "GOKRAZY_PARENT_DIR")]
    pub parent_dir: Option<PathBuf>,

    /// Diagnostic log level; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: LogLevel,

    /// Diagnostic log format: text or json
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the program in the current directory and run it on a running instance
    ///
    /// The binary is stored in RAM of the instance and replaces the program's
    /// usual binary until the next reboot, without a full update.
    ///
    /// Example:
    ///   % cd ~/go/src/github.com/stapelberg/scan2drive/cmd/scan2drive
    ///   % gok -i scan2drive run
    Run(RunArgs),

    /// Stream the logs of a service
    Logs(LogsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Keep the temporary binary
    #[arg(short, long)]
    pub keep: bool,

    /// Update target: "yes" to use the instance config, or a base URL
    #[arg(long, default_value = "yes")]
    pub update: UpdateMode,

    #[arg(hide = true)]
    pub positional: Vec<String>,
}

impl RunArgs {
    /// `run` builds the current directory and takes no positional arguments
    pub fn validate(&self) -> Result<(), GokError> {
        if !self.positional.is_empty() {
            return Err(GokError::Usage(format!(
                "positional arguments are not supported (got {:?})",
                self.positional
            )));
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Service to follow, e.g. scan2drive or /user/scan2drive
    #[arg(short, long)]
    pub service: String,

    /// Update target: "yes" to use the instance config, or a base URL
    #[arg(long, default_value = "yes")]
    pub update: UpdateMode,
}

impl Cli {
    /// Help text of `run`, printed to stderr after a usage error
    pub fn run_help() -> String {
        let mut cmd = Cli::command();
        cmd.find_subcommand_mut("run")
            .map(|run| run.render_help().to_string())
            .unwrap_or_default()
    }

    pub fn layout(&self) -> InstanceLayout {
        let parent_dir = self
            .parent_dir
            .clone()
            .unwrap_or_else(InstanceLayout::default_parent_dir);
        InstanceLayout::new(parent_dir, &self.instance)
    }

    /// Options for `run`, building `build_dir`
    pub fn run_options(&self, args: &RunArgs, build_dir: PathBuf) -> Result<RunOptions, GokError> {
        args.validate()?;
        Ok(RunOptions {
            build_dir,
            keep: args.keep,
            layout: self.layout(),
            update: args.update.clone(),
        })
    }

    pub fn logs_options(&self, args: &LogsArgs) -> LogsOptions {
        LogsOptions {
            service: args.service.clone(),
            layout: self.layout(),
            update: args.update.clone(),
        }
    }
}
