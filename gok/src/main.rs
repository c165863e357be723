//! gok - Entry Point

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use gok::app::run::Orchestrator;
use gok::app::tail;
use gok::cli::{Cli, Commands};
use gok::deploy::builder::GoBuilder;
use gok::errors::GokError;
use gok::logs::{init_logging, LogOptions};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_options = LogOptions {
        log_level: cli.log_level,
        log_format: cli.log_format,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();

    let result = match &cli.command {
        Commands::Run(args) => {
            let build_dir = match std::env::current_dir() {
                Ok(dir) => dir,
                Err(e) => return report(GokError::from(e)),
            };
            match cli.run_options(args, build_dir) {
                Ok(options) => {
                    Orchestrator::new(GoBuilder::default(), options)
                        .deploy(&cancel, &mut stdout, &mut stderr)
                        .await
                }
                Err(e) => Err(e),
            }
        }
        Commands::Logs(args) => {
            let options = cli.logs_options(args);
            tail::follow(&options, &cancel, &mut stdout, &mut stderr).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(err: GokError) -> ExitCode {
    if let GokError::Usage(_) = err {
        eprintln!("{err}\n\n{}", Cli::run_help());
        return ExitCode::from(2);
    }
    eprintln!("Error ({}): {}", err.stage(), err);
    ExitCode::FAILURE
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        use tracing::error;
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
    }

    cancel.cancel();
}
