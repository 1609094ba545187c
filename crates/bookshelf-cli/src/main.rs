//! Bookshelf CLI - log in, log out and download books from a bookshelf server.
//!
//! The session is restored from the local store on every run, so a login
//! carries over to later invocations until `bookshelf logout` or the server
//! rejects the token.

mod app;
mod cli;
mod terminal;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use bookshelf_core::config::APP_NAME;
use bookshelf_core::{AuthManager, Config, SessionStore};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use terminal::TerminalNotifier;

/// Log file name inside the data directory's `logs` folder
const LOG_FILE: &str = "bookshelf.log";

/// Initialize the tracing subscriber for logging.
///
/// Stderr gets warnings (debug with `--verbose`); the log file gets whatever
/// `RUST_LOG` asks for, defaulting to info.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    let stderr_filter = EnvFilter::new(if verbose { "debug" } else { "warn" });
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let (file_layer, guard) = match dirs::data_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join(APP_NAME).join("logs"), LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);
    info!("Bookshelf starting");

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    info!("Bookshelf shutting down");
    code
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(url) = cli.api_url {
        config.override_api_url(url);
    }

    let store = if cli.ephemeral {
        SessionStore::in_memory()
    } else {
        config.session_store()?
    };
    let api = Arc::new(config.api_client()?);
    let manager = Arc::new(AuthManager::new(store, api.clone(), Arc::new(TerminalNotifier)));
    manager.initialize().await;

    match cli.command {
        Command::Login { email } => app::login(&manager, &mut config, email).await,
        Command::Logout => app::logout(&manager).await,
        Command::Whoami => app::whoami(&manager),
        Command::Download { id, output } => {
            app::download(manager, api, &config, &id, output).await
        }
    }
}
