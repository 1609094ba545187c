//! Command handlers.
//!
//! Each handler works against an initialized `AuthManager`; the session has
//! already been restored from the store by the time it runs.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use bookshelf_core::{
    AuthManager, Config, Credentials, DownloadOutcome, Downloader, ResourceFetcher, SessionState,
};
use tracing::warn;

use crate::terminal::{FileViewer, TerminalNavigator, TerminalNotifier};

/// Environment variables that pre-fill the login prompts
const EMAIL_ENV: &str = "BOOKSHELF_EMAIL";
const PASSWORD_ENV: &str = "BOOKSHELF_PASSWORD";

pub async fn login(
    manager: &AuthManager,
    config: &mut Config,
    email: Option<String>,
) -> Result<ExitCode> {
    let email = match email.or_else(|| std::env::var(EMAIL_ENV).ok()) {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    match manager.login(&Credentials::new(email.clone(), password)).await {
        Ok(_) => {
            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ {}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match last_email {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

pub async fn logout(manager: &AuthManager) -> Result<ExitCode> {
    manager.logout().await;
    println!("Logged out.");
    Ok(ExitCode::SUCCESS)
}

pub fn whoami(manager: &AuthManager) -> Result<ExitCode> {
    match manager.current_session() {
        SessionState::Authenticated(session) => {
            let identity = session.identity();
            match identity.email.as_deref() {
                Some(email) if !identity.name.is_empty() => println!("{} <{}>", identity.name, email),
                _ => println!("{}", session.display_name()),
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            println!("Not logged in.");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn download(
    manager: Arc<AuthManager>,
    fetcher: Arc<dyn ResourceFetcher>,
    config: &Config,
    id: &str,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let viewer = Arc::new(FileViewer::new(id, output));
    let downloader = Downloader::new(
        manager,
        fetcher,
        Arc::new(TerminalNotifier),
        Arc::new(TerminalNavigator),
        viewer.clone(),
    )
    .with_retention(config.release_delay());

    match downloader.download(id).await {
        DownloadOutcome::Opened { .. } => match viewer.saved_path() {
            Some(path) => {
                println!("Saved to {}", path.display());
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("✗ Downloaded book could not be written");
                Ok(ExitCode::FAILURE)
            }
        },
        DownloadOutcome::Redirected(_) => Ok(ExitCode::FAILURE),
        DownloadOutcome::Failed(e) => {
            eprintln!("✗ Download failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
