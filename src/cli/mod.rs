//! Terminal front-end driving `AppController`.

use anyhow::{bail, Context, Result};
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::app::{AppController, AppView};
use crate::config::Config;
use crate::error::{ClientError, UPLOAD_FAILED_MESSAGE};
use crate::presenter::PROCESSING_TEXT;
use crate::upload::{AudioFile, UploadMode, UploadPhase};

pub mod args;

pub use args::{Cli, CliCommand};

const NOT_LOGGED_IN: &str = "Not logged in. Run `meeting-agent login` to sign in.";

pub async fn handle_login_command(
    controller: &AppController,
    username: Option<String>,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => Input::<String>::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    match controller.login(username.trim(), &password).await {
        Ok(dashboard) => {
            print!("{}", dashboard);
            Ok(())
        }
        Err(ClientError::AuthExpired) => bail!(NOT_LOGGED_IN),
        Err(e) => bail!("{}", e),
    }
}

pub async fn handle_logout_command(controller: &AppController) -> Result<()> {
    if controller.logout().await {
        println!("Logged out.");
    } else {
        println!("Already logged out.");
    }
    Ok(())
}

pub async fn handle_dashboard_command(controller: &AppController) -> Result<()> {
    if controller.current_view().await.is_login() {
        println!("{}", NOT_LOGGED_IN);
        return Ok(());
    }

    match controller.load_dashboard().await {
        Ok(dashboard) => print!("{}", dashboard),
        Err(e) => {
            // A rejected session has already been cleared; the login prompt is the signal
            debug!("Dashboard unavailable: {}", e.kind());
            println!("{}", NOT_LOGGED_IN);
        }
    }
    Ok(())
}

pub async fn handle_upload_command(controller: Arc<AppController>, file: &Path) -> Result<()> {
    let audio = AudioFile::from_path(file).await?;

    let mode = controller.active_upload_mode().await;
    if mode == UploadMode::Anonymous {
        eprintln!("Not logged in: analyzing anonymously, results will not be saved.");
    }

    controller.select_file(audio).await?;

    let spinner = create_spinner();
    let outcome = controller.submit_upload().await;
    spinner.finish_and_clear();

    let view = outcome?;
    if view.phase == UploadPhase::Failed {
        bail!("{}", view.message.as_deref().unwrap_or(UPLOAD_FAILED_MESSAGE));
    }
    print!("{}", view);

    if let AppView::Dashboard(screen) = controller.current_view().await {
        if screen.ready && mode == UploadMode::Session {
            println!();
            print!("{}", screen.dashboard);
        }
    }

    Ok(())
}

pub fn handle_config_command(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    print!("{}", rendered);
    Ok(())
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(PROCESSING_TEXT);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
