use anyhow::Result;
use clap::Parser;
use meeting_agent::{
    app::AppController,
    cli::{
        handle_config_command, handle_dashboard_command, handle_login_command,
        handle_logout_command, handle_upload_command, Cli, CliCommand,
    },
    config::Config,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let CliCommand::Version = cli.command {
        println!("meeting-agent {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }

    if let CliCommand::Config = cli.command {
        return handle_config_command(&config);
    }

    let controller = Arc::new(AppController::from_config(&config)?);

    match cli.command {
        CliCommand::Login { username } => handle_login_command(&controller, username).await,
        CliCommand::Logout => handle_logout_command(&controller).await,
        CliCommand::Dashboard => handle_dashboard_command(&controller).await,
        CliCommand::Upload { file } => handle_upload_command(controller, &file).await,
        CliCommand::Config | CliCommand::Version => Ok(()),
    }
}
