use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meeting-agent")]
#[command(about = "Turn meeting recordings into minutes and action items", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the backend base URL from the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Log in and show your dashboard
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show your profile and assigned tasks
    Dashboard,
    /// Upload a meeting recording for minutes and action items.
    /// Stored against your account when logged in, analyzed anonymously otherwise.
    Upload {
        /// Audio file to analyze
        file: PathBuf,
    },
    /// Print the effective configuration
    Config,
    /// Print version information
    Version,
}
