//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};

/// Practice Journal server and admin tooling.
#[derive(Parser, Debug)]
#[command(name = "practice-journal-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Create a director account
    CreateDirector(CreateDirectorArgs),

    /// Create or refresh the director/student/parent test accounts
    SeedTestAccounts,

    /// Set a new password for an account
    ResetPassword(ResetPasswordArgs),
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct CreateDirectorArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    /// Falls back to the PJ_DIRECTOR_PASSWORD environment variable
    #[arg(long, env = "PJ_DIRECTOR_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, default_value = "School")]
    pub first_name: String,

    #[arg(long, default_value = "Director")]
    pub last_name: String,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct ResetPasswordArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long, env = "PJ_NEW_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl Cli {
    /// The subcommand to run, `serve` when none was given
    pub fn command(self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}
