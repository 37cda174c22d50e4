//! Command-line interface.

use clap::{Parser, Subcommand};

/// FaceGate - Face-authentication gateway
/// Matches submitted photos against an enrolled gallery and grants
/// role-based sessions.
#[derive(Parser)]
#[command(name = "facegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web service (default)
    #[command(alias = "-s", alias = "--serve")]
    Serve,

    /// Create a default config file
    #[command(alias = "--init")]
    Init,

    /// Delete stale spooled uploads and exit
    Cleanup,
}
