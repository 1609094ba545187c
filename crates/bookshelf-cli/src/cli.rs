//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Log in and download books from a bookshelf server")]
pub struct Cli {
    /// Override the API server URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login {
        /// Account email (prompted for if omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Download a book by id
    Download {
        id: String,
        /// Where to write the file (defaults to `<id>.<ext>` in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
