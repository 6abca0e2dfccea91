//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::remote::RemoteKind;

pub mod commands;

/// codesync - watch source files, keep per-file changelogs, mirror to a remote store
#[derive(Parser, Debug)]
#[command(name = "codesync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.codesync/config.json)
    #[arg(long, global = true, env = "CODESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging (same as -vv)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start watching and syncing (runs until Ctrl+C or SIGTERM)
    Start(StartArgs),

    /// Show the changelog of a watched file
    History {
        /// File name relative to the watched directory
        file: String,

        /// Show only the newest N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Changelog directory
        #[arg(long, env = "CODESYNC_CHANGELOG_DIR")]
        changelog_dir: Option<PathBuf>,
    },

    /// List changelogs and whether a sync process is running
    Status {
        /// Changelog directory
        #[arg(long, env = "CODESYNC_CHANGELOG_DIR")]
        changelog_dir: Option<PathBuf>,

        /// PID marker file
        #[arg(long)]
        pid_file: Option<PathBuf>,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Directory to watch (default: current directory)
    #[arg(short, long, env = "CODESYNC_DIR")]
    pub dir: Option<PathBuf>,

    /// Remote folder name (default: CodeSync)
    #[arg(long)]
    pub folder_name: Option<String>,

    /// Comma-separated file extensions to watch (default: .py)
    #[arg(long)]
    pub file_types: Option<String>,

    /// Seconds between scans (default: 120)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Changelog directory (default: changelogs)
    #[arg(long, env = "CODESYNC_CHANGELOG_DIR")]
    pub changelog_dir: Option<PathBuf>,

    /// Also watch files in subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// PID marker file (default: sync.pid)
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Remote store kind
    #[arg(long, value_enum)]
    pub remote: Option<RemoteKind>,

    /// Endpoint of the HTTP store
    #[arg(long, env = "CODESYNC_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Bearer token for the HTTP store
    #[arg(long, env = "CODESYNC_REMOTE_TOKEN", hide_env_values = true)]
    pub remote_token: Option<String>,

    /// Root directory of the local mirror (default: ~/.codesync/mirror)
    #[arg(long)]
    pub mirror_dir: Option<PathBuf>,

    /// Run a single scan cycle and exit
    #[arg(long)]
    pub once: bool,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
