//! Command-line interface
//!
//! Every option is optional so that values from the settings file can fill the
//! gaps; see [`crate::config::ServerConfig::resolve`] for precedence.

use clap::Parser;
use std::path::PathBuf;

/// fzweb CLI
#[derive(Parser, Debug, Default)]
#[command(name = "fzweb")]
#[command(about = "Fuzzy-search filenames under a directory and download them over HTTP", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Directory to search (defaults to the current directory)
    #[arg(short = 'd', long = "dir", env = "FZWEB_DIR")]
    pub dir: Option<PathBuf>,

    /// Address to bind (default 127.0.0.1)
    #[arg(long, env = "FZWEB_HOST")]
    pub host: Option<String>,

    /// Port to listen on (default 8080)
    #[arg(short = 'p', long, env = "FZWEB_PORT")]
    pub port: Option<u16>,

    /// Maximum files visited per search (default 5000)
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Maximum candidates handed to the matcher (default 10000)
    #[arg(long)]
    pub max_candidates: Option<usize>,

    /// Maximum results returned per search (default 10000)
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Search deadline in seconds, 0 disables it (default 30)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Only allow search and download roots inside --dir
    #[arg(long)]
    pub confine_roots: bool,

    /// Skip unreadable entries instead of failing the search
    #[arg(long)]
    pub skip_unreadable: bool,

    /// Return best matches first instead of filesystem order
    #[arg(long)]
    pub sort: bool,

    /// Directory served under /static (default ./static)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Settings file (default <config dir>/fzweb/config.json)
    #[arg(long, env = "FZWEB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Log filter derived from the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
