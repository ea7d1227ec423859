use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nfchecker", about = "Netflix cookie checker & session enricher")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check pasted or file-based cookie blocks
    Check {
        /// Cookie text (blocks separated by blank lines / ===== / -----)
        #[arg(short, long)]
        text: Option<String>,

        /// Read cookie blocks from file(s); repeatable
        #[arg(short, long)]
        file: Vec<String>,

        /// Input dialect: auto, netscape or json
        #[arg(long, default_value = "auto")]
        format: String,

        /// Submit as a background job and poll progress instead of
        /// waiting silently
        #[arg(long)]
        progress: bool,
    },
    /// Show a stored check job by id
    Job {
        id: String,

        /// Only print the counters, not the full result list
        #[arg(long)]
        summary: bool,
    },
    /// List past check jobs, newest first
    History {
        /// Max jobs shown
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Valid-cookie log administration
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
    /// Free-cookie pool administration
    Pool {
        #[command(subcommand)]
        action: PoolAction,
    },
    /// Run the liveness refresh loop until Ctrl+C
    Watch,
    /// Submit a TV sign-in code using a pooled cookie
    TvCode {
        /// Pool entry id
        #[arg(long)]
        cookie_id: String,

        /// Code shown on the TV screen
        #[arg(long)]
        code: String,
    },
}

#[derive(Subcommand)]
pub enum LogsAction {
    /// List logged valid checks, newest first
    List {
        /// Max entries shown
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Delete one log entry
    Delete { id: String },
    /// Delete every log entry
    Clear,
}

#[derive(Subcommand)]
pub enum PoolAction {
    /// Validate a cookie and add it to the pool
    Add {
        /// Cookie text
        #[arg(short, long)]
        text: Option<String>,

        /// Read cookie text from a file
        #[arg(short, long)]
        file: Option<String>,

        /// Input dialect: auto, netscape or json
        #[arg(long, default_value = "auto")]
        format: String,
    },
    /// List pool entries. The default view is capped by the display limit
    /// and strips cookie strings; --all shows everything.
    List {
        #[arg(long)]
        all: bool,
    },
    /// Remove a pool entry
    Remove { id: String },
    /// Set how many entries the capped listing shows
    Limit { count: usize },
    /// Run one refresh cycle now and report counts
    Refresh,
}
