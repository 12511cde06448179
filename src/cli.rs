use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Config files that can be opened for editing
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum ConfigFile {
    Watchlist,
    Site,
    Interval,
    Settings,
}

#[derive(Parser)]
#[command(name = "reelwatch")]
#[command(author, version, about = "Get notified when movies and shows on your watchlist are released", long_about = None)]
#[command(after_help = r#"Examples:
  reelwatch init                         Create the watchlist, site and interval files
  reelwatch add "The Matrix (1999)"      Add a title to the watchlist
  reelwatch site psarips                 Choose the feed site
  reelwatch check                        Check the feed once
  reelwatch                              Keep checking in the foreground

Quick Start:
  1. reelwatch init
  2. reelwatch add "Dune Part Two (2024)"
  3. reelwatch run
"#)]
pub struct Cli {
    /// Directory holding the watchlist and config files
    #[arg(long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Log cycle details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the feed now and every interval until stopped (default)
    Run {
        /// Do not read actions from stdin
        #[arg(long)]
        no_menu: bool,
    },

    /// Check the feed once and exit
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create missing config files (interactive unless --yes)
    Init {
        /// Site to select
        #[arg(long)]
        site: Option<String>,

        /// Update interval in minutes
        #[arg(long)]
        interval: Option<u64>,

        /// Skip all interactive prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Add a title to the watchlist
    #[command(after_help = r#"Examples:
  reelwatch add "The Matrix (1999)"
  reelwatch add "Dark"
"#)]
    Add {
        #[arg(value_name = "TITLE")]
        title: String,
    },

    /// Show the watchlist
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the selected site
    Site {
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Show or change the update interval
    Interval {
        #[arg(value_name = "MINUTES")]
        minutes: Option<u64>,
    },

    /// List known sites and their link templates
    Sites,

    /// Show the slug and candidate links for a title
    Normalize {
        #[arg(value_name = "TITLE")]
        title: String,

        /// Site to build links for (defaults to the selected site)
        #[arg(long)]
        site: Option<String>,
    },

    /// Open a config file in $EDITOR or the default application
    Open {
        #[arg(value_enum)]
        file: ConfigFile,
    },

    /// Configure notifications
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Show environment and config status
    Doctor,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum NotifyCommands {
    /// Set the notification target
    #[command(after_help = r#"Examples:
  reelwatch notify set --ntfy my-movies
  reelwatch notify set --command 'jq -r .title | xargs -0 notify-send'
  reelwatch notify set --console
"#)]
    Set {
        /// Print notifications in the terminal
        #[arg(long)]
        console: bool,

        /// ntfy topic
        #[arg(long)]
        ntfy: Option<String>,

        /// ntfy server (defaults to https://ntfy.sh)
        #[arg(long, requires = "ntfy")]
        ntfy_server: Option<String>,

        /// Gotify server URL
        #[arg(long, requires = "gotify_token")]
        gotify_server: Option<String>,

        /// Gotify application token
        #[arg(long, requires = "gotify_server")]
        gotify_token: Option<String>,

        /// Discord webhook URL
        #[arg(long)]
        discord: Option<String>,

        /// Shell command receiving the notification as JSON on stdin
        #[arg(long)]
        command: Option<String>,
    },

    /// Show the current target
    Show,

    /// Send a test notification
    Test,
}
