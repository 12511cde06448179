//! reelwatch - get notified when watchlist titles show up on a release feed

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelwatch::cli::{Cli, Commands, NotifyCommands};
use reelwatch::config::Paths;
use reelwatch::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint);
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "reelwatch=info" } else { "reelwatch=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(cli.dir)?;

    match cli.command.unwrap_or(Commands::Run { no_menu: false }) {
        // Checking
        Commands::Run { no_menu } => commands::cmd_run(&paths, no_menu),
        Commands::Check { json } => commands::cmd_check(&paths, json),

        // Watchlist and site
        Commands::Init { site, interval, yes } => commands::cmd_init(&paths, site, interval, yes),
        Commands::Add { title } => commands::cmd_add(&paths, &title),
        Commands::List { json } => commands::cmd_list(&paths, json),
        Commands::Site { id } => commands::cmd_site(&paths, id),
        Commands::Interval { minutes } => commands::cmd_interval(&paths, minutes),
        Commands::Sites => commands::cmd_sites(&paths),
        Commands::Normalize { title, site } => commands::cmd_normalize(&paths, &title, site),
        Commands::Open { file } => commands::cmd_open(&paths, file),

        // Notifications
        Commands::Notify(NotifyCommands::Set {
            console,
            ntfy,
            ntfy_server,
            gotify_server,
            gotify_token,
            discord,
            command,
        }) => commands::cmd_notify_set(
            &paths, console, ntfy, ntfy_server, gotify_server, gotify_token, discord, command,
        ),
        Commands::Notify(NotifyCommands::Show) => commands::cmd_notify_show(&paths),
        Commands::Notify(NotifyCommands::Test) => commands::cmd_notify_test(&paths),

        // Miscellaneous
        Commands::Doctor => commands::cmd_doctor(&paths),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
