//! Miscellaneous commands: doctor, completions

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;

use reelwatch::cli::{Cli, CompletionShell};
use reelwatch::config::{ConfigStore, Paths};
use reelwatch::diagnostics::SystemInfo;
use reelwatch::error::Result;
use reelwatch::site::SiteRegistry;

use crate::utils::{describe_notify_target, format_minutes};

fn status(ok: bool) -> colored::ColoredString {
    if ok {
        "ok".green()
    } else {
        "problem".red()
    }
}

/// Check environment and config files
pub fn cmd_doctor(paths: &Paths) -> Result<()> {
    println!("\nreelwatch doctor\n");

    let info = SystemInfo::current();
    println!("  reelwatch: v{}", info.app_version);
    println!("  OS: {} {} ({})", info.os_name, info.os_version, info.arch);
    println!("  Data: {}\n", paths.root.display());

    let store = ConfigStore::new(paths.clone());

    let settings = match store.load_settings() {
        Ok(settings) => {
            println!("  config.toml: {}", status(true));
            settings
        }
        Err(e) => {
            println!("  config.toml: {} ({})", status(false), e);
            return Ok(());
        }
    };

    match SiteRegistry::with_extra(&settings.sites) {
        Ok(registry) => {
            println!("  sites: {} ({})", status(true), registry.ids().join(", "));
            match store.read_site() {
                Ok(id) if registry.get(&id).is_some() => println!("  site.txt: {} ({})", status(true), id),
                Ok(id) if id.is_empty() => println!("  site.txt: {} (no site selected)", status(false)),
                Ok(id) => println!("  site.txt: {} (unknown site '{}')", status(false), id),
                Err(e) => println!("  site.txt: {} ({})", status(false), e),
            }
        }
        Err(e) => println!("  sites: {} ({})", status(false), e),
    }

    match store.read_watchlist() {
        Ok(titles) if titles.is_empty() => println!("  watchlist.txt: {} (empty)", status(false)),
        Ok(titles) => println!("  watchlist.txt: {} ({} titles)", status(true), titles.len()),
        Err(e) => println!("  watchlist.txt: {} ({})", status(false), e),
    }

    match store.read_interval(settings.default_interval_minutes) {
        Ok(minutes) => println!("  interval.txt: {} (every {})", status(true), format_minutes(minutes)),
        Err(e) => println!("  interval.txt: {} ({})", status(false), e),
    }

    println!("\n  Fetch timeout: {}s", settings.fetch_timeout_secs);
    println!("  Notifications: {}", describe_notify_target(&settings.notify));
    if paths.error_log().exists() {
        println!("  Error log: {}", paths.error_log().display());
    }

    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "reelwatch", &mut io::stdout());
    Ok(())
}
