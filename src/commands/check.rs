//! Check commands: run (foreground scheduler) and check (one cycle)

use chrono::Local;
use colored::Colorize;
use std::sync::mpsc;

use reelwatch::actions::{self, Action, MENU_HELP};
use reelwatch::config::{ConfigStore, NotifyTarget, Paths, Settings};
use reelwatch::error::{Result, WatchError};
use reelwatch::fetch::HttpFeedSource;
use reelwatch::notify::TargetNotifier;
use reelwatch::scheduler::{CycleOutcome, CycleReport, LoopEvent, Match, Scheduler};

use crate::utils::{format_minutes, print_report};

fn build_scheduler(
    paths: &Paths,
    quiet_console: bool,
) -> Result<Scheduler<HttpFeedSource, TargetNotifier>> {
    let store = ConfigStore::new(paths.clone());
    let settings = store.load_settings()?;

    let log = paths.notifications_log();
    let build = move |settings: &Settings| {
        let source = HttpFeedSource::from_settings(settings);
        let target = match settings.notify {
            NotifyTarget::Console if quiet_console => NotifyTarget::None,
            ref other => other.clone(),
        };
        (source, TargetNotifier::new(target).with_log(log.clone()))
    };

    let (source, notifier) = build(&settings);
    Ok(Scheduler::new(store, settings, source, notifier)?.with_rebuild(build))
}

/// Check the feed once
pub fn cmd_check(paths: &Paths, json: bool) -> Result<()> {
    let mut scheduler = build_scheduler(paths, json)?;
    let report = scheduler.run_cycle();

    if json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
        return Ok(());
    }

    println!("\n{} {}\n", "Checking".cyan().bold(), report.site.as_deref().unwrap_or("feed"));
    print_report(&report);
    Ok(())
}

fn report_json(report: &CycleReport) -> serde_json::Value {
    let (outcome, error) = match &report.outcome {
        CycleOutcome::Completed => ("completed", None),
        CycleOutcome::Interrupted(e) => ("interrupted", Some(e.to_string())),
        CycleOutcome::EmptyWatchlist => ("empty_watchlist", None),
        CycleOutcome::Failed(e) => ("failed", Some(e.to_string())),
    };
    serde_json::json!({
        "site": report.site,
        "outcome": outcome,
        "error": error,
        "hint": report.hint(),
        "fetches": report.fetches,
        "entries": report.entries,
        "matches": report.matches,
    })
}

/// Run cycles in the foreground until exit
pub fn cmd_run(paths: &Paths, no_menu: bool) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    for created in store.ensure_files()? {
        match created {
            reelwatch::config::WATCHLIST_FILE => {
                println!("New watchlist was created. Add movies to begin.")
            }
            reelwatch::config::SITE_FILE => {
                println!("No site selected. Run `reelwatch site <id>` to get updates.")
            }
            other => println!("Created {}", other),
        }
    }

    let mut scheduler = build_scheduler(paths, false)?;

    let (tx, rx) = mpsc::channel();
    let exit_tx = tx.clone();
    ctrlc::set_handler(move || {
        println!("\n\nShutting down...");
        let _ = exit_tx.send(Action::Exit);
    })
    .map_err(|e| WatchError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    if !no_menu {
        actions::spawn_stdin_reader(tx);
    } else {
        drop(tx);
    }

    let minutes = scheduler.interval().as_secs() / 60;
    println!("\n{} every {}", "reelwatch checking".cyan().bold(), format_minutes(minutes.max(1)));
    println!("  Data: {}", paths.root.display());
    if no_menu {
        println!("Press {} to stop.\n", "Ctrl+C".yellow());
    } else {
        println!("Type {} for actions, {} to stop.\n", "h".yellow(), "Ctrl+C".yellow());
    }

    scheduler.run(&rx, |event| match event {
        LoopEvent::Cycle(report) => {
            println!(
                "[{}] {} {}",
                Local::now().format("%H:%M"),
                "Checked".cyan(),
                report.site.as_deref().unwrap_or("feed")
            );
            print_report(report);
            println!();
        }
        LoopEvent::Restarted(interval) => {
            println!(
                "{} checking every {}\n",
                "Restarted,".cyan(),
                format_minutes((interval.as_secs() / 60).max(1))
            );
        }
        LoopEvent::Action(action, recent) => {
            if let Err(e) = handle_action(paths, &action, recent) {
                println!("  {} {}", "[ERROR]".red(), e);
            }
        }
    })?;

    println!("Stopped.");
    Ok(())
}

/// Actions the scheduler hands back: opening files and pages, help
fn handle_action(paths: &Paths, action: &Action, recent: &[Match]) -> Result<()> {
    match action {
        Action::OpenWatchlist => actions::open_file(&paths.watchlist(), false),
        Action::OpenSite => actions::open_file(&paths.site(), false),
        Action::OpenInterval => actions::open_file(&paths.interval(), false),
        Action::OpenTitle(n) => {
            let found = recent.get(n - 1).ok_or_else(|| {
                WatchError::ConfigError(format!("No match #{} yet ({} recent)", n, recent.len()))
            })?;
            let link = found.link.as_deref().ok_or_else(|| {
                WatchError::ConfigError(format!("No page known for '{}'", found.title))
            })?;
            println!("  Opening {}", link);
            actions::open_url(link)
        }
        Action::Help => {
            println!("{}", MENU_HELP);
            if !recent.is_empty() {
                println!("\n  Recent matches:");
                for (i, m) in recent.iter().enumerate() {
                    println!("  {:>3}. {} ({})", i + 1, m.title, m.site);
                }
            }
            Ok(())
        }
        // Handled inside the scheduler loop
        Action::CheckNow | Action::Restart | Action::Exit => Ok(()),
    }
}
