//! Shared utility functions

use colored::Colorize;

use reelwatch::config::NotifyTarget;
use reelwatch::matcher::MatchKind;
use reelwatch::scheduler::{CycleOutcome, CycleReport};

/// Format minutes as a human-readable interval (e.g., "15m", "2h", "1h 30m")
pub fn format_minutes(minutes: u64) -> String {
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Describe a notification target for display
pub fn describe_notify_target(target: &NotifyTarget) -> String {
    match target {
        NotifyTarget::Console => "console (this terminal)".to_string(),
        NotifyTarget::None => "none (notifications.log only)".to_string(),
        NotifyTarget::Command { command } => format!("command: {}", command),
        NotifyTarget::Ntfy { topic, server } => format!(
            "ntfy: {}/{}",
            server.as_deref().unwrap_or("https://ntfy.sh").trim_end_matches('/'),
            topic
        ),
        NotifyTarget::Gotify { server, .. } => format!("gotify: {}", server),
        NotifyTarget::Discord { .. } => "discord webhook".to_string(),
    }
}

fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Movie => "movie",
        MatchKind::Show => "tv show",
        MatchKind::Generic | MatchKind::None => "title",
    }
}

fn print_hint(hint: Option<&str>) {
    for line in hint.into_iter().flat_map(str::lines) {
        println!("          {}", line.dimmed());
    }
}

/// Print the per-entry status lines and any error for a cycle
pub fn print_report(report: &CycleReport) {
    let site = report.site.as_deref().unwrap_or("?");

    match &report.outcome {
        CycleOutcome::Failed(e) => {
            println!("  {} {}", "[ERROR]".red(), e);
            print_hint(report.hint());
            return;
        }
        CycleOutcome::EmptyWatchlist => {
            println!(
                "  {}",
                "Watchlist is empty. Add some movies to get updates.".yellow()
            );
            print_hint(report.hint());
            return;
        }
        CycleOutcome::Completed | CycleOutcome::Interrupted(_) => {}
    }

    for entry in &report.entries {
        if entry.result.found {
            println!(
                "  {} {} is available on {} ({})",
                "✓".green(),
                entry.title.bold(),
                site,
                kind_label(entry.result.kind)
            );
        } else {
            println!(
                "  {} {}",
                "·".dimmed(),
                format!("{} is not available on {}", entry.title, site).dimmed()
            );
        }
    }

    if let CycleOutcome::Interrupted(e) = &report.outcome {
        println!("  {} {}", "[WARN]".yellow(), e);
    }

    let found = report.matches.len();
    println!(
        "\n  {} of {} titles available",
        if found > 0 { found.to_string().green().bold() } else { found.to_string().normal() },
        report.entries.len()
    );
}
