//! Notification commands: set, show, test

use colored::Colorize;
use std::io::{self, Write};

use reelwatch::config::{ConfigStore, NotifyTarget, Paths};
use reelwatch::error::{Result, WatchError};
use reelwatch::notify::{Notification, Notifier, TargetNotifier};

use crate::utils::describe_notify_target;

/// Set up notification target
#[allow(clippy::too_many_arguments)]
pub fn cmd_notify_set(
    paths: &Paths,
    console: bool,
    ntfy: Option<String>,
    ntfy_server: Option<String>,
    gotify_server: Option<String>,
    gotify_token: Option<String>,
    discord: Option<String>,
    command: Option<String>,
) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let mut settings = store.load_settings()?;

    let target = if console {
        NotifyTarget::Console
    } else if let Some(topic) = ntfy {
        NotifyTarget::Ntfy { topic, server: ntfy_server }
    } else if let (Some(server), Some(token)) = (gotify_server, gotify_token) {
        url::Url::parse(&server)?;
        NotifyTarget::Gotify { server, token }
    } else if let Some(webhook_url) = discord {
        url::Url::parse(&webhook_url)?;
        NotifyTarget::Discord { webhook_url }
    } else if let Some(command) = command {
        NotifyTarget::Command { command }
    } else {
        return Err(WatchError::ConfigError(
            "Choose a target: --console, --ntfy, --gotify-server/--gotify-token, --discord or --command".into(),
        ));
    };

    settings.notify = target.clone();
    store.save_settings(&settings)?;
    println!("Notifications will go to {}", describe_notify_target(&target));
    println!("Try it with `reelwatch notify test`.");
    Ok(())
}

/// Show current notification settings
pub fn cmd_notify_show(paths: &Paths) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let settings = store.load_settings()?;

    println!("\nNotification Settings\n");
    println!("  Target: {}", describe_notify_target(&settings.notify));
    println!("  Log: {}", paths.notifications_log().display());
    println!("\n  Config file: {}", paths.settings().display());
    Ok(())
}

/// Send a test notification
pub fn cmd_notify_test(paths: &Paths) -> Result<()> {
    let store = ConfigStore::new(paths.clone());
    let settings = store.load_settings()?;
    let notifier = TargetNotifier::new(settings.notify.clone()).with_log(paths.notifications_log());

    print!("Sending test notification via {}... ", settings.notify.name());
    let _ = io::stdout().flush();
    notifier.notify(&Notification::info(
        "reelwatch test",
        "If you can read this, notifications work.",
    ))?;
    println!("{}", "sent".green());
    Ok(())
}
