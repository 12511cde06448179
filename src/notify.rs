use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use chrono::{DateTime, Utc};
use colored::Colorize;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::config::NotifyTarget;
use crate::error::{Result, WatchError};
use crate::matcher::MatchKind;

/// Shared HTTP agent for remote notification targets
static NOTIFY_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(15)))
        .build()
        .into()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// A message for the user
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub severity: Severity,
    /// Page to open for this notification, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl Notification {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity: Severity::Info,
            link: None,
            sent_at: Utc::now(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::info(title, body)
        }
    }

    /// "<title> is available on <site>"
    pub fn available(title: &str, site: &str, kind: MatchKind, link: Option<String>) -> Self {
        let body = match &link {
            Some(url) => format!("New {} release: {}", kind, url),
            None => format!("New {} release", kind),
        };
        Self {
            link,
            ..Self::info(format!("{} is available on {}", title, site), body)
        }
    }

    /// The one-time "running in the background" message
    pub fn startup() -> Self {
        Self::info(
            "reelwatch is running in the background",
            "Type `h` and Enter for the action menu",
        )
    }
}

/// Where notifications are delivered
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;

    fn startup(&self) -> Result<()> {
        self.notify(&Notification::startup())
    }
}

/// Notifier that delivers to the configured target and keeps a log
pub struct TargetNotifier {
    target: NotifyTarget,
    log_path: Option<PathBuf>,
}

impl TargetNotifier {
    pub fn new(target: NotifyTarget) -> Self {
        Self {
            target,
            log_path: None,
        }
    }

    /// Also append every notification to this file
    pub fn with_log(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    pub fn target(&self) -> &NotifyTarget {
        &self.target
    }

    fn log_notification(&self, notification: &Notification) {
        let Some(ref path) = self.log_path else {
            return;
        };
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let entry = format!(
                "{} [{}] {} | {}\n",
                notification.sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
                self.target.name(),
                notification.title,
                notification.body,
            );
            let _ = file.write_all(entry.as_bytes());
        }
    }
}

impl Notifier for TargetNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        self.log_notification(notification);

        match &self.target {
            NotifyTarget::Console => {
                print_console(notification);
                Ok(())
            }
            NotifyTarget::None => Ok(()),
            NotifyTarget::Command { command } => send_command(command, notification),
            NotifyTarget::Ntfy { topic, server } => send_ntfy(topic, server.as_deref(), notification),
            NotifyTarget::Gotify { server, token } => send_gotify(server, token, notification),
            NotifyTarget::Discord { webhook_url } => send_discord(webhook_url, notification),
        }
    }
}

fn print_console(notification: &Notification) {
    let title = match notification.severity {
        Severity::Info => notification.title.green().bold(),
        Severity::Error => notification.title.red().bold(),
    };
    println!("\n  {}", title);
    println!("  {}", notification.body.dimmed());
}

/// Send notification via custom command (JSON on stdin)
fn send_command(command: &str, notification: &Notification) -> Result<()> {
    let json = serde_json::to_string(notification)?;

    let mut child = Command::new("sh")
        .args(["-c", command])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(ref mut stdin) = child.stdin {
        stdin.write_all(json.as_bytes())?;
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WatchError::NotificationError(format!(
            "Command failed: {}",
            stderr.trim()
        )));
    }

    Ok(())
}

fn ntfy_priority(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "default",
        Severity::Error => "high",
    }
}

/// Send notification via ntfy
fn send_ntfy(topic: &str, server: Option<&str>, notification: &Notification) -> Result<()> {
    let server = server.unwrap_or("https://ntfy.sh");
    let url = format!("{}/{}", server.trim_end_matches('/'), topic);

    let mut request = NOTIFY_AGENT
        .post(&url)
        .header("Title", &notification.title)
        .header("Priority", ntfy_priority(notification.severity))
        .header("Tags", "movie_camera");
    if let Some(ref link) = notification.link {
        request = request.header("Click", link);
    }
    request.send(&notification.body)?;

    Ok(())
}

/// Send notification via Gotify
fn send_gotify(server: &str, token: &str, notification: &Notification) -> Result<()> {
    let url = format!("{}/message?token={}", server.trim_end_matches('/'), token);

    let mut payload = serde_json::json!({
        "title": notification.title,
        "message": notification.body,
        "priority": if notification.severity == Severity::Error { 8 } else { 5 },
    });
    if let Some(ref link) = notification.link {
        payload["extras"] = serde_json::json!({
            "client::notification": { "click": { "url": link } }
        });
    }

    NOTIFY_AGENT
        .post(&url)
        .header("Content-Type", "application/json")
        .send_json(&payload)?;

    Ok(())
}

/// Send notification via Discord webhook
fn send_discord(webhook_url: &str, notification: &Notification) -> Result<()> {
    let color = match notification.severity {
        Severity::Info => 5814783,
        Severity::Error => 15548997,
    };
    let mut embed = serde_json::json!({
        "title": notification.title,
        "description": notification.body,
        "color": color,
        "timestamp": notification.sent_at.to_rfc3339(),
        "footer": { "text": "reelwatch" }
    });
    if let Some(ref link) = notification.link {
        embed["url"] = serde_json::json!(link);
    }

    NOTIFY_AGENT
        .post(webhook_url)
        .header("Content-Type", "application/json")
        .send_json(&serde_json::json!({ "embeds": [embed] }))?;

    Ok(())
}
