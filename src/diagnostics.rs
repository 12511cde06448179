//! Error log with environment metadata, for bug reports

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::WatchError;

static SYSTEM_INFO: Lazy<SystemInfo> = Lazy::new(SystemInfo::collect);

/// Facts about the machine we are running on
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub app_version: String,
}

impl SystemInfo {
    /// Cached for the lifetime of the process
    pub fn current() -> &'static SystemInfo {
        &SYSTEM_INFO
    }

    fn collect() -> Self {
        Self {
            os_name: std::env::consts::OS.to_string(),
            os_version: os_version().unwrap_or_else(|| "unknown".to_string()),
            arch: std::env::consts::ARCH.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(target_os = "linux")]
fn os_version() -> Option<String> {
    let release = std::fs::read_to_string("/etc/os-release").ok()?;
    release
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim_matches('"').to_string())
        .or_else(|| command_output("uname", &["-r"]))
}

#[cfg(target_os = "macos")]
fn os_version() -> Option<String> {
    command_output("sw_vers", &["-productVersion"])
}

#[cfg(windows)]
fn os_version() -> Option<String> {
    command_output("cmd", &["/c", "ver"])
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn os_version() -> Option<String> {
    command_output("uname", &["-r"])
}

#[allow(dead_code)]
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Append-only log of error events
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Only emits tracing events, writes no file
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Record one error event. Never fails: a log that cannot be written
    /// is reported through tracing instead.
    pub fn record(&self, context: &str, error: &WatchError) {
        tracing::error!(kind = error.kind(), context, error = %error, "cycle error");

        let Some(ref path) = self.path else {
            return;
        };
        let info = SystemInfo::current();
        let entry = format!(
            "{}\n{} [{}] {}: {}\nOS name: {}\nOS version: {}\nOS architecture: {}\nreelwatch version: {}\n",
            "=".repeat(60),
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            error.kind(),
            context,
            error,
            info.os_name,
            info.os_version,
            info.arch,
            info.app_version,
        );

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(e) = written {
            tracing::warn!(path = %path.display(), error = %e, "could not write error log");
        }
    }
}
