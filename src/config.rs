use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WatchError};
use crate::site::SiteDef;

pub const WATCHLIST_FILE: &str = "watchlist.txt";
pub const SITE_FILE: &str = "site.txt";
pub const INTERVAL_FILE: &str = "interval.txt";
pub const SETTINGS_FILE: &str = "config.toml";

/// Browser user agent; some feed servers reject default HTTP clients
/// Longest accepted update interval: one year
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Global reelwatch settings, stored in `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Used when the interval file is missing or blank
    #[serde(default = "default_interval")]
    pub default_interval_minutes: u64,

    /// Whole-request timeout for feed fetches
    #[serde(default = "default_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra sites, merged over the built-in ones
    #[serde(default)]
    pub sites: Vec<SiteDef>,

    /// Where notifications go
    #[serde(default)]
    pub notify: NotifyTarget,
}

fn default_interval() -> u64 {
    15
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_interval_minutes: default_interval(),
            fetch_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            sites: Vec::new(),
            notify: NotifyTarget::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyTarget {
    /// Print to the terminal
    #[default]
    Console,
    /// Only write notifications.log
    None,
    /// Shell command receiving the notification as JSON on stdin
    Command { command: String },
    Ntfy { topic: String, server: Option<String> },
    Gotify { server: String, token: String },
    Discord { webhook_url: String },
}

impl NotifyTarget {
    pub fn name(&self) -> &'static str {
        match self {
            NotifyTarget::Console => "console",
            NotifyTarget::None => "none",
            NotifyTarget::Command { .. } => "command",
            NotifyTarget::Ntfy { .. } => "ntfy",
            NotifyTarget::Gotify { .. } => "gotify",
            NotifyTarget::Discord { .. } => "discord",
        }
    }
}

/// Location of every file reelwatch reads or writes
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick the data directory: explicit override, then `REELWATCH_HOME`,
    /// then the platform config directory.
    pub fn resolve(dir_override: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = dir_override {
            return Ok(Self::new(dir));
        }
        if let Ok(dir) = std::env::var("REELWATCH_HOME") {
            if !dir.trim().is_empty() {
                return Ok(Self::new(dir));
            }
        }
        let dirs = ProjectDirs::from("", "", "reelwatch")
            .ok_or_else(|| WatchError::ConfigError("Could not determine config directory".into()))?;
        Ok(Self::new(dirs.config_dir()))
    }

    pub fn watchlist(&self) -> PathBuf {
        self.root.join(WATCHLIST_FILE)
    }

    pub fn site(&self) -> PathBuf {
        self.root.join(SITE_FILE)
    }

    pub fn interval(&self) -> PathBuf {
        self.root.join(INTERVAL_FILE)
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn error_log(&self) -> PathBuf {
        self.root.join("error.log")
    }

    pub fn notifications_log(&self) -> PathBuf {
        self.root.join("notifications.log")
    }
}

/// Plain-text configuration files plus `config.toml`.
///
/// Nothing is cached: every read goes to disk so edits made by the user
/// between cycles are picked up.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: Paths,
}

impl ConfigStore {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Create the data directory and any missing text files.
    /// Returns the names of the files that were created.
    pub fn ensure_files(&self) -> Result<Vec<&'static str>> {
        std::fs::create_dir_all(&self.paths.root)?;

        let mut created = Vec::new();
        for (name, path) in [
            (WATCHLIST_FILE, self.paths.watchlist()),
            (SITE_FILE, self.paths.site()),
            (INTERVAL_FILE, self.paths.interval()),
        ] {
            if !path.exists() {
                std::fs::File::create(&path)?;
                created.push(name);
            }
        }
        Ok(created)
    }

    /// Watchlist titles in file order, blank lines skipped, duplicates kept
    pub fn read_watchlist(&self) -> Result<Vec<String>> {
        let content = read_config_file(&self.paths.watchlist())?;
        Ok(parse_watchlist(&content))
    }

    /// First token of the site file, or an empty string if there is none
    pub fn read_site(&self) -> Result<String> {
        let content = read_config_file(&self.paths.site())?;
        Ok(content
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    /// Poll interval in minutes.
    ///
    /// A missing or blank file falls back to `default_minutes`; anything
    /// that is not a positive integer is an error.
    pub fn read_interval(&self, default_minutes: u64) -> Result<u64> {
        let path = self.paths.interval();
        let content = match read_config_file(&path) {
            Ok(content) => content,
            Err(WatchError::ConfigMissing(_)) => {
                tracing::warn!(path = %path.display(), default_minutes, "interval file missing, using default");
                return check_interval(default_minutes);
            }
            Err(e) => return Err(e),
        };
        match parse_interval(&content)? {
            Some(minutes) => Ok(minutes),
            None => {
                tracing::warn!(path = %path.display(), default_minutes, "interval file blank, using default");
                check_interval(default_minutes)
            }
        }
    }

    pub fn write_site(&self, site_id: &str) -> Result<()> {
        std::fs::create_dir_all(&self.paths.root)?;
        std::fs::write(self.paths.site(), format!("{}\n", site_id.trim()))?;
        Ok(())
    }

    pub fn write_interval(&self, minutes: u64) -> Result<()> {
        check_interval(minutes)?;
        std::fs::create_dir_all(&self.paths.root)?;
        std::fs::write(self.paths.interval(), format!("{}\n", minutes))?;
        Ok(())
    }

    /// Append a title to the watchlist, keeping the file newline-terminated
    pub fn append_watchlist(&self, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WatchError::ConfigError("Cannot add an empty title".into()));
        }
        std::fs::create_dir_all(&self.paths.root)?;

        let path = self.paths.watchlist();
        let needs_newline = match std::fs::read_to_string(&path) {
            Ok(existing) => !existing.is_empty() && !existing.ends_with('\n'),
            Err(_) => false,
        };

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if needs_newline {
            file.write_all(b"\n")?;
        }
        writeln!(file, "{}", title)?;
        Ok(())
    }

    /// Load `config.toml`, or defaults if it does not exist
    pub fn load_settings(&self) -> Result<Settings> {
        let path = self.paths.settings();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Settings::default())
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        std::fs::create_dir_all(&self.paths.root)?;
        let content = toml::to_string_pretty(settings)
            .map_err(|e| WatchError::ConfigError(e.to_string()))?;
        std::fs::write(self.paths.settings(), content)?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WatchError::ConfigMissing(path.display().to_string()),
        _ => WatchError::ConfigUnreadable(format!("{}: {}", path.display(), e)),
    })
}

/// Split watchlist file content into titles
pub fn parse_watchlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Parse interval file content: `None` when blank
pub fn parse_interval(content: &str) -> Result<Option<u64>> {
    let Some(token) = content.split_whitespace().next() else {
        return Ok(None);
    };
    match token.parse::<u64>() {
        Ok(minutes) => check_interval(minutes).map(Some),
        Err(_) => Err(WatchError::InvalidInterval(format!(
            "'{}' is not a whole number of minutes",
            token
        ))),
    }
}

/// Accept 1 minute up to `MAX_INTERVAL_MINUTES`
pub fn check_interval(minutes: u64) -> Result<u64> {
    match minutes {
        0 => Err(WatchError::InvalidInterval(
            "interval must be at least 1 minute".into(),
        )),
        m if m > MAX_INTERVAL_MINUTES => Err(WatchError::InvalidInterval(format!(
            "{} minutes is longer than a year (max {})",
            m, MAX_INTERVAL_MINUTES
        ))),
        m => Ok(m),
    }
}

/// Period for an interval in minutes, validated
pub fn interval_duration(minutes: u64) -> Result<Duration> {
    let minutes = check_interval(minutes)?;
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| WatchError::InvalidInterval(format!("{} minutes is too long", minutes)))
}
