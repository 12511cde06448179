use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Config file missing: {0}")]
    ConfigMissing(String),

    #[error("Config file unreadable: {0}")]
    ConfigUnreadable(String),

    #[error("Fetching feed failed: {0}")]
    FetchFailed(String),

    #[error("Unknown site: '{0}'")]
    UnknownSite(String),

    #[error("Watchlist is empty")]
    EmptyWatchlist,

    #[error("Invalid update interval: {0}")]
    InvalidInterval(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),
}

impl WatchError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            WatchError::ConfigMissing(_) => Some(
                "Run `reelwatch init` to create the watchlist, site and interval files"
            ),
            WatchError::UnknownSite(_) => Some(
                "Run `reelwatch sites` to see known sites, then:\n  reelwatch site <id>"
            ),
            WatchError::EmptyWatchlist => Some(
                "Add a title with:\n  reelwatch add \"The Matrix (1999)\""
            ),
            WatchError::InvalidInterval(_) => Some(
                "The interval file must hold a whole number of minutes, e.g.:\n  reelwatch interval 30"
            ),
            WatchError::FetchFailed(_) | WatchError::HttpError(_) => Some(
                "Check your internet connection, or try:\n  reelwatch check"
            ),
            WatchError::NotificationError(_) => Some(
                "Check your notification settings with `reelwatch notify show`"
            ),
            _ => None,
        }
    }

    /// Short category name, used in diagnostic log entries
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::ConfigMissing(_) => "ConfigMissing",
            WatchError::ConfigUnreadable(_) => "ConfigUnreadable",
            WatchError::FetchFailed(_) => "FetchFailed",
            WatchError::HttpError(_) => "Http",
            WatchError::UnknownSite(_) => "UnknownSite",
            WatchError::EmptyWatchlist => "EmptyWatchlist",
            WatchError::InvalidInterval(_) => "InvalidInterval",
            WatchError::NotificationError(_) => "NotificationFailed",
            _ => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
