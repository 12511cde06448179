use std::io::{BufRead, BufReader, Read};
use std::time::Duration;

use crate::config::Settings;
use crate::error::{Result, WatchError};

/// Feed document as fetched from a site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBody {
    /// URL that was requested
    pub url: String,
    /// Decoded body text, one feed line per line
    pub text: String,
    /// Set when the stream failed after some lines were read
    pub interrupted: Option<String>,
}

impl FeedBody {
    pub fn complete(url: &str, text: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            text: text.into(),
            interrupted: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Something that can produce a feed body for a URL
pub trait FeedSource {
    fn fetch(&self, url: &str) -> Result<FeedBody>;
}

/// Feed source backed by a blocking HTTP client
pub struct HttpFeedSource {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Duration::from_secs(settings.fetch_timeout_secs.max(1)),
            &settings.user_agent,
        )
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch(&self, url: &str) -> Result<FeedBody> {
        tracing::debug!(url, "fetching feed");

        // Non-2xx statuses come back as errors from ureq
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| WatchError::FetchFailed(format!("{}: {}", url, e)))?;

        let reader = response.into_body().into_reader();
        let body = read_lines(url, reader);
        tracing::debug!(url, bytes = body.text.len(), interrupted = body.interrupted.is_some(), "feed fetched");
        Ok(body)
    }
}

/// Read a body line by line, keeping what arrived before any read error.
/// Invalid UTF-8 is replaced rather than treated as a failure.
pub fn read_lines<R: Read>(url: &str, reader: R) -> FeedBody {
    let mut reader = BufReader::new(reader);
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => text.push_str(&String::from_utf8_lossy(&buf)),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return FeedBody {
                    url: url.to_string(),
                    text,
                    interrupted: Some(e.to_string()),
                };
            }
        }
    }

    FeedBody::complete(url, text)
}
