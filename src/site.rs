//! Site registry: maps a site id to its feed URL and canonical link templates

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};
use crate::matcher::MatchKind;

/// Marker that precedes a link inside a feed once the line is split on `<`
pub const LINK_MARKER: &str = "link>";

/// One canonical link pattern: `base` + slug, optionally followed by `/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTemplate {
    pub kind: MatchKind,
    /// Title page prefix, e.g. "https://psarips.eu/movie/"
    pub base: String,
    #[serde(default)]
    pub trailing_slash: bool,
}

impl LinkTemplate {
    pub fn new(kind: MatchKind, base: &str, trailing_slash: bool) -> Self {
        Self {
            kind,
            base: base.to_string(),
            trailing_slash,
        }
    }

    /// Page URL for a slug
    pub fn page_url(&self, slug: &str) -> String {
        if self.trailing_slash {
            format!("{}{}/", self.base, slug)
        } else {
            format!("{}{}", self.base, slug)
        }
    }

    /// Token the matcher looks for after splitting a feed line on `<`
    pub fn candidate(&self, slug: &str) -> String {
        format!("{}{}", LINK_MARKER, self.page_url(slug))
    }
}

/// A feed site known to the watcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDef {
    pub id: String,
    pub feed_url: String,
    /// Checked in order; the first template that matches decides the kind
    pub templates: Vec<LinkTemplate>,
}

impl SiteDef {
    /// Check that the feed URL and every template base are absolute URLs
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() || self.id.chars().any(char::is_whitespace) {
            return Err(WatchError::ConfigError(format!(
                "Site id '{}' must be a single non-empty token",
                self.id
            )));
        }
        url::Url::parse(&self.feed_url)?;
        if self.templates.is_empty() {
            return Err(WatchError::ConfigError(format!(
                "Site '{}' has no link templates",
                self.id
            )));
        }
        for template in &self.templates {
            url::Url::parse(&template.base)?;
            if template.kind == MatchKind::None {
                return Err(WatchError::ConfigError(format!(
                    "Site '{}' has a template with kind 'none'",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Page URL for a matched title of the given kind
    pub fn title_url(&self, slug: &str, kind: MatchKind) -> Option<String> {
        self.templates
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.page_url(slug))
    }
}

fn builtin_sites() -> Vec<SiteDef> {
    vec![
        SiteDef {
            id: "psarips".to_string(),
            feed_url: "https://psarips.eu/feed/".to_string(),
            templates: vec![
                LinkTemplate::new(MatchKind::Movie, "https://psarips.eu/movie/", true),
                LinkTemplate::new(MatchKind::Show, "https://psarips.eu/tv-show/", true),
            ],
        },
        SiteDef {
            id: "yts".to_string(),
            feed_url: "https://yts.lt/rss".to_string(),
            templates: vec![LinkTemplate::new(
                MatchKind::Movie,
                "https://yts.lt/movie/",
                false,
            )],
        },
    ]
}

/// Ordered table of known sites
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<SiteDef>,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SiteRegistry {
    /// The built-in sites only
    pub fn builtin() -> Self {
        Self {
            sites: builtin_sites(),
        }
    }

    /// Built-in sites with user-declared ones merged in.
    /// A user site with the same id replaces the built-in entry.
    pub fn with_extra(extra: &[SiteDef]) -> Result<Self> {
        let mut registry = Self::builtin();
        for site in extra {
            site.validate()?;
            match registry
                .sites
                .iter_mut()
                .find(|s| s.id.eq_ignore_ascii_case(&site.id))
            {
                Some(existing) => *existing = site.clone(),
                None => registry.sites.push(site.clone()),
            }
        }
        Ok(registry)
    }

    /// Look up a site id, ignoring case and surrounding whitespace
    pub fn get(&self, id: &str) -> Option<&SiteDef> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        self.sites.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    /// Like `get`, but an unknown or empty id is an error
    pub fn resolve(&self, id: &str) -> Result<&SiteDef> {
        self.get(id)
            .ok_or_else(|| WatchError::UnknownSite(id.trim().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteDef> {
        self.sites.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.id.as_str()).collect()
    }
}
