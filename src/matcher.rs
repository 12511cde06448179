//! Title normalization and feed matching

use serde::{Deserialize, Serialize};

use crate::site::SiteDef;

/// Which kind of canonical link a title matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Movie,
    Show,
    Generic,
    None,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchKind::Movie => "movie",
            MatchKind::Show => "show",
            MatchKind::Generic => "generic",
            MatchKind::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of testing one watchlist entry against one feed body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub found: bool,
    pub kind: MatchKind,
}

impl MatchResult {
    pub const NOT_FOUND: MatchResult = MatchResult {
        found: false,
        kind: MatchKind::None,
    };

    pub fn found(kind: MatchKind) -> Self {
        Self { found: true, kind }
    }
}

/// Turn a title into the slug sites use in their URLs:
/// lowercase, spaces become hyphens, parentheses are dropped.
pub fn normalize(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '(' | ')' => None,
            other => Some(other),
        })
        .collect()
}

/// Lowercased candidate tokens for a title on a site, in template order
pub fn candidates(title: &str, site: &SiteDef) -> Vec<(String, MatchKind)> {
    let slug = normalize(title);
    site.templates
        .iter()
        .map(|t| (t.candidate(&slug).to_lowercase(), t.kind))
        .collect()
}

/// Test whether a title is present in a feed body.
///
/// Each line is split on `<` and every token is compared, ignoring case,
/// against the site's candidate links. Scanning stops at the first token
/// that equals any candidate; ties within a token go to the earlier template.
pub fn match_title(title: &str, feed: &str, site: &SiteDef) -> MatchResult {
    let candidates = candidates(title, site);

    for line in feed.lines() {
        for token in line.split('<') {
            let token = token.to_lowercase();
            if let Some((_, kind)) = candidates.iter().find(|(c, _)| *c == token) {
                return MatchResult::found(*kind);
            }
        }
    }

    MatchResult::NOT_FOUND
}
