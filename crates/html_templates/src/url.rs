//! URL allow-listing for `href` and `src` values.

use serde::Deserialize;
use std::borrow::Cow;

/// Protocol prefixes allowed by default. Matching is case-sensitive.
pub const DEFAULT_URL_PROTOCOLS: &[&str] = &[
    "bitcoin:",
    "ftp://",
    "ftps://",
    "geo:",
    "git://",
    "gopher://",
    "http://",
    "https://",
    "irc://",
    "ircs://",
    "magnet:",
    "mailto:",
    "matrix:",
    "mms://",
    "news:",
    "nntp://",
    "redis://",
    "sftp://",
    "sip:",
    "sips:",
    "sms:",
    "ssh://",
    "svn://",
    "tel:",
    "telnet://",
    "urn:",
    "worldwind://",
    "xmpp:",
    "//",
];

pub const DEFAULT_RELATIVE_PREFIXES: &[&str] = &["/", "./"];

pub const DEFAULT_BLOCKED_REPLACEMENT: &str = "about:blank#NotAllowedURLProtocol";

/// The `[url]` configuration table.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UrlPolicy {
    pub protocols: Vec<String>,
    pub relative_prefixes: Vec<String>,
    /// Value substituted for a disallowed URL.
    pub blocked_replacement: String,
}

impl Default for UrlPolicy {
    fn default() -> Self {
        Self {
            protocols: DEFAULT_URL_PROTOCOLS.iter().map(|p| p.to_string()).collect(),
            relative_prefixes: DEFAULT_RELATIVE_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            blocked_replacement: DEFAULT_BLOCKED_REPLACEMENT.to_string(),
        }
    }
}

impl UrlPolicy {
    pub fn is_allowed(&self, url: &str) -> bool {
        self.protocols
            .iter()
            .chain(&self.relative_prefixes)
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    /// `url` unchanged when allowed, otherwise the blocked replacement.
    pub fn filter<'a>(&'a self, url: Cow<'a, str>) -> Cow<'a, str> {
        if self.is_allowed(&url) {
            url
        } else {
            log::debug!(target: "html_templates", "rejected url {url:?}");
            Cow::Borrowed(self.blocked_replacement.as_str())
        }
    }
}
