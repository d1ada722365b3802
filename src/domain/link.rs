//! MTProto proxy link type and extraction.
//!
//! A proxy link is an opaque `tg://proxy?...` token. Identity is exact
//! string equality: two links differing only in parameter order or secret
//! casing are distinct entries (see DESIGN.md for the canonicalization
//! decision).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Structural pattern for MTProto proxy links:
/// scheme marker, host parameter, numeric port, hex secret.
const PROXY_PATTERN: &str = r"tg://proxy\?server=[^&\s]+&port=\d+&secret=[a-fA-F0-9]+";

fn proxy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PROXY_PATTERN).expect("proxy pattern is valid"))
}

/// An MTProto proxy link, immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyLink(String);

impl ProxyLink {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated form for log lines.
    pub fn short(&self) -> String {
        if self.0.chars().count() <= 50 {
            self.0.clone()
        } else {
            let head: String = self.0.chars().take(50).collect();
            format!("{}...", head)
        }
    }

    /// Parse the (host, port) pair the link encodes.
    ///
    /// Returns `None` when either parameter is missing or unparseable;
    /// callers treat that as a malformed link, not an error.
    pub fn endpoint(&self) -> Option<(String, u16)> {
        let url = Url::parse(&self.0).ok()?;
        let mut server = None;
        let mut port = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "server" => server = Some(value.into_owned()),
                "port" => port = value.parse::<u16>().ok(),
                _ => {}
            }
        }
        match (server, port) {
            (Some(s), Some(p)) if !s.is_empty() && p != 0 => Some((s, p)),
            _ => None,
        }
    }

    /// The hexadecimal secret parameter, if present.
    pub fn secret(&self) -> Option<String> {
        let url = Url::parse(&self.0).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "secret")
            .map(|(_, v)| v.into_owned())
    }
}

impl fmt::Display for ProxyLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProxyLink {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Extract all proxy links from a message text.
///
/// Matches are returned in left-to-right order with duplicates preserved;
/// deduplication is the caller's job. Any input, including empty text,
/// yields a (possibly empty) list, never an error.
pub fn extract_proxy_links(text: &str) -> Vec<ProxyLink> {
    proxy_regex()
        .find_iter(text)
        .map(|m| ProxyLink::new(m.as_str()))
        .collect()
}
