//! Configuration for proxywatch paths and the source allow-list.
//!
//! Configuration sources (highest priority first):
//! 1. CLI flags (with env fallbacks: TELEGRAM_BOT_TOKEN, TARGET_CHANNEL,
//!    PROXYWATCH_HOME)
//! 2. Defaults (~/.proxywatch, <state dir>/channels.txt)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// File name of the default source allow-list.
pub const CHANNELS_FILE: &str = "channels.txt";

/// Errors that can occur loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Channels file not found: {0}")]
    ChannelsFileMissing(PathBuf),

    #[error("No source channels configured in {0}")]
    NoSources(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolve the state directory: $PROXYWATCH_HOME, or ~/.proxywatch.
pub fn proxywatch_home() -> Result<PathBuf> {
    if let Ok(env_home) = std::env::var("PROXYWATCH_HOME") {
        return Ok(PathBuf::from(env_home));
    }

    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(".proxywatch"))
}

/// Allow-list of source channels to monitor.
///
/// Entries are stored normalized; matching is case-insensitive and ignores
/// a leading `@` or a `t.me/` prefix.
#[derive(Debug, Clone)]
pub struct SourceList(Vec<String>);

impl SourceList {
    /// Load the allow-list from a newline-delimited file.
    ///
    /// Lines starting with `#` and blank lines are ignored. A missing file
    /// or an empty list is an error: without sources there is nothing to
    /// monitor, and the caller treats this as fatal at startup.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ChannelsFileMissing(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let sources: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(normalize_source)
            .collect();

        if sources.is_empty() {
            return Err(ConfigError::NoSources(path.to_path_buf()));
        }

        Ok(Self(sources))
    }

    pub fn contains(&self, source: &str) -> bool {
        let normalized = normalize_source(source);
        self.0.iter().any(|s| *s == normalized)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_source(raw: impl AsRef<str>) -> String {
    let s = raw.as_ref().trim();
    let s = s
        .strip_prefix("https://t.me/")
        .or_else(|| s.strip_prefix("t.me/"))
        .unwrap_or(s);
    let s = s.strip_prefix('@').unwrap_or(s);
    s.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_skips_comments_and_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# proxies channels").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "@proxy_channel").unwrap();
        writeln!(file, "t.me/OtherChannel").unwrap();

        let sources = SourceList::load(file.path()).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains("proxy_channel"));
        assert!(sources.contains("@OTHERCHANNEL"));
        assert!(!sources.contains("unrelated"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = SourceList::load(Path::new("/nonexistent/channels.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::ChannelsFileMissing(_)));
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# only comments").unwrap();

        let err = SourceList::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoSources(_)));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_source("@Channel"), "channel");
        assert_eq!(normalize_source("https://t.me/Channel"), "channel");
        assert_eq!(normalize_source("-1001234567890"), "-1001234567890");
    }
}
