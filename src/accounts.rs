// src/accounts.rs
//! Source list loading: one account URL per line, invalid lines dropped.

use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
use url::Url;

use crate::error::InputError;

/// A validated account URL. Only constructible through [`AccountRef::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountRef(Url);

impl AccountRef {
    /// Returns `None` unless `raw` is an absolute http(s) URL with a host and
    /// no embedded whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return None;
        }
        let url = Url::parse(raw).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        match url.host_str() {
            Some(h) if !h.is_empty() => Some(Self(url)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Last non-empty path segment, e.g. `elonmusk` for `https://x.com/elonmusk`.
    pub fn handle(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AccountRef {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Parse account list content. Lines keep their order; each line is trimmed
/// at the end only, so a line with leading blanks is rejected.
pub fn parse_accounts(content: &str) -> Vec<AccountRef> {
    let mut out = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let link = line.trim_end();
        match AccountRef::parse(link) {
            Some(acc) => out.push(acc),
            None => {
                if !link.is_empty() {
                    debug!(line = n + 1, entry = link, "dropping invalid account entry");
                }
            }
        }
    }
    out
}

/// Read and validate the accounts file. An unreadable file is fatal.
pub fn load_accounts(path: &Path) -> Result<Vec<AccountRef>, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::AccountsFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_accounts(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_valid_urls_in_order() {
        let input = "https://x.com/a\nnot a url\nhttp://x.com/b  \n\nftp://x.com/c\n";
        let got: Vec<String> = parse_accounts(input)
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(got, vec!["https://x.com/a", "http://x.com/b"]);
    }

    #[test]
    fn leading_whitespace_is_not_trimmed() {
        assert!(parse_accounts("   https://x.com/a").is_empty());
    }

    #[test]
    fn rejects_inner_spaces_and_hostless() {
        assert!(AccountRef::parse("https://x.com/a b").is_none());
        assert!(AccountRef::parse("https://").is_none());
        assert!(AccountRef::parse("x.com/a").is_none());
        assert!(AccountRef::parse("mailto:someone@x.com").is_none());
    }

    #[test]
    fn crlf_lines_are_accepted() {
        let got = parse_accounts("https://x.com/a\r\nhttps://x.com/b\r\n");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn duplicates_are_kept() {
        let got = parse_accounts("https://x.com/a\nhttps://x.com/a\n");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn handle_is_last_path_segment() {
        let a = AccountRef::parse("https://x.com/elonmusk/").unwrap();
        assert_eq!(a.handle(), Some("elonmusk"));
        let root = AccountRef::parse("https://x.com").unwrap();
        assert_eq!(root.handle(), None);
    }
}
