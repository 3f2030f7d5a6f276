// src/mentions.rs
use serde::Serialize;
use std::fmt;

use crate::error::InputError;

/// Count non-overlapping, case-sensitive literal occurrences of `token` in `text`.
pub fn count_mentions(text: &str, token: &str) -> Result<usize, InputError> {
    if token.is_empty() {
        return Err(InputError::EmptyToken);
    }
    Ok(text.matches(token).count())
}

/// A non-empty search token. Validated once so the engine cannot fail on it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(token: impl Into<String>) -> Result<Self, InputError> {
        let token = token.into();
        if token.is_empty() {
            return Err(InputError::EmptyToken);
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn count_in(&self, text: &str) -> usize {
        text.matches(self.0.as_str()).count()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
