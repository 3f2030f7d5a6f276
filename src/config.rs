// src/config.rs
//! Runtime configuration: TOML file with every field defaulted, then
//! environment overrides.
//!
//! Lookup order:
//! 1) `$TICKER_CONFIG_PATH` (must exist)
//! 2) `config/ticker.toml`
//! 3) built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::ItemSelectors;
use crate::processor::FetchPolicy;

pub const ENV_CONFIG_PATH: &str = "TICKER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/ticker.toml";

pub const ENV_CHROME_BIN: &str = "CHROME_BIN";
pub const ENV_BROWSERLESS_URL: &str = "BROWSERLESS_URL";
pub const ENV_BROWSERLESS_TOKEN: &str = "BROWSERLESS_TOKEN";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "TICKER_FETCH_TIMEOUT_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Chrome,
    Browserless,
    Rss,
    Fixture,
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(Backend::Chrome),
            "browserless" => Ok(Backend::Browserless),
            "rss" => Ok(Backend::Rss),
            "fixture" => Ok(Backend::Fixture),
            other => Err(anyhow!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub fetch: FetchSection,
    pub run: RunSection,
    pub extract: ExtractSection,
    pub chrome: ChromeSection,
    pub browserless: BrowserlessSection,
    pub rss: RssSection,
    pub fixture: FixtureSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub backend: Backend,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            backend: Backend::Chrome,
            timeout_secs: 10,
            max_attempts: 1,
            retry_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub concurrency: usize,
    pub deadline_secs: Option<u64>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            concurrency: 1,
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    pub item_selector: String,
    pub time_selector: String,
}

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            item_selector: "article".into(),
            time_selector: "time".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromeSection {
    pub bin: String,
    pub max_sessions: usize,
}

impl Default for ChromeSection {
    fn default() -> Self {
        Self {
            bin: "chromium".into(),
            max_sessions: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserlessSection {
    pub url: String,
    pub token: Option<String>,
}

impl Default for BrowserlessSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".into(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RssSection {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureSection {
    pub dir: Option<String>,
}

impl CounterConfig {
    /// Parse TOML content and validate selectors.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: CounterConfig = toml::from_str(s).context("parsing ticker config toml")?;
        cfg.selectors()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File lookup per module docs, then environment overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Explicit path (CLI `--config`) if given, else the default lookup.
    /// Environment overrides apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let mut cfg = Self::load_from(p)?;
                cfg.apply_env()?;
                Ok(cfg)
            }
            None => Self::load_default(),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(bin) = std::env::var(ENV_CHROME_BIN) {
            if !bin.trim().is_empty() {
                self.chrome.bin = bin.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var(ENV_BROWSERLESS_URL) {
            if !url.trim().is_empty() {
                self.browserless.url = url.trim().to_string();
            }
        }
        if let Ok(token) = std::env::var(ENV_BROWSERLESS_TOKEN) {
            if !token.trim().is_empty() {
                self.browserless.token = Some(token.trim().to_string());
            }
        }
        if let Ok(raw) = std::env::var(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_FETCH_TIMEOUT_SECS}={raw} is not a number"))?;
        }
        Ok(())
    }

    pub fn selectors(&self) -> Result<ItemSelectors> {
        ItemSelectors::parse(&self.extract.item_selector, &self.extract.time_selector)
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_attempts: self.fetch.max_attempts.max(1),
            retry_backoff: Duration::from_millis(self.fetch.retry_backoff_ms),
        }
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run.deadline_secs.map(Duration::from_secs)
    }
}
