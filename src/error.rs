// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the run's inputs. Raised before any account is fetched,
/// and the only class of error allowed to abort a run.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read accounts file {path}: {source}")]
    AccountsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ticker must not be empty")]
    EmptyToken,

    #[error("unknown time unit '{0}' (expected one of: mins, hours, days, weeks)")]
    UnknownUnit(String),

    #[error("window of {count} {unit} is out of range")]
    WindowOverflow { count: u64, unit: String },
}
