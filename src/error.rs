use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config resource {path} unreadable: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config resource {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config resource does not name a control node path")]
    MissingNodePath,
}

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("preference store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("preference store encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PrefsResult<T> = Result<T, PrefsError>;
