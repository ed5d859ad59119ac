use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can end a single search or a whole enumeration run.
#[derive(Debug, Error)]
pub enum Error {
    /// Every configured credential hit its quota. Carries the links collected
    /// for the query before the last key gave out.
    #[error("all API keys exhausted")]
    CredentialsExhausted { links: Vec<String> },

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),

    #[error("failed to execute request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("failed to read dorks: {0}")]
    Input(#[source] std::io::Error),

    #[error("failed to write results: {0}")]
    Output(#[source] std::io::Error),

    #[error("no valid google dork credentials found")]
    NoCredentials,

    #[error("config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("search task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err)
        } else {
            Error::Transport(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
