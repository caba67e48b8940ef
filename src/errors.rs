use std::sync::Arc;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A credential refresh failed. Every caller that joined the same
    /// in-flight refresh observes the same shared failure.
    #[error("credential fetch failed: {0}")]
    CredentialFetch(#[source] Arc<Error>),
    #[error("credential endpoint returned {0}: {1}")]
    CredentialStatus(StatusCode, String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timestamp error: {0}")]
    Timestamp(#[from] jiff::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the underlying failure of a credential refresh, if this is one.
    pub fn credential_cause(&self) -> Option<&Error> {
        match self {
            Error::CredentialFetch(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}
