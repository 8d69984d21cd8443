use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing request parameters. Detected before any backend call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A failure reported by the aggregation backend, annotated with the rule
    /// and call that issued it.
    #[error("Backend failure in {context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),
}

impl Error {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// Wrap a backend error with the context of the call that failed.
    /// Request validation errors pass through untouched.
    pub fn backend(context: impl Into<String>, err: Error) -> Self {
        match err {
            Error::InvalidRequest(_) => err,
            other => Error::Backend {
                context: context.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl<E: fmt::Display> From<tokio_rusqlite::Error<E>> for Error {
    fn from(e: tokio_rusqlite::Error<E>) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Import(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
