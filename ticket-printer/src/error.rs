use std::time::Duration;
use thiserror::Error;

/// Failure while talking to a ticket printer
#[derive(Debug, Error)]
pub enum PrintError {
    /// Address could not be parsed (expects `host` or `host:port`)
    #[error("invalid printer address `{0}`")]
    InvalidAddress(String),

    #[error("printer {addr} unreachable: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("printer {addr} did not respond within {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    /// Connection dropped mid-payload; `written` bytes may already be on paper
    #[error("write to {addr} failed after {written} bytes: {source}")]
    Write {
        addr: String,
        written: usize,
        #[source]
        source: std::io::Error,
    },

    /// Printer reports itself unusable (paper out, cover open, ...)
    #[error("printer offline: {0}")]
    Offline(String),
}

impl PrintError {
    /// Connect or write ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Part of the ticket may have been printed already
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Write { written, .. } if *written > 0)
    }
}

pub type PrintResult<T> = Result<T, PrintError>;
