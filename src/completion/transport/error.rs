//! Wrapper around Reqwest's error type to facilitate exclusive matching

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// The connection could not be established (DNS, refused, TLS)
    ConnectFailed,
    /// The request or the body read timed out
    TimedOut,
    RedirectPolicyViolated,
    /// The response arrived but its body could not be read
    BodyUnreadable,
    UnknownReqwestError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Option<reqwest::Error>,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::new(err)
    }
}

impl Error {
    pub(crate) fn new(err: reqwest::Error) -> Error {
        // Timeouts can surface while reading the body, so check them first.
        let kind = if err.is_timeout() {
            ErrorKind::TimedOut
        } else if err.is_connect() {
            ErrorKind::ConnectFailed
        } else if err.is_redirect() {
            ErrorKind::RedirectPolicyViolated
        } else if err.is_body() || err.is_decode() {
            ErrorKind::BodyUnreadable
        } else {
            ErrorKind::UnknownReqwestError
        };

        Error {
            kind,
            source: Some(err),
        }
    }

    /// Builds an error without an underlying reqwest failure.
    #[cfg(test)]
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::ConnectFailed => write!(f, "connection failed"),
            ErrorKind::TimedOut => write!(f, "timed out"),
            ErrorKind::RedirectPolicyViolated => write!(f, "redirect policy violated"),
            ErrorKind::BodyUnreadable => write!(f, "failed to read the response body"),
            ErrorKind::UnknownReqwestError => write!(f, "unknown reqwest error"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn StdError + 'static))
    }
}
