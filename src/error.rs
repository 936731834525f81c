//! Error taxonomy for the evaluation protocol and selection interchange.

use thiserror::Error;

/// Prefix carried by every remote evaluation failure so callers can tell which
/// subsystem raised it.
pub const EVALUATION_ERROR_PREFIX: &str = "rp.webeval.evaluate.errored: ";

#[derive(Debug, Error)]
pub enum EvalError {
    /// Network or HTTP-level failure; the service never produced a result.
    #[error("webeval transport error: {0}")]
    Transport(String),

    /// The service ran the code and it raised. Carries the remote text verbatim.
    #[error("{}{}", EVALUATION_ERROR_PREFIX, .0)]
    RemoteEvaluation(String),

    /// The service answered with something that is not an evaluation result.
    #[error("webeval malformed response: {0}")]
    MalformedResponse(String),
}

impl EvalError {
    /// Remote error text without the diagnostic prefix, if this is a remote failure.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::RemoteEvaluation(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A binary fetch for one tile failed. Never propagated past the tile.
#[derive(Debug, Error)]
#[error("resource load failed for {url}: {reason}")]
pub struct ResourceLoadError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("Value must be between {min} and {max}.")]
    OutOfRange { min: i64, max: i64 },

    #[error("control {name} expects {expected} input")]
    KindMismatch { name: String, expected: &'static str },

    #[error("unknown control {0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection import expects a JSON array of strings: {0}")]
    NotAnArray(#[from] serde_json::Error),

    #[error("selection file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
