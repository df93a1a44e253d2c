//! Typed error hierarchy for the epo-srp crate.
//!
//! `SrpError` covers every failure boundary the workflow crosses: the
//! configuration file, the ePO remote command API, the LogRhythm Case API,
//! and the local case-reference lookup. Variants map to those boundaries,
//! not to implementation details, and inner causes are chained through
//! `source()` so the binary can print the full chain.
//!
//! `Step` is the workflow's wrapper: it names which step of the run failed
//! and carries the underlying error as its source.

use std::path::PathBuf;

use reqwest::StatusCode;

use crate::workflow::Step;

/// Unified error type for all epo-srp operations.
#[derive(Debug, thiserror::Error)]
pub enum SrpError {
    /// The configuration file could not be read, parsed, or failed validation.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong, including the offending key when known.
        message: String,
        /// The underlying I/O or TOML error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The invocation request was rejected before any remote call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// ePO accepted the HTTP request but the remote command failed.
    ///
    /// The remote API answers `Error <code> :` followed by a message
    /// instead of `OK:`; both are preserved here.
    #[error("ePO command {command} failed (code {code}): {message}")]
    Epo {
        /// The remote command name, e.g. `system.applyTag`.
        command: String,
        /// Numeric error code reported by ePO.
        code: i32,
        /// The message text that followed the error header.
        message: String,
    },

    /// A remote API returned a non-success HTTP status code.
    ///
    /// The response body is kept because both ePO and the Case API put
    /// their diagnostics there.
    #[error("API error {status}: {body}")]
    Api {
        /// The HTTP status code returned.
        status: StatusCode,
        /// The raw response body text, or empty if unreadable.
        body: String,
    },

    /// `system.find` returned no records for the requested name.
    #[error("no ePO system matches '{0}'")]
    SystemNotFound(String),

    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON deserialization of a response payload failed.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Transport-level failure (DNS, TCP, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A fatal workflow step failed; the run stopped at this step.
    #[error("step '{step}' failed: {source}")]
    Step {
        /// The step that failed.
        step: Step,
        /// Why it failed.
        #[source]
        source: Box<SrpError>,
    },
}

impl SrpError {
    /// Wraps `self` as the failure of a workflow step.
    pub fn at(self, step: Step) -> Self {
        SrpError::Step {
            step,
            source: Box::new(self),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        SrpError::Config {
            message: message.into(),
            source: None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SrpError>;
