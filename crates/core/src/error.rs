//! Error types for tool resolution.
//!
//! Three layers:
//! - [`Error`] for fatal problems (bad configuration, broken cache, I/O)
//! - [`StrategyError`] for a single strategy failing; the resolver recovers by
//!   moving on to the next strategy
//! - [`ResolutionError`] for the outcome of a whole strategy chain

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::spec::StrategyKind;

/// Fatal errors raised outside of the strategy chain.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Invalid tool definition or unknown strategy identifier.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(bu::core::config))]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// A cached executable disappeared or is no longer runnable.
    #[error("Cached executable is missing or not runnable: {}", path.display())]
    #[diagnostic(
        code(bu::core::cache_corruption),
        help("The cache is never repaired automatically. \
        Inspect the file, then run `bu cache clean`")
    )]
    CacheCorruption {
        /// Path recorded in the cache
        path: Box<Path>,
    },

    /// The host platform is not one of the supported triples.
    #[error("Unsupported platform: {message}")]
    #[diagnostic(code(bu::core::platform))]
    Platform {
        /// Description of the host
        message: String,
    },

    /// I/O error with the operation and path that failed.
    #[error(
        "I/O {operation} failed{}",
        path.as_ref().map_or(String::new(), |p| format!(": {}", p.display()))
    )]
    #[diagnostic(
        code(bu::core::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "rename", "create_dir_all")
        operation: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a cache corruption error
    #[must_use]
    pub fn cache_corruption(path: impl AsRef<Path>) -> Self {
        Self::CacheCorruption {
            path: path.as_ref().into(),
        }
    }

    /// Create a platform error
    #[must_use]
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }
}

/// Result type for fatal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single strategy could not produce an executable.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// The strategy would need the network while running offline.
    #[error("offline mode forbids network access: {0}")]
    OfflineViolation(String),

    /// Network or transport failure while fetching.
    #[error("transport error: {0}")]
    Transport(String),

    /// Downloaded bytes do not hash to the configured digest.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest from the tool definition
        expected: String,
        /// Digest of the fetched bytes
        actual: String,
    },

    /// Decompression of the downloaded artifact failed.
    #[error("failed to decode artifact: {0}")]
    Decode(String),

    /// The build toolchain exited unsuccessfully.
    #[error("build failed ({status}): {output}")]
    BuildFailed {
        /// Exit status description
        status: String,
        /// Captured diagnostic output
        output: String,
    },

    /// Nothing to find (e.g. binary absent from the search path).
    #[error("not found: {0}")]
    NotFound(String),

    /// Local filesystem problem while materializing the artifact.
    #[error("I/O {operation} failed: {source}")]
    Io {
        /// Operation that failed
        operation: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl StrategyError {
    /// Create an offline violation
    #[must_use]
    pub fn offline(msg: impl Into<String>) -> Self {
        Self::OfflineViolation(msg.into())
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a decode error
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an I/O error
    #[must_use]
    pub fn io(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Short machine-friendly name of the failure kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OfflineViolation(_) => "OfflineViolation",
            Self::Transport(_) => "TransportError",
            Self::ChecksumMismatch { .. } => "ChecksumMismatch",
            Self::Decode(_) => "DecodeError",
            Self::BuildFailed { .. } => "BuildFailed",
            Self::NotFound(_) => "NotFound",
            Self::Io { .. } => "IoError",
        }
    }
}

/// One entry of the failure chain carried by [`ResolutionError::Exhausted`].
#[derive(Debug)]
pub struct StrategyFailure {
    /// Strategy that failed or was skipped
    pub strategy: StrategyKind,
    /// Why it failed
    pub error: StrategyError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.strategy, self.error.kind(), self.error)
    }
}

/// Outcome of a failed resolution.
#[derive(Error, Debug, Diagnostic)]
pub enum ResolutionError {
    /// Every configured strategy was skipped or failed.
    #[error("{}", render_exhausted(tool, version, failures))]
    #[diagnostic(
        code(bu::core::exhausted),
        help("Each line above is one strategy in configured order; the root cause may be \
        several strategies back")
    )]
    Exhausted {
        /// Tool name
        tool: String,
        /// Requested version
        version: String,
        /// Per-strategy failures in configured order
        failures: Vec<StrategyFailure>,
    },

    /// A strategy succeeded but its result could not be stored.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] Error),
}

impl ResolutionError {
    /// Failure kinds in chain order, e.g. `["ChecksumMismatch", "NotFound"]`.
    #[must_use]
    pub fn failure_kinds(&self) -> Vec<&'static str> {
        match self {
            Self::Exhausted { failures, .. } => failures.iter().map(|f| f.error.kind()).collect(),
            Self::Cache(_) => Vec::new(),
        }
    }
}

fn render_exhausted(tool: &str, version: &str, failures: &[StrategyFailure]) -> String {
    let mut out = format!("Could not resolve {tool}@{version}: all strategies failed");
    for (i, failure) in failures.iter().enumerate() {
        out.push_str(&format!("\n  {}. {failure}", i + 1));
    }
    out
}
