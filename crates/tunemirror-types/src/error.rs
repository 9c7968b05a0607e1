//! Error types and handling for tunemirror
//!
//! A single error enum is shared by every crate in the workspace. Each variant carries
//! a severity and a recoverability flag so the sync engine can tell a per-file failure
//! (log it, move on to the next job) from a configuration mistake (abort before touching
//! the target tree).

use std::path::PathBuf;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - operation can continue
    Low,
    /// Medium severity - the current file is abandoned, the run continues
    Medium,
    /// High severity - the run should be aborted
    High,
}

/// Main error type for tunemirror operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// File not found, or not a regular file
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found
        path: PathBuf,
    },

    /// Configuration error (invalid rule, conflicting roots, bad config file)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// The external prober could not be run
    #[error("Probe failed for {path}: {message}")]
    Probe {
        /// File being probed
        path: PathBuf,
        /// Error message describing the probe failure
        message: String,
    },

    /// The external encoder failed
    #[error("Encoding {path} failed: {message}")]
    Encode {
        /// Output path of the failed encode
        path: PathBuf,
        /// Error message describing the encoder failure
        message: String,
    },

    /// No free name could be found for a renamed target
    #[error("No free name for {path} after {attempts} attempts")]
    Collision {
        /// Target path that collided
        path: PathBuf,
        /// Number of candidate names tried
        attempts: u32,
    },

    /// A task was submitted to a pool that no longer accepts work
    #[error("Worker pool '{pool}' is closed")]
    PoolClosed {
        /// Name of the pool
        pool: String,
    },

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
    /// Probe errors
    Probe,
    /// Encoder errors
    Encode,
    /// Target name collisions
    Collision,
    /// Pool shutdown
    PoolClosed,
    /// Cancellation
    Cancelled,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::FileNotFound { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::Probe { .. } => ErrorKind::Probe,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::Collision { .. } => ErrorKind::Collision,
            Self::PoolClosed { .. } => ErrorKind::PoolClosed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } => ErrorSeverity::High,
            Self::Io { .. }
            | Self::FileNotFound { .. }
            | Self::Probe { .. }
            | Self::Encode { .. }
            | Self::Collision { .. }
            | Self::Other { .. } => ErrorSeverity::Medium,
            Self::PoolClosed { .. } | Self::Cancelled => ErrorSeverity::Low,
        }
    }

    /// Check if the run can continue after this error
    ///
    /// Per-file failures are recoverable: the file is reported and the next one is
    /// processed. Configuration errors and cancellation end the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Config { .. } | Self::Cancelled => false,
            Self::Io { .. }
            | Self::FileNotFound { .. }
            | Self::Probe { .. }
            | Self::Encode { .. }
            | Self::Collision { .. }
            | Self::PoolClosed { .. }
            | Self::Other { .. } => true,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new probe error
    pub fn probe<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new encoder error
    pub fn encode<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Encode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error with a custom message
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
