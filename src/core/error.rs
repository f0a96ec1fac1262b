//! Error types for the tagwarden library.
//!
//! Each stage of an audit run has its own error enum. Errors that the scan
//! is allowed to absorb (tag decoding, incomplete resources) are still typed
//! here so that scanners can log them uniformly before moving on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the label policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy document does not contain the requested key.
    #[error("no such key in policy document: {key}")]
    ConfigKeyMissing {
        /// The key that was looked up.
        key: String,
    },

    /// The policy document could not be read or parsed.
    #[error("failed to parse policy document: {reason}")]
    ConfigParse {
        /// Description of the parse failure.
        reason: String,
    },
}

impl PolicyError {
    /// Creates a `ConfigKeyMissing` error.
    pub fn key_missing(key: impl Into<String>) -> Self {
        Self::ConfigKeyMissing { key: key.into() }
    }

    /// Creates a `ConfigParse` error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            reason: reason.into(),
        }
    }
}

/// The main error type for scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A provider call failed in a way that is expected to succeed on retry.
    #[error("transient {provider} API error during {operation}: {message}")]
    TransientApi {
        /// Provider name (`aws`, `gcp`).
        provider: String,
        /// API operation that failed.
        operation: String,
        /// Error message returned by the provider or transport.
        message: String,
    },

    /// A provider call failed and the scan cannot continue.
    #[error("{provider} API error during {operation}: {message}")]
    FatalApi {
        /// Provider name (`aws`, `gcp`).
        provider: String,
        /// API operation that failed.
        operation: String,
        /// Error message returned by the provider or transport.
        message: String,
    },

    /// A resource's tag payload could not be decoded.
    #[error("failed to decode tags: {reason}")]
    Decode {
        /// Description of the decoding failure.
        reason: String,
    },

    /// A resource lacks an identifier or a type and cannot be reported.
    #[error("incomplete resource: {reason}")]
    IncompleteResource {
        /// What was missing.
        reason: String,
    },

    /// A bounded retry policy ran out of attempts.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Operation that was being retried.
        operation: String,
        /// Number of attempts made.
        attempts: u32,
        /// Display form of the last error.
        last_error: String,
    },

    /// The scan was cancelled.
    #[error("scan was cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// The label policy could not be loaded.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl ScanError {
    /// Returns `true` if this error may succeed when the call is repeated.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TransientApi { .. })
    }

    /// Returns `true` if the scanner should log and move on to the next resource.
    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::IncompleteResource { .. })
    }

    /// Returns the provider name if this error is associated with one.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::TransientApi { provider, .. } | Self::FatalApi { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Creates a `TransientApi` error.
    pub fn transient(
        provider: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TransientApi {
            provider: provider.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a `FatalApi` error.
    pub fn fatal(
        provider: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::FatalApi {
            provider: provider.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a `Decode` error.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Creates an `IncompleteResource` error.
    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::IncompleteResource {
            reason: reason.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Errors raised while reading settings from the environment.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required variable is unset or blank.
    #[error("environment variable {variable} must be set")]
    Missing {
        /// Name of the variable.
        variable: String,
    },
}

impl SettingsError {
    /// Creates a `Missing` error.
    pub fn missing(variable: impl Into<String>) -> Self {
        Self::Missing {
            variable: variable.into(),
        }
    }
}

/// Errors raised while writing CSV exports or the archive.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing a CSV record failed.
    #[error("failed to write CSV {path}: {source}")]
    Csv {
        /// CSV file being written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// Building the zip archive failed.
    #[error("failed to build archive {path}: {reason}")]
    Archive {
        /// Archive file being written.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A background writer task panicked or was cancelled.
    #[error("report writer task failed: {0}")]
    Task(String),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by a notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request to {method} failed: {message}")]
    Http {
        /// API method being called.
        method: String,
        /// Transport error message.
        message: String,
    },

    /// The messaging API answered with an error.
    #[error("{method} returned error: {error}")]
    Api {
        /// API method being called.
        method: String,
        /// Error code reported by the API.
        error: String,
    },

    /// Reading an attachment failed.
    #[error("failed to read attachment {path}: {source}")]
    Io {
        /// Attachment path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error for a complete audit run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Scanning failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Writing the report failed.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Sending the notification failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl From<PolicyError> for AuditError {
    fn from(err: PolicyError) -> Self {
        Self::Scan(ScanError::Policy(err))
    }
}

/// A specialized `Result` type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// A specialized `Result` type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
