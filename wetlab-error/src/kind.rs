//! Error kinds for wetlab operations

use std::fmt;

/// The kind of error that occurred.
///
/// Protocol scripts fail fast: the kind is what the supervising correction
/// loop matches on to decide whether to regenerate a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration (layout, paths, policy)
    ConfigInvalid,

    // =========================================================================
    // Physical constraint violations
    // =========================================================================
    /// A non-replenishable source holds less than the requested volume
    InsufficientVolume,

    /// A transfer would push a non-waste destination past its capacity
    Overflow,

    /// An instrument was started with no containers on it (strict policy)
    EmptyInstrumentInvocation,

    /// More containers on an instrument than it has physical slots
    InstrumentCapacityExceeded,

    // =========================================================================
    // Lookup errors
    // =========================================================================
    /// No container with the given index exists in the session
    ContainerNotFound,

    /// A script referenced a container binding that was never created
    UnknownBinding,

    /// Invalid argument passed to an operation
    InvalidArgument,

    // =========================================================================
    // Audit errors
    // =========================================================================
    /// A script assertion did not hold
    AssertionFailed,

    /// Replaying a log produced a different command stream
    ReplayDiverged,

    /// The run exceeded its wall-clock budget
    Timeout,

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Persisting or loading the execution log failed
    StorageFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Physical
            ErrorKind::InsufficientVolume => "InsufficientVolume",
            ErrorKind::Overflow => "Overflow",
            ErrorKind::EmptyInstrumentInvocation => "EmptyInstrumentInvocation",
            ErrorKind::InstrumentCapacityExceeded => "InstrumentCapacityExceeded",

            // Lookup
            ErrorKind::ContainerNotFound => "ContainerNotFound",
            ErrorKind::UnknownBinding => "UnknownBinding",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Audit
            ErrorKind::AssertionFailed => "AssertionFailed",
            ErrorKind::ReplayDiverged => "ReplayDiverged",
            ErrorKind::Timeout => "Timeout",

            // Storage
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout)
    }

    /// Whether this kind reports a violated physical constraint
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            ErrorKind::InsufficientVolume
                | ErrorKind::Overflow
                | ErrorKind::EmptyInstrumentInvocation
                | ErrorKind::InstrumentCapacityExceeded
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
