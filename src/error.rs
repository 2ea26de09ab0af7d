//! Error types for selector evaluation and the statement layer

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Query evaluation error (message passed through unchanged)
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while parsing or evaluating a statement
///
/// The `Display` output of the limit variants is relied on by client
/// tooling and must stay byte-for-byte stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Malformed statement or selector text
    #[error("Syntax error at position {position}: unexpected {near}")]
    Syntax {
        /// Byte offset of the offending token
        position: usize,
        /// Offending token, quoted, or `end of query`
        near: String,
    },

    /// Regex literal that does not compile or violates safety limits
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        /// Pattern body (truncated for long patterns)
        pattern: String,
        /// Reason reported by the regex compiler
        reason: String,
    },

    /// Selector references a group that does not exist
    #[error("Cannot find group: '{0}'")]
    UnknownGroup(String),

    /// Explicit `limit N` outside `0..=list_limit`
    #[error("Limit must be a value between 0 and {list_limit} but received: {requested}")]
    LimitOutOfRange {
        /// Requested limit
        requested: u64,
        /// Configured list limit
        list_limit: usize,
    },

    /// `alter database set list_limit` outside the administrative bound
    #[error("list_limit must be a value between 0 and {max} but received: {requested}")]
    ListLimitOutOfRange {
        /// Requested list limit
        requested: u64,
        /// Administrative maximum
        max: usize,
    },

    /// Group name is empty, too long, or contains a backtick
    #[error("Invalid group name: '{0}'")]
    InvalidGroupName(String),

    /// Group already exists
    #[error("Group '{0}' already exists")]
    GroupExists(String),

    /// Series name rejected by the registry
    #[error("Invalid series name: {0}")]
    InvalidSeriesName(String),

    /// Namespace snapshot or settings could not be read
    #[error("Namespace error: {0}")]
    Namespace(String),
}

/// Error categories for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad statement text, regex, or group reference
    Syntax,
    /// Requested limit outside `0..=list_limit`
    LimitExceeded,
    /// Rejected administrative command
    Admin,
    /// Snapshot or settings read failed
    Internal,
}

impl EvalError {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax { .. } | EvalError::InvalidRegex { .. } | EvalError::UnknownGroup(_) => {
                ErrorKind::Syntax
            },
            EvalError::LimitOutOfRange { .. } => ErrorKind::LimitExceeded,
            EvalError::ListLimitOutOfRange { .. }
            | EvalError::InvalidGroupName(_)
            | EvalError::GroupExists(_)
            | EvalError::InvalidSeriesName(_) => ErrorKind::Admin,
            EvalError::Namespace(_) => ErrorKind::Internal,
        }
    }
}

/// Validation errors for configuration values
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Invalid format
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Field name being validated
        field: String,
        /// Description of the format error
        message: String,
    },
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for evaluation
pub type EvalResult<T> = std::result::Result<T, EvalError>;
