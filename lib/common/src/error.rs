use rdf_bucket_model::Atom;
use std::error::Error;
use std::io;

pub type EngineResult<T> = Result<T, EngineError>;

/// An error raised by the storage or the query engine.
///
/// None of these errors are retried. I/O errors are propagated as they are and the caller stays
/// responsible for disposing the operators that are still open.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// An argument was out of its valid range (e.g., an empty sort order).
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// A lookup in the dictionary or the index failed.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Error related to data corruption.
    #[error(transparent)]
    Corruption(#[from] CorruptionError),
    /// A stream was used against its protocol (e.g., `next` after exhaustion).
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
}

impl EngineError {
    /// Builds a [EngineError::Configuration] from a printable message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

impl From<EngineError> for io::Error {
    #[inline]
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Io(error) => error,
            EngineError::Corruption(error) => error.into(),
            EngineError::Configuration(_) => Self::new(io::ErrorKind::InvalidInput, error),
            EngineError::NotFound(_) => Self::new(io::ErrorKind::NotFound, error),
            EngineError::InvalidOperation(_) => Self::other(error),
        }
    }
}

/// A lookup miss. Indicates a corrupted or mismatched database.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("The atom {0} is not part of the index.")]
    IndexPayload(Atom),
    #[error("The atom {0} is not part of the dictionary.")]
    AtomId(Atom),
    #[error("The text '{0}' is not part of the dictionary.")]
    AtomText(String),
}

/// An error return if some content in the database is corrupted.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct CorruptionError(#[from] CorruptionErrorKind);

/// An error return if some content in the database is corrupted.
#[derive(Debug, thiserror::Error)]
enum CorruptionErrorKind {
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl CorruptionError {
    /// Builds an error from another error.
    #[inline]
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self(CorruptionErrorKind::Other(error.into()))
    }

    /// Builds an error from a printable error message.
    #[inline]
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(CorruptionErrorKind::Msg(msg.into()))
    }
}

impl From<CorruptionError> for io::Error {
    #[inline]
    fn from(error: CorruptionError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}
