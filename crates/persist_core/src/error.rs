//! Persistence error types.

use std::path::PathBuf;

use crate::id::PersistentId;

/// Errors raised when a display name does not carry a usable identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The object has no display name at all.
    #[error("object has no identity tag")]
    Untagged,

    /// The display name has nothing before the delimiter.
    #[error("object not tagged for persistence")]
    MissingIdentifier,

    /// The prefix before the delimiter is not a non-negative integer.
    #[error("invalid identifier prefix: {0:?}")]
    InvalidIdentifier(String),
}

/// Errors that can occur while reading or writing the persisted document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the data file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file is not valid TOML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The in-memory document could not be rendered.
    #[error("failed to serialise document: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The data file parsed but does not have the expected shape.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// An identifier is too large for the document's integer type.
    #[error("identifier {0} does not fit in the document")]
    IdOverflow(PersistentId),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
