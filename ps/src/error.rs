//! Error types for planning operations

use thiserror::Error;

/// Errors from the persistence port
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage IO error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored value under {key} is corrupt: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage rejected write: {0}")]
    Rejected(String),
}

/// Errors from planning store commands
///
/// Every command validates before it mutates, so any variant other than
/// `Persistence` means the in-memory state is unchanged.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Name is empty")]
    EmptyName,

    #[error("Name is too long ({len} characters, max {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("Member already exists: {0}")]
    Duplicate(String),

    #[error("Note text is empty")]
    EmptyNote,

    #[error("No current user set")]
    NoCurrentUser,

    #[error("{0} is not a weekday")]
    Weekend(chrono::NaiveDate),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0} is already in this slot")]
    AlreadyPresent(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Import rejected: {0}")]
    ImportFormat(String),
}

/// Coarse error category used by callers to pick a notification style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    AlreadyPresent,
    Persistence,
    ImportFormat,
}

impl PlanningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyName
            | Self::NameTooLong { .. }
            | Self::Duplicate(_)
            | Self::EmptyNote
            | Self::NoCurrentUser
            | Self::Weekend(_)
            | Self::InvalidKey(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyPresent(_) => ErrorKind::AlreadyPresent,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::ImportFormat(_) => ErrorKind::ImportFormat,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not-found"),
            Self::AlreadyPresent => write!(f, "already-present"),
            Self::Persistence => write!(f, "persistence"),
            Self::ImportFormat => write!(f, "import-format"),
        }
    }
}

/// Result alias for planning commands
pub type PlanningResult<T> = Result<T, PlanningError>;
