//! Session and container error types
//!
//! Session errors are schema mistakes made while building a session; they
//! point at a programming error rather than a runtime condition. Container
//! errors are the distinct stages a `.om` write can fail at.

use std::path::PathBuf;
use thiserror::Error;

/// Session schema error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A channel with the same name and group already exists
    #[error("Duplicate channel: {name} (group: {group})")]
    DuplicateChannel {
        /// Channel name
        name: String,
        /// Channel group, empty when ungrouped
        group: String,
    },

    /// Lookup of a channel that was never added
    #[error("Unknown channel: {name} (group: {group})")]
    UnknownChannel {
        /// Channel name
        name: String,
        /// Channel group, empty when ungrouped
        group: String,
    },

    /// Channel id that does not belong to this session
    #[error("Invalid channel id: {0}")]
    InvalidChannelId(u32),

    /// Channel table exceeded the id space
    #[error("Too many channels: {0}")]
    TooManyChannels(String),
}

impl SessionError {
    pub(crate) fn duplicate(name: &str, group: Option<&str>) -> Self {
        SessionError::DuplicateChannel {
            name: name.to_string(),
            group: group.unwrap_or_default().to_string(),
        }
    }

    /// Build an unknown-channel error for `name` in `group`.
    pub fn unknown(name: &str, group: Option<&str>) -> Self {
        SessionError::UnknownChannel {
            name: name.to_string(),
            group: group.unwrap_or_default().to_string(),
        }
    }
}

/// Container write error
///
/// Each variant names the stage of the write that failed.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The archive file could not be created
    #[error("Failed to create container {path}: {source}")]
    Create {
        /// Path that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The manifest could not be encoded
    #[error("Failed to encode meta.xml: {0}")]
    Manifest(String),

    /// An archive entry could not be written
    #[error("Failed to write container entry {entry}: {reason}")]
    Entry {
        /// Entry name inside the archive
        entry: String,
        /// Failure description
        reason: String,
    },

    /// The archive could not be finalized
    #[error("Failed to finalize container: {0}")]
    Finish(String),

    /// The finished archive could not be moved to its destination
    #[error("Failed to move container into place at {path}: {source}")]
    Persist {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ContainerError {
    pub(crate) fn entry(entry: &str, reason: impl ToString) -> Self {
        ContainerError::Entry {
            entry: entry.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short stage name, used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            ContainerError::Create { .. } => "create",
            ContainerError::Manifest(_) => "manifest",
            ContainerError::Entry { .. } => "entry",
            ContainerError::Finish(_) => "finish",
            ContainerError::Persist { .. } => "persist",
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for container writes
pub type ContainerResult<T> = Result<T, ContainerError>;
