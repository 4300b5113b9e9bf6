//! Error types for rotation
//!
//! The hierarchy mirrors the collaborators:
//! - [`LockError`]: lock file contention and I/O
//! - [`KeyServiceError`]: remote list / retire / create calls
//! - [`SinkError`]: staging and persisting the new key pair
//! - [`RotationError`]: the fatal outcomes of one coordinator pass
//!
//! Contention is a [`LockError`] variant but never becomes a
//! [`RotationError`]; the coordinator turns it into a skipped pass.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the exclusive lock file
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock, or a crashed run left it behind
    #[error("lock file {} already exists", path.display())]
    Contended {
        /// Lock file path
        path: PathBuf,
    },

    /// Creating, writing, renaming or removing the lock file failed
    #[error("lock file {} {operation} failed: {source}", path.display())]
    Io {
        /// Lock file path
        path: PathBuf,
        /// What was being done (`create`, `stage`, `commit`, `abandon`)
        operation: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    /// Whether this is plain contention rather than a failure
    pub fn is_contended(&self) -> bool {
        matches!(self, LockError::Contended { .. })
    }
}

/// Errors returned by a [`KeyService`](crate::traits::KeyService)
#[derive(Debug, Clone, Error)]
pub enum KeyServiceError {
    /// The remote call failed
    #[error("{operation} failed: {reason}")]
    Request {
        /// Remote operation name, e.g. `ListAccessKeys`
        operation: &'static str,
        /// Provider-specific failure description
        reason: String,
    },

    /// The call succeeded but the response lacked a required field
    #[error("{operation} returned a malformed response: {reason}")]
    MalformedResponse {
        /// Remote operation name
        operation: &'static str,
        /// What was missing or invalid
        reason: String,
    },
}

impl KeyServiceError {
    /// Shorthand for [`KeyServiceError::Request`]
    pub fn request(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Request {
            operation,
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`CredentialSink`](crate::traits::CredentialSink)
#[derive(Debug, Error)]
pub enum SinkError {
    /// Reading the current credentials document failed
    #[error("failed to read credentials file {}: {source}", path.display())]
    Read {
        /// Credentials file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The current credentials document is not valid
    #[error("failed to parse credentials file {}: {reason}", path.display())]
    Parse {
        /// Credentials file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Writing the credentials document failed
    #[error("failed to write credentials file {}: {source}", path.display())]
    Write {
        /// Credentials file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Another writer kept the credentials file locked
    #[error("credentials file {} is locked by another writer", path.display())]
    Busy {
        /// Lock file path
        path: PathBuf,
    },

    /// `persist` was called with nothing staged
    #[error("no credentials staged for persist")]
    NotStaged,

    /// Sink-specific failure (used by non-file sinks)
    #[error("credential sink failed: {0}")]
    Other(String),
}

/// Fatal outcomes of a rotation pass
///
/// Every variant aborts the pass: the lock is abandoned and the previous
/// expiration record is left untouched.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The lock could not be created for a reason other than contention
    #[error("cannot acquire rotation lock: {0}")]
    Lock(#[source] LockError),

    /// Listing the existing keys failed; nothing was mutated
    #[error("listing keys for profile '{profile}' failed: {source}")]
    ListKeys {
        /// Profile being rotated
        profile: String,
        /// Key service error
        #[source]
        source: KeyServiceError,
    },

    /// Creating the replacement key failed
    #[error("creating a new key for profile '{profile}' failed: {source}")]
    CreateKey {
        /// Profile being rotated
        profile: String,
        /// Key service error
        #[source]
        source: KeyServiceError,
    },

    /// The new key could not be handed to the credential sink
    #[error("updating credentials for profile '{profile}' failed (new key {access_key_id} is orphaned): {source}")]
    UpdateCredentials {
        /// Profile being rotated
        profile: String,
        /// Id of the key that now exists remotely but was not stored
        access_key_id: String,
        /// Sink error
        #[source]
        source: SinkError,
    },

    /// The credential sink could not persist the new key
    #[error("persisting credentials for profile '{profile}' failed (new key {access_key_id} is orphaned): {source}")]
    PersistCredentials {
        /// Profile being rotated
        profile: String,
        /// Id of the key that now exists remotely but was not stored
        access_key_id: String,
        /// Sink error
        #[source]
        source: SinkError,
    },
}

impl RotationError {
    /// Access key created remotely but never persisted locally, if any
    pub fn orphaned_key_id(&self) -> Option<&str> {
        match self {
            RotationError::UpdateCredentials { access_key_id, .. }
            | RotationError::PersistCredentials { access_key_id, .. } => Some(access_key_id),
            _ => None,
        }
    }
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;
