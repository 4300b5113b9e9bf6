//! Key-service data types

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// Status of an existing access key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Key can still authenticate
    Active,
    /// Key was deactivated by an earlier rotation
    Inactive,
}

impl KeyStatus {
    /// Parse a provider status string.
    ///
    /// Only a case-insensitive `inactive` maps to [`KeyStatus::Inactive`];
    /// anything else is treated as still active so it gets retired.
    pub fn parse(status: &str) -> Self {
        if status.trim().eq_ignore_ascii_case("inactive") {
            KeyStatus::Inactive
        } else {
            KeyStatus::Active
        }
    }

    /// Check if key is inactive
    pub fn is_inactive(&self) -> bool {
        matches!(self, KeyStatus::Inactive)
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Active => write!(f, "Active"),
            KeyStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

/// How an old key is retired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetireMode {
    /// Mark the key inactive; it is deleted on the next rotation
    #[default]
    Deactivate,
    /// Remove the key outright
    Delete,
}

impl fmt::Display for RetireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetireMode::Deactivate => write!(f, "deactivate"),
            RetireMode::Delete => write!(f, "delete"),
        }
    }
}

/// One key as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Access key id
    pub key_id: String,
    /// Current status
    pub status: KeyStatus,
    /// Creation instant, when the service reports one
    pub created_at: Option<DateTime<Utc>>,
}

impl KeyMetadata {
    /// Create key metadata without a creation time
    pub fn new(key_id: impl Into<String>, status: KeyStatus) -> Self {
        Self {
            key_id: key_id.into(),
            status,
            created_at: None,
        }
    }
}

/// One page of a key listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    /// Keys on this page
    pub keys: Vec<KeyMetadata>,
    /// Continuation marker; `None` when the listing is exhausted
    pub next_marker: Option<String>,
}

impl KeyPage {
    /// Final page
    pub fn last(keys: Vec<KeyMetadata>) -> Self {
        Self {
            keys,
            next_marker: None,
        }
    }

    /// Page followed by more
    pub fn truncated(keys: Vec<KeyMetadata>, next_marker: impl Into<String>) -> Self {
        Self {
            keys,
            next_marker: Some(next_marker.into()),
        }
    }
}

/// Freshly created access key pair.
///
/// Lives only for one rotation: handed to the credential sink, then dropped.
pub struct KeyPair {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: SecretString,
    /// Creation instant as reported by the service
    pub created_at: Option<DateTime<Utc>>,
}

impl KeyPair {
    /// Create a key pair
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        created_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            created_at,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("access_key_id", &self.access_key_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
