//! Collaborator traits
//!
//! The coordinator never talks to a network or a credentials file directly;
//! it goes through these seams so every transition can be driven by fakes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{KeyPage, KeyPair, KeyServiceError, Profile, RetireMode, SinkError};

/// Remote identity service holding the access keys
///
/// # Example
///
/// ```rust,ignore
/// use keyrot_rotation::{KeyService, KeyPage, KeyPair, Profile, RetireMode};
///
/// #[async_trait]
/// impl KeyService for MyIdentityApi {
///     async fn list_keys(&self, _: &Profile, marker: Option<String>) -> Result<KeyPage, KeyServiceError> {
///         let page = self.client.list(marker).await?;
///         Ok(KeyPage { keys: page.keys, next_marker: page.next })
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Fetch one page of keys, starting at `marker` (`None` for the first page)
    async fn list_keys(
        &self,
        profile: &Profile,
        marker: Option<String>,
    ) -> Result<KeyPage, KeyServiceError>;

    /// Deactivate or delete one key
    async fn retire_key(&self, key_id: &str, mode: RetireMode) -> Result<(), KeyServiceError>;

    /// Create the replacement key pair
    async fn create_key(&self, profile: &Profile) -> Result<KeyPair, KeyServiceError>;
}

/// Where consumers read the new key pair from
///
/// `update_credentials` stages, `persist` makes it durable. From the
/// coordinator's point of view the pair is all-or-nothing: an error from
/// either call aborts the rotation.
#[async_trait]
pub trait CredentialSink: Send + Sync {
    /// Stage `keys` as the credentials of `profile`
    async fn update_credentials(&self, profile: &Profile, keys: &KeyPair)
    -> Result<(), SinkError>;

    /// Durably write whatever was staged
    async fn persist(&self) -> Result<(), SinkError>;
}

/// Allowed lifetime of a key, per profile.
///
/// Infallible by contract: implementations log and fall back to their
/// default when configuration is missing or unreadable.
pub trait DurationSource: Send + Sync + fmt::Debug {
    /// Lifetime for `profile`
    fn duration_for(&self, profile: &Profile) -> Duration;
}
