//! Everything one rotation pass needs, passed explicitly

use std::fmt;
use std::sync::Arc;

use crate::core::{Clock, Profile, RetireMode, SystemClock};
use crate::record::ExpirationStore;
use crate::traits::{CredentialSink, KeyService};

/// Per-invocation switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationOptions {
    /// Rotate even if the record says the key is still valid
    pub force: bool,
    /// How still-active keys are retired; inactive keys are always deleted
    pub retire_mode: RetireMode,
}

impl RotationOptions {
    /// Set `force`
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the retire mode for active keys
    pub fn with_retire_mode(mut self, mode: RetireMode) -> Self {
        self.retire_mode = mode;
        self
    }
}

/// Collaborators and settings for one coordinator pass
///
/// # Example
///
/// ```rust,ignore
/// let ctx = RotationContext::new(profile, Arc::new(iam), Arc::new(sink), store)
///     .with_options(RotationOptions::default().with_force(true));
/// let outcome = RotationCoordinator::new(&ctx).run().await?;
/// ```
#[derive(Clone)]
pub struct RotationContext {
    /// Profile being rotated
    pub profile: Profile,
    /// Remote key operations
    pub key_service: Arc<dyn KeyService>,
    /// Destination for the new key pair
    pub credential_sink: Arc<dyn CredentialSink>,
    /// Time source for expiration checks and record fallback
    pub clock: Arc<dyn Clock>,
    /// Expiration records and their lock paths
    pub store: ExpirationStore,
    /// Per-invocation switches
    pub options: RotationOptions,
}

impl RotationContext {
    /// Context with the system clock and default options
    pub fn new(
        profile: Profile,
        key_service: Arc<dyn KeyService>,
        credential_sink: Arc<dyn CredentialSink>,
        store: ExpirationStore,
    ) -> Self {
        Self {
            profile,
            key_service,
            credential_sink,
            clock: Arc::new(SystemClock),
            store,
            options: RotationOptions::default(),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the options
    pub fn with_options(mut self, options: RotationOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for RotationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationContext")
            .field("profile", &self.profile)
            .field("clock", &self.clock)
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
