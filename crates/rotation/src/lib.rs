//! Keyrot Rotation - lock-guarded rotation of long-lived access keys
//!
//! One invocation is one idempotent pass: take the per-profile lock file,
//! decide whether the last rotation is older than the configured lifetime,
//! retire the old keys, create a new one, hand it to the credential sink and
//! move the staged expiration record into place.
//!
//! # Features
//!
//! - **Exclusive lock** - `create_new` lock file, committed by rename
//! - **Fail-open expiration** - a missing or garbled record means "rotate"
//! - **Pluggable collaborators** - [`KeyService`], [`CredentialSink`],
//!   [`DurationSource`] and [`Clock`] are traits; `iam` wires the AWS SDK
#![forbid(unsafe_code)]

/// Core types, errors, and primitives
pub mod core;
/// Exclusive lock file with commit-by-rename
pub mod lock;
/// Concrete collaborators (config file, credentials file, IAM)
pub mod providers;
/// Expiration record store
pub mod record;
/// Rotation coordinator and its state machine
pub mod rotation;
/// Collaborator traits
pub mod traits;

/// Fakes for exercising the coordinator without a network or real files
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// ── Root re-exports ─────────────────────────────────────────────────────────

pub use crate::core::{
    Clock, KeyMetadata, KeyPage, KeyPair, KeyServiceError, KeyStatus, LockError, Profile,
    RetireMode, RotationError, RotationResult, SinkError, SystemClock,
};
pub use crate::lock::LockHandle;
pub use crate::record::ExpirationStore;
pub use crate::rotation::{
    RotationContext, RotationCoordinator, RotationOptions, RotationOutcome, RotationState,
};
pub use crate::traits::{CredentialSink, DurationSource, KeyService};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::{
        Clock, KeyPair, KeyStatus, Profile, RetireMode, RotationError, RotationResult,
        SystemClock,
    };
    pub use crate::providers::{ConfigFileDurations, SharedCredentialsFile, SharedPaths};
    pub use crate::record::ExpirationStore;
    pub use crate::rotation::{RotationContext, RotationCoordinator, RotationOptions, RotationOutcome};
    pub use crate::traits::{CredentialSink, DurationSource, KeyService};

    #[cfg(feature = "iam")]
    pub use crate::providers::IamKeyService;
}
