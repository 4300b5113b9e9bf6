//! Core types for key rotation

mod clock;
mod error;
mod key;
mod profile;

pub use clock::{Clock, SystemClock};
pub use error::{KeyServiceError, LockError, RotationError, RotationResult, SinkError};
pub use key::{KeyMetadata, KeyPage, KeyPair, KeyStatus, RetireMode};
pub use profile::Profile;
