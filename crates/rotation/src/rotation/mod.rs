//! Rotation coordination
//!
//! [`RotationCoordinator`] runs one pass over a [`RotationContext`]:
//! lock → expiration check → key-service transaction → credential sink →
//! staged record → commit. Fatal errors abandon the lock and leave the
//! previous record in place.

mod context;
mod coordinator;
mod state;

pub use context::{RotationContext, RotationOptions};
pub use coordinator::{RotationCoordinator, RotationOutcome};
pub use state::RotationState;
