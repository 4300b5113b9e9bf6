//! Rotation State Machine
//!
//! Tracks where a single coordinator pass is.

use std::fmt;

/// State of a rotation pass
///
/// # State Transitions
///
/// ```text
/// Idle → LockAcquiring → LockHeld → KeyRotating → RecordStaged → Committed
///              │            │  │         │  │           │
///              │            │  └→ Released ←┘───────────┘   (lock deleted, no record update)
///              │            └──────→ Aborted ←┘               (fatal error, lock abandoned)
///              ├→ SkippedLockBusy
///              └→ Aborted                                     (lock I/O error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationState {
    /// Nothing attempted yet
    #[default]
    Idle,

    /// Creating the lock file
    LockAcquiring,

    /// Lock held, expiration not yet decided
    LockHeld,

    /// Retiring old keys, creating and storing the new one
    KeyRotating,

    /// New record written into the lock file
    RecordStaged,

    /// Lock renamed onto the record
    Committed,

    /// Lock deleted without publishing a record
    Released,

    /// Fatal error, lock abandoned
    Aborted,

    /// Another process holds the lock
    SkippedLockBusy,
}

impl RotationState {
    /// Check if transition to the target state is valid
    #[must_use]
    pub fn can_transition_to(&self, target: RotationState) -> bool {
        use RotationState::*;

        match (self, target) {
            // Forward progress
            (Idle, LockAcquiring) => true,
            (LockAcquiring, LockHeld) => true,
            (LockHeld, KeyRotating) => true,
            (KeyRotating, RecordStaged) => true,
            (RecordStaged, Committed) => true,

            // Contention
            (LockAcquiring, SkippedLockBusy) => true,

            // Lock removed without a record update: not due, or bookkeeping failed
            (LockHeld, Released) => true,
            (KeyRotating, Released) => true,
            (RecordStaged, Released) => true,

            // Fatal errors
            (LockAcquiring, Aborted) => true,
            (LockHeld, Aborted) => true,
            (KeyRotating, Aborted) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Validate a transition, returning the target state when allowed
    pub fn transition_to(&self, target: RotationState) -> Option<RotationState> {
        self.can_transition_to(target).then_some(target)
    }

    /// Check if state is terminal (no more transitions possible)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RotationState::Committed
                | RotationState::Released
                | RotationState::Aborted
                | RotationState::SkippedLockBusy
        )
    }
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationState::Idle => write!(f, "idle"),
            RotationState::LockAcquiring => write!(f, "lock_acquiring"),
            RotationState::LockHeld => write!(f, "lock_held"),
            RotationState::KeyRotating => write!(f, "key_rotating"),
            RotationState::RecordStaged => write!(f, "record_staged"),
            RotationState::Committed => write!(f, "committed"),
            RotationState::Released => write!(f, "released"),
            RotationState::Aborted => write!(f, "aborted"),
            RotationState::SkippedLockBusy => write!(f, "skipped_lock_busy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_forward_transitions() {
        assert!(RotationState::Idle.can_transition_to(RotationState::LockAcquiring));
        assert!(RotationState::LockAcquiring.can_transition_to(RotationState::LockHeld));
        assert!(RotationState::LockHeld.can_transition_to(RotationState::KeyRotating));
        assert!(RotationState::KeyRotating.can_transition_to(RotationState::RecordStaged));
        assert!(RotationState::RecordStaged.can_transition_to(RotationState::Committed));
    }

    #[test]
    fn test_abort_only_while_active() {
        assert!(RotationState::LockHeld.can_transition_to(RotationState::Aborted));
        assert!(RotationState::KeyRotating.can_transition_to(RotationState::Aborted));

        // Once the record is staged the rotation itself has succeeded
        assert!(!RotationState::RecordStaged.can_transition_to(RotationState::Aborted));
        assert!(!RotationState::Idle.can_transition_to(RotationState::Aborted));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip states
        assert!(!RotationState::Idle.can_transition_to(RotationState::LockHeld));
        assert!(!RotationState::LockHeld.can_transition_to(RotationState::Committed));
        assert!(!RotationState::LockHeld.can_transition_to(RotationState::SkippedLockBusy));

        // Cannot leave terminal states
        assert!(!RotationState::Committed.can_transition_to(RotationState::Idle));
        assert!(!RotationState::Aborted.can_transition_to(RotationState::LockAcquiring));
        assert!(!RotationState::SkippedLockBusy.can_transition_to(RotationState::LockHeld));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RotationState::Idle.is_terminal());
        assert!(!RotationState::LockHeld.is_terminal());
        assert!(!RotationState::RecordStaged.is_terminal());
        assert!(RotationState::Committed.is_terminal());
        assert!(RotationState::Released.is_terminal());
        assert!(RotationState::Aborted.is_terminal());
        assert!(RotationState::SkippedLockBusy.is_terminal());
    }

    #[test]
    fn test_transition_validation() {
        let state = RotationState::LockAcquiring;
        assert_eq!(
            state.transition_to(RotationState::LockHeld),
            Some(RotationState::LockHeld)
        );
        assert_eq!(state.transition_to(RotationState::Committed), None);
    }
}
