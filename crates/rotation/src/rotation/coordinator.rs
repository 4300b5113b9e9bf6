//! Rotation Coordinator
//!
//! Drives one pass through [`RotationState`]. The lock handle is owned by
//! the pass, so commit or abandon happens on every path: explicitly on the
//! normal ones, through `Drop` if anything unwinds.

use chrono::{DateTime, Utc};

use super::context::RotationContext;
use super::state::RotationState;
use crate::core::{
    KeyMetadata, KeyPair, KeyServiceError, LockError, RetireMode, RotationError, RotationResult,
};
use crate::lock::LockHandle;
use crate::record;

/// How a successful pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Another process holds the lock; nothing was done
    SkippedLockBusy,

    /// The current key is still within its lifetime
    NotDue,

    /// A new key was created and handed to the credential sink
    Rotated {
        /// Id of the new access key
        access_key_id: String,
        /// Instant written (or meant to be written) to the record
        rotated_at: DateTime<Utc>,
        /// Whether the record was published; if not, the next pass rotates again
        record_committed: bool,
    },
}

impl RotationOutcome {
    /// Check if a new key was created
    pub fn is_rotated(&self) -> bool {
        matches!(self, RotationOutcome::Rotated { .. })
    }
}

/// Runs one rotation pass over a [`RotationContext`]
#[derive(Debug)]
pub struct RotationCoordinator<'a> {
    ctx: &'a RotationContext,
    state: RotationState,
}

impl<'a> RotationCoordinator<'a> {
    /// Coordinator in [`RotationState::Idle`]
    pub fn new(ctx: &'a RotationContext) -> Self {
        Self {
            ctx,
            state: RotationState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Run the pass.
    ///
    /// Contention and "not yet due" are successful outcomes. Errors are
    /// fatal: the lock has been abandoned and the previous record is intact.
    #[tracing::instrument(name = "rotation", skip_all, fields(profile = %self.ctx.profile))]
    pub async fn run(&mut self) -> RotationResult<RotationOutcome> {
        let ctx = self.ctx;
        let profile = &ctx.profile;
        let store = &ctx.store;

        self.advance(RotationState::LockAcquiring);
        let lock_path = store.lock_path(profile);
        let mut lock = match LockHandle::acquire(lock_path, store.record_path(profile)) {
            Ok(lock) => lock,
            Err(LockError::Contended { path }) => {
                tracing::info!(
                    lock = %path.display(),
                    "rotation lock exists, another rotation is in progress; skipping"
                );
                self.advance(RotationState::SkippedLockBusy);
                return Ok(RotationOutcome::SkippedLockBusy);
            }
            Err(e) => {
                self.advance(RotationState::Aborted);
                return Err(RotationError::Lock(e));
            }
        };
        self.advance(RotationState::LockHeld);

        let now = ctx.clock.now();
        if ctx.options.force {
            tracing::debug!("force set, skipping expiration check");
        } else if !store.is_expired(profile, now) {
            tracing::debug!("credentials not yet expired");
            release(lock);
            self.advance(RotationState::Released);
            return Ok(RotationOutcome::NotDue);
        }

        tracing::info!("!!! IT'S TIME TO ROTATE THE AWS KEYS FOR PROFILE: {profile} !!!");
        self.advance(RotationState::KeyRotating);

        let keys = match self.replace_keys().await {
            Ok(keys) => keys,
            Err(e) => return Err(self.abort(lock, e)),
        };

        if let Err(e) = self.store_credentials(&keys).await {
            tracing::error!(
                access_key_id = %keys.access_key_id,
                "new access key was created but not stored; delete or record it manually"
            );
            return Err(self.abort(lock, e));
        }

        let rotated_at = keys.created_at.unwrap_or_else(|| ctx.clock.now());
        let access_key_id = keys.access_key_id;

        if let Err(e) = lock.stage(record::encode(rotated_at).as_bytes()) {
            tracing::warn!(error = %e, "unable to stage expiration record; next run will rotate again");
            release(lock);
            self.advance(RotationState::Released);
            return Ok(RotationOutcome::Rotated {
                access_key_id,
                rotated_at,
                record_committed: false,
            });
        }
        self.advance(RotationState::RecordStaged);

        let record_committed = match lock.commit() {
            Ok(()) => {
                self.advance(RotationState::Committed);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to update expiration record; next run will rotate again");
                self.advance(RotationState::Released);
                false
            }
        };

        tracing::info!(%access_key_id, rotated_at = %rotated_at, "rotation complete");
        Ok(RotationOutcome::Rotated {
            access_key_id,
            rotated_at,
            record_committed,
        })
    }

    /// Retire every listed key, then create the replacement.
    ///
    /// The full listing is collected before the first retirement, so a
    /// listing error on any page leaves the remote side untouched.
    async fn replace_keys(&self) -> RotationResult<KeyPair> {
        let profile = &self.ctx.profile;
        let service = &self.ctx.key_service;

        let existing = self.list_all_keys().await.map_err(|source| RotationError::ListKeys {
            profile: profile.to_string(),
            source,
        })?;
        tracing::debug!(count = existing.len(), "listed existing access keys");

        let mut retire_failures = 0_usize;
        for key in &existing {
            let mode = self.retire_mode_for(key);
            tracing::debug!(key_id = %key.key_id, status = %key.status, %mode, "retiring access key");
            if let Err(e) = service.retire_key(&key.key_id, mode).await {
                retire_failures += 1;
                tracing::warn!(key_id = %key.key_id, %mode, error = %e, "failed to retire access key, continuing");
            }
        }

        let keys = service
            .create_key(profile)
            .await
            .map_err(|source| RotationError::CreateKey {
                profile: profile.to_string(),
                source,
            })?;

        tracing::debug!(
            access_key_id = %keys.access_key_id,
            retired = existing.len() - retire_failures,
            retire_failures,
            "created new access key"
        );
        Ok(keys)
    }

    async fn list_all_keys(&self) -> Result<Vec<KeyMetadata>, KeyServiceError> {
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .ctx
                .key_service
                .list_keys(&self.ctx.profile, marker.clone())
                .await?;
            keys.extend(page.keys);

            match page.next_marker {
                Some(next) if marker.as_deref() == Some(next.as_str()) => {
                    return Err(KeyServiceError::MalformedResponse {
                        operation: "ListKeys",
                        reason: format!("continuation marker '{next}' repeated"),
                    });
                }
                Some(next) => marker = Some(next),
                None => return Ok(keys),
            }
        }
    }

    async fn store_credentials(&self, keys: &KeyPair) -> RotationResult<()> {
        let profile = &self.ctx.profile;
        let sink = &self.ctx.credential_sink;

        sink.update_credentials(profile, keys)
            .await
            .map_err(|source| RotationError::UpdateCredentials {
                profile: profile.to_string(),
                access_key_id: keys.access_key_id.clone(),
                source,
            })?;

        sink.persist()
            .await
            .map_err(|source| RotationError::PersistCredentials {
                profile: profile.to_string(),
                access_key_id: keys.access_key_id.clone(),
                source,
            })
    }

    fn retire_mode_for(&self, key: &KeyMetadata) -> RetireMode {
        if key.status.is_inactive() {
            RetireMode::Delete
        } else {
            self.ctx.options.retire_mode
        }
    }

    fn abort(&mut self, lock: LockHandle, error: RotationError) -> RotationError {
        release(lock);
        self.advance(RotationState::Aborted);
        error
    }

    fn advance(&mut self, next: RotationState) {
        let allowed = self.state.transition_to(next);
        debug_assert!(
            allowed.is_some(),
            "invalid rotation transition {} -> {next}",
            self.state
        );
        tracing::trace!(from = %self.state, to = %next, terminal = next.is_terminal(), "rotation state");
        self.state = allowed.unwrap_or(next);
    }
}

/// Abandon the lock, logging rather than failing if the delete goes wrong
fn release(lock: LockHandle) {
    if let Err(e) = lock.abandon() {
        tracing::warn!(error = %e, "failed to remove rotation lock; remove it manually to unblock rotation");
    }
}
