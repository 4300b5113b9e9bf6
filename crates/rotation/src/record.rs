//! Expiration record store
//!
//! One record per profile at `{dir}/.aws_credentials_expiration_{profile}`, holding the Unix
//! time (decimal seconds) of the last successful rotation. The duration is
//! added at check time only; the record never stores a due date.
//!
//! Reads fail open: a missing, unreadable or unparsable record counts as
//! expired, so a damaged record causes a spare rotation rather than none.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::core::Profile;
use crate::traits::DurationSource;

/// File name prefix of expiration records
pub const RECORD_FILE_PREFIX: &str = ".aws_credentials_expiration";

/// Suffix appended to the record path to form the lock path
pub const LOCK_SUFFIX: &str = ".lock";

/// Reads expiration records and decides whether a profile is due
#[derive(Debug, Clone)]
pub struct ExpirationStore {
    dir: PathBuf,
    durations: Arc<dyn DurationSource>,
}

impl ExpirationStore {
    /// Store rooted at `dir` with the standard record prefix
    pub fn new(dir: impl Into<PathBuf>, durations: Arc<dyn DurationSource>) -> Self {
        Self {
            dir: dir.into(),
            durations,
        }
    }

    /// Record path for `profile`
    pub fn record_path(&self, profile: &Profile) -> PathBuf {
        self.dir.join(format!("{RECORD_FILE_PREFIX}_{}", profile.as_str()))
    }

    /// Lock path for `profile`: the record path plus [`LOCK_SUFFIX`]
    pub fn lock_path(&self, profile: &Profile) -> PathBuf {
        let mut path = self.record_path(profile).into_os_string();
        path.push(LOCK_SUFFIX);
        PathBuf::from(path)
    }

    /// Allowed key lifetime for `profile`
    pub fn duration_for(&self, profile: &Profile) -> Duration {
        self.durations.duration_for(profile)
    }

    /// Instant of the last recorded rotation, if the record is usable
    pub fn recorded_at(&self, profile: &Profile) -> Option<DateTime<Utc>> {
        let path = self.record_path(profile);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(
                    record = %path.display(),
                    error = %e,
                    "could not read expiration file, returning expired"
                );
                return None;
            }
        };

        let parsed = decode(&content);
        if parsed.is_none() {
            tracing::warn!(
                record = %path.display(),
                value = %content.trim(),
                "unable to parse expiration value as an integer timestamp, returning expired"
            );
        }
        parsed
    }

    /// Whether `profile` is due for rotation at `now`.
    ///
    /// True when the record is unusable, or when strictly more than the
    /// configured duration has passed since it was written.
    pub fn is_expired(&self, profile: &Profile, now: DateTime<Utc>) -> bool {
        let Some(recorded) = self.recorded_at(profile) else {
            return true;
        };

        let lifetime = self.duration_for(profile);
        let elapsed = now.signed_duration_since(recorded);
        let expired = elapsed > TimeDelta::from_std(lifetime).unwrap_or(TimeDelta::MAX);

        tracing::debug!(
            profile = %profile,
            recorded_at = %recorded,
            lifetime = %humantime::format_duration(lifetime),
            expired,
            "checked expiration record"
        );
        expired
    }
}

/// Record content for `instant`: decimal Unix seconds, nothing else
pub fn encode(instant: DateTime<Utc>) -> String {
    instant.timestamp().to_string()
}

/// Parse record content written by [`encode`]; surrounding whitespace is ignored
pub fn decode(content: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = content.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedDurations;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    const HOUR: u64 = 3600;

    fn store(dir: &TempDir, lifetime: Duration) -> ExpirationStore {
        ExpirationStore::new(dir.path(), Arc::new(FixedDurations::new(lifetime)))
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_paths() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(HOUR));
        let profile = Profile::new("ops");

        assert_eq!(
            store.record_path(&profile),
            dir.path().join(".aws_credentials_expiration_ops")
        );
        assert_eq!(
            store.lock_path(&profile),
            dir.path().join(".aws_credentials_expiration_ops.lock")
        );
        assert_eq!(
            store.record_path(&Profile::new("")),
            dir.path().join(".aws_credentials_expiration_")
        );
    }

    #[test]
    fn test_missing_record_is_expired() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(12 * HOUR));
        assert!(store.is_expired(&Profile::new("ops"), now()));
    }

    #[rstest]
    #[case("abc123")]
    #[case("")]
    #[case("12.5")]
    #[case("1700000000 1700000001")]
    fn test_unparsable_record_is_expired(#[case] content: &str) {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(12 * HOUR));
        let profile = Profile::new("ops");
        fs::write(store.record_path(&profile), content).unwrap();

        assert!(store.is_expired(&profile, now()));
    }

    #[rstest]
    #[case::well_past(24 * HOUR as i64, true)]
    #[case::just_past(2 * HOUR as i64 + 1, true)]
    #[case::boundary(2 * HOUR as i64, false)]
    #[case::recent(HOUR as i64, false)]
    #[case::future(-(HOUR as i64), false)]
    fn test_expiry_against_duration(#[case] age_secs: i64, #[case] expected: bool) {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(2 * HOUR));
        let profile = Profile::new("ops");
        let recorded = now() - TimeDelta::seconds(age_secs);
        fs::write(store.record_path(&profile), encode(recorded)).unwrap();

        assert_eq!(store.is_expired(&profile, now()), expected);
    }

    #[test]
    fn test_trailing_newline_is_accepted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, Duration::from_secs(2 * HOUR));
        let profile = Profile::new("ops");
        fs::write(store.record_path(&profile), "1700000000\n").unwrap();

        assert_eq!(store.recorded_at(&profile), Some(now()));
        assert!(!store.is_expired(&profile, now()));
    }

    #[test]
    fn test_encode_is_plain_seconds() {
        assert_eq!(encode(now()), "1700000000");
        assert_eq!(decode(" 1700000000\n"), Some(now()));
    }
}
