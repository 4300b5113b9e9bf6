use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use secrecy::ExposeSecret;

use crate::core::{
    Clock, KeyPage, KeyPair, KeyServiceError, Profile, RetireMode, SinkError,
};
use crate::traits::{CredentialSink, DurationSource, KeyService};

/// Scripted key service with a call journal
///
/// Pages are served in order, one per `list_keys` call, regardless of the
/// marker passed in; the markers are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockKeyService {
    pages: Vec<KeyPage>,
    fail_list_at: Mutex<Option<usize>>,
    fail_create: AtomicBool,
    failing_retire: Mutex<HashSet<String>>,
    created_at: Mutex<Option<DateTime<Utc>>>,
    markers: Mutex<Vec<Option<String>>>,
    retired: Mutex<Vec<(String, RetireMode)>>,
    create_calls: AtomicU32,
}

impl MockKeyService {
    /// Service with no existing keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Service listing `pages` in order
    pub fn with_pages(pages: Vec<KeyPage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Fail the listing call for page `index` (0-based)
    pub fn fail_list_at(&self, index: usize) {
        *self.fail_list_at.lock() = Some(index);
    }

    /// Fail every `create_key` call
    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Fail retirement of `key_id`
    pub fn fail_retire(&self, key_id: impl Into<String>) {
        self.failing_retire.lock().insert(key_id.into());
    }

    /// Creation time reported for new keys; `None` leaves it unset
    pub fn set_created_at(&self, created_at: Option<DateTime<Utc>>) {
        *self.created_at.lock() = created_at;
    }

    /// Markers passed to `list_keys`, in call order
    pub fn markers(&self) -> Vec<Option<String>> {
        self.markers.lock().clone()
    }

    /// Number of `list_keys` calls
    pub fn list_calls(&self) -> usize {
        self.markers.lock().len()
    }

    /// Retirement requests, in call order (including failed ones)
    pub fn retired(&self) -> Vec<(String, RetireMode)> {
        self.retired.lock().clone()
    }

    /// Number of `create_key` calls (including failed ones)
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Total number of remote calls of any kind
    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.retired.lock().len() + self.create_calls() as usize
    }
}

#[async_trait]
impl KeyService for MockKeyService {
    async fn list_keys(
        &self,
        _profile: &Profile,
        marker: Option<String>,
    ) -> Result<KeyPage, KeyServiceError> {
        let index = {
            let mut markers = self.markers.lock();
            markers.push(marker);
            markers.len() - 1
        };

        if *self.fail_list_at.lock() == Some(index) {
            return Err(KeyServiceError::request("ListKeys", "mock failure"));
        }

        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn retire_key(&self, key_id: &str, mode: RetireMode) -> Result<(), KeyServiceError> {
        self.retired.lock().push((key_id.to_string(), mode));

        if self.failing_retire.lock().contains(key_id) {
            let operation = match mode {
                RetireMode::Deactivate => "UpdateKey",
                RetireMode::Delete => "DeleteKey",
            };
            return Err(KeyServiceError::request(operation, "mock failure"));
        }
        Ok(())
    }

    async fn create_key(&self, _profile: &Profile) -> Result<KeyPair, KeyServiceError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(KeyServiceError::request("CreateKey", "mock failure"));
        }

        Ok(KeyPair::new(
            format!("AKIAMOCK{n:04}"),
            format!("mock-secret-{n}"),
            *self.created_at.lock(),
        ))
    }
}

/// Credentials captured by [`MockCredentialSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Profile name
    pub profile: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret access key, exposed for assertions
    pub secret_access_key: String,
}

type PersistHook = Box<dyn Fn() + Send + Sync>;

/// Credential sink that records instead of writing
#[derive(Default)]
pub struct MockCredentialSink {
    staged: Mutex<Option<StoredCredentials>>,
    persisted: Mutex<Vec<StoredCredentials>>,
    fail_update: AtomicBool,
    fail_persist: AtomicBool,
    on_persist: Mutex<Option<PersistHook>>,
}

impl fmt::Debug for MockCredentialSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockCredentialSink")
            .field("staged", &self.staged)
            .field("persisted", &self.persisted)
            .field("fail_update", &self.fail_update)
            .field("fail_persist", &self.fail_persist)
            .field("on_persist", &self.on_persist.lock().is_some())
            .finish()
    }
}

impl MockCredentialSink {
    /// Create new mock sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `update_credentials` fail
    pub fn fail_update(&self) {
        self.fail_update.store(true, Ordering::SeqCst);
    }

    /// Make `persist` fail
    pub fn fail_persist(&self) {
        self.fail_persist.store(true, Ordering::SeqCst);
    }

    /// Run `hook` after each successful `persist`
    pub fn on_persist(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_persist.lock() = Some(Box::new(hook));
    }

    /// Everything successfully persisted, in order
    pub fn persisted(&self) -> Vec<StoredCredentials> {
        self.persisted.lock().clone()
    }

    /// Staged but not yet persisted credentials
    pub fn staged(&self) -> Option<StoredCredentials> {
        self.staged.lock().clone()
    }
}

#[async_trait]
impl CredentialSink for MockCredentialSink {
    async fn update_credentials(
        &self,
        profile: &Profile,
        keys: &KeyPair,
    ) -> Result<(), SinkError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(SinkError::Other("mock update failure".into()));
        }

        *self.staged.lock() = Some(StoredCredentials {
            profile: profile.to_string(),
            access_key_id: keys.access_key_id.clone(),
            secret_access_key: keys.secret_access_key.expose_secret().to_string(),
        });
        Ok(())
    }

    async fn persist(&self) -> Result<(), SinkError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(SinkError::Other("mock persist failure".into()));
        }

        let staged = self.staged.lock().take().ok_or(SinkError::NotStaged)?;
        self.persisted.lock().push(staged);

        if let Some(hook) = self.on_persist.lock().as_ref() {
            hook();
        }
        Ok(())
    }
}

/// Duration source with a default and per-profile overrides
#[derive(Debug, Clone)]
pub struct FixedDurations {
    default: Duration,
    per_profile: HashMap<String, Duration>,
}

impl FixedDurations {
    /// Every profile gets `default`
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            per_profile: HashMap::new(),
        }
    }

    /// Override the duration for one profile
    pub fn with_profile(mut self, profile: impl Into<String>, duration: Duration) -> Self {
        self.per_profile.insert(profile.into(), duration);
        self
    }
}

impl DurationSource for FixedDurations {
    fn duration_for(&self, profile: &Profile) -> Duration {
        self.per_profile
            .get(profile.as_str())
            .copied()
            .unwrap_or(self.default)
    }
}

/// Settable clock
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    /// Clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock frozen at Unix second `secs`
    pub fn at_timestamp(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
