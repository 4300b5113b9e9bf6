//! Shared credentials file sink

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use ini::Ini;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;

use crate::core::{KeyPair, LockError, Profile, SinkError};
use crate::lock::LockHandle;
use crate::traits::CredentialSink;

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const SESSION_TOKEN: &str = "aws_session_token";

/// Attempts to take the credentials file lock before giving up
const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// [`CredentialSink`] writing the INI credentials file
///
/// `update_credentials` checks that the current document is readable and
/// stages the profile's new key pair. `persist` takes `{file}.lock`, reads
/// the document again, replaces that profile's keys and writes the result
/// atomically with owner-only permissions. Other sections and keys are kept.
///
/// The file is shared by every profile while rotation locks are per
/// profile, so two profiles may persist at the same time. The re-read under
/// the file lock keeps one writer from dropping the other's new key. A lock
/// left behind by a crashed writer makes `persist` fail with
/// [`SinkError::Busy`] until it is removed.
pub struct SharedCredentialsFile {
    path: PathBuf,
    staged: Mutex<Option<PendingKeys>>,
}

/// Key pair waiting for `persist`
struct PendingKeys {
    section: String,
    access_key_id: String,
    secret_access_key: SecretString,
}

impl PendingKeys {
    fn apply(&self, ini: &mut Ini) {
        let section = self.section.as_str();

        // a session token from earlier credentials would not match the new key
        ini.delete_from(Some(section), SESSION_TOKEN);
        ini.with_section(Some(section))
            .set(ACCESS_KEY_ID, self.access_key_id.as_str())
            .set(SECRET_ACCESS_KEY, self.secret_access_key.expose_secret());
    }
}

impl SharedCredentialsFile {
    /// Sink for the credentials file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: Mutex::new(None),
        }
    }

    /// Credentials file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        sibling(&self.path, "lock")
    }

    async fn load(&self) -> Result<Ini, SinkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "credentials file missing, starting empty");
                return Ok(Ini::new());
            }
            Err(source) => {
                return Err(SinkError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        Ini::load_from_str(&content).map_err(|e| SinkError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    async fn lock(&self) -> Result<LockHandle, SinkError> {
        let lock_path = self.lock_path();
        let mut attempt = 1;

        loop {
            match LockHandle::acquire(&lock_path, &self.path) {
                Ok(lock) => return Ok(lock),
                Err(LockError::Contended { .. }) if attempt < LOCK_ATTEMPTS => {
                    attempt += 1;
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(LockError::Contended { path }) => return Err(SinkError::Busy { path }),
                Err(LockError::Io { path, source, .. }) => {
                    return Err(SinkError::Write { path, source });
                }
            }
        }
    }

    async fn write_locked(&self, pending: &PendingKeys) -> Result<(), SinkError> {
        let mut ini = self.load().await?;
        pending.apply(&mut ini);

        let mut buf = Vec::new();
        ini.write_to(&mut buf).map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })?;

        atomic_write(&self.path, &buf)
            .await
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

impl fmt::Debug for SharedCredentialsFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCredentialsFile")
            .field("path", &self.path)
            .field("staged", &self.staged.lock().is_some())
            .finish()
    }
}

#[async_trait]
impl CredentialSink for SharedCredentialsFile {
    async fn update_credentials(&self, profile: &Profile, keys: &KeyPair) -> Result<(), SinkError> {
        self.load().await?;

        let section = profile.credentials_section().to_string();
        tracing::debug!(%section, access_key_id = %keys.access_key_id, "staged credentials");
        *self.staged.lock() = Some(PendingKeys {
            section,
            access_key_id: keys.access_key_id.clone(),
            secret_access_key: SecretString::from(keys.secret_access_key.expose_secret().to_string()),
        });
        Ok(())
    }

    async fn persist(&self) -> Result<(), SinkError> {
        let pending = self.staged.lock().take().ok_or(SinkError::NotStaged)?;

        let lock = self.lock().await?;
        let result = self.write_locked(&pending).await;
        if let Err(e) = lock.abandon() {
            tracing::warn!(error = %e, "failed to remove credentials lock");
        }
        result?;

        tracing::debug!(path = %self.path.display(), "credentials file written");
        Ok(())
    }
}

/// `{path}.{suffix}` next to `path`
fn sibling(path: &Path, suffix: impl fmt::Display) -> PathBuf {
    path.with_file_name(format!(
        "{}.{suffix}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("credentials"),
    ))
}

/// Write `data` to a private sibling temp file, then rename it over `path`.
/// Readers see the old document or the new one.
async fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let temp_path = sibling(path, format_args!("tmp.{}", std::process::id()));

    let result = async {
        let mut file = create_private(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    result
}

/// Create `path` with mode 0600 on unix.
///
/// The mode is part of the create call, so the file never exists with
/// wider permissions. A leftover file at `path` is removed first.
async fn create_private(path: &Path) -> io::Result<tokio::fs::File> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }
    options.open(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn keys(id: &str, secret: &str) -> KeyPair {
        KeyPair::new(id, secret, None)
    }

    fn read(path: &Path) -> Ini {
        Ini::load_from_file(path).unwrap()
    }

    #[tokio::test]
    async fn test_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let sink = SharedCredentialsFile::new(dir.path().join("credentials"));

        sink.update_credentials(&Profile::new("default"), &keys("AKIANEW", "s3cr3t/+x"))
            .await
            .unwrap();
        sink.persist().await.unwrap();

        let ini = read(sink.path());
        let section = ini.section(Some("default")).unwrap();
        assert_eq!(section.get(ACCESS_KEY_ID), Some("AKIANEW"));
        assert_eq!(section.get(SECRET_ACCESS_KEY), Some("s3cr3t/+x"));
        assert!(!sink.lock_path().exists());
    }

    #[tokio::test]
    async fn test_replaces_profile_and_keeps_others() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(
            &path,
            "[default]\naws_access_key_id = AKIAOTHER\naws_secret_access_key = other\n\n\
             [ci]\naws_access_key_id = AKIAOLD\naws_secret_access_key = old\n\
             aws_session_token = stale\nregion = us-west-2\n",
        )
        .unwrap();
        let sink = SharedCredentialsFile::new(&path);

        sink.update_credentials(&Profile::new("ci"), &keys("AKIANEW", "new"))
            .await
            .unwrap();
        sink.persist().await.unwrap();

        let ini = read(&path);
        let ci = ini.section(Some("ci")).unwrap();
        assert_eq!(ci.get(ACCESS_KEY_ID), Some("AKIANEW"));
        assert_eq!(ci.get(SECRET_ACCESS_KEY), Some("new"));
        assert_eq!(ci.get(SESSION_TOKEN), None);
        assert_eq!(ci.get("region"), Some("us-west-2"));

        let default = ini.section(Some("default")).unwrap();
        assert_eq!(default.get(ACCESS_KEY_ID), Some("AKIAOTHER"));
    }

    #[tokio::test]
    async fn test_overlapping_profiles_keep_both_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials");
        let ci = SharedCredentialsFile::new(&path);
        let ops = SharedCredentialsFile::new(&path);

        // both stage against the same (empty) document before either persists
        ci.update_credentials(&Profile::new("ci"), &keys("AKIACI", "ci-secret"))
            .await
            .unwrap();
        ops.update_credentials(&Profile::new("ops"), &keys("AKIAOPS", "ops-secret"))
            .await
            .unwrap();
        ci.persist().await.unwrap();
        ops.persist().await.unwrap();

        let ini = read(&path);
        assert_eq!(
            ini.section(Some("ci")).unwrap().get(ACCESS_KEY_ID),
            Some("AKIACI")
        );
        assert_eq!(
            ini.section(Some("ops")).unwrap().get(ACCESS_KEY_ID),
            Some("AKIAOPS")
        );
    }

    #[tokio::test]
    async fn test_held_file_lock_is_busy() {
        let dir = TempDir::new().unwrap();
        let sink = SharedCredentialsFile::new(dir.path().join("credentials"));
        std::fs::write(sink.lock_path(), b"").unwrap();

        sink.update_credentials(&Profile::new("default"), &keys("AKIANEW", "new"))
            .await
            .unwrap();
        let err = sink.persist().await.unwrap_err();

        assert!(matches!(err, SinkError::Busy { .. }));
        assert!(!sink.path().exists());
        assert!(sink.lock_path().exists());
    }

    #[tokio::test]
    async fn test_nothing_written_before_persist() {
        let dir = TempDir::new().unwrap();
        let sink = SharedCredentialsFile::new(dir.path().join("credentials"));

        sink.update_credentials(&Profile::new("default"), &keys("AKIANEW", "new"))
            .await
            .unwrap();

        assert!(!sink.path().exists());
    }

    #[tokio::test]
    async fn test_unparsable_file_is_rejected_before_staging() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, "[default\naws_access_key_id = AKIAOLD\n").unwrap();
        let sink = SharedCredentialsFile::new(&path);

        let err = sink
            .update_credentials(&Profile::new("default"), &keys("AKIANEW", "new"))
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Parse { .. }));
        assert!(matches!(sink.persist().await, Err(SinkError::NotStaged)));
    }

    #[tokio::test]
    async fn test_persist_without_update() {
        let dir = TempDir::new().unwrap();
        let sink = SharedCredentialsFile::new(dir.path().join("credentials"));

        let err = sink.persist().await.unwrap_err();
        assert!(matches!(err, SinkError::NotStaged));
    }

    #[tokio::test]
    async fn test_missing_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        let sink = SharedCredentialsFile::new(dir.path().join("gone").join("credentials"));

        sink.update_credentials(&Profile::new("default"), &keys("AKIANEW", "new"))
            .await
            .unwrap();
        let err = sink.persist().await.unwrap_err();

        assert!(matches!(err, SinkError::Write { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let sink = SharedCredentialsFile::new(dir.path().join("credentials"));
        sink.update_credentials(&Profile::new("default"), &keys("AKIANEW", "new"))
            .await
            .unwrap();
        sink.persist().await.unwrap();

        let mode = std::fs::metadata(sink.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_file_is_private_when_created() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let temp = sibling(&dir.path().join("credentials"), "tmp.1");

        // nothing written yet: the mode must already be owner-only
        let file = create_private(&temp).await.unwrap();
        let mode = std::fs::metadata(&temp).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        drop(file);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_leftover_temp_file_is_replaced() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let temp = sibling(&dir.path().join("credentials"), "tmp.1");
        std::fs::write(&temp, b"stale").unwrap();
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o644)).unwrap();

        drop(create_private(&temp).await.unwrap());

        let meta = std::fs::metadata(&temp).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        assert_eq!(meta.len(), 0);
    }
}
