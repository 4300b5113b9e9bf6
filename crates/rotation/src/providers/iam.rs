//! IAM access-key service
//!
//! Talks to IAM through `aws-sdk-iam` with the profile's own credentials.
//! The SDK client is built on first use, so a pass that stops at the lock
//! or at the expiration check never resolves credentials or a region.

use std::fmt;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::primitives::DateTime as SmithyDateTime;
use aws_sdk_iam::types::StatusType;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use crate::core::{
    KeyMetadata, KeyPage, KeyPair, KeyServiceError, KeyStatus, Profile, RetireMode,
};
use crate::traits::KeyService;

/// [`KeyService`] backed by IAM
pub struct IamKeyService {
    profile: Profile,
    client: OnceCell<IamClient>,
}

impl IamKeyService {
    /// Service authenticating as `profile`; the client is built lazily
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            client: OnceCell::new(),
        }
    }

    /// Service over a prebuilt client
    pub fn from_client(profile: Profile, client: IamClient) -> Self {
        Self {
            profile,
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> &IamClient {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if !self.profile.as_str().is_empty() {
                    loader = loader.profile_name(self.profile.as_str());
                }
                let sdk_config = loader.load().await;
                tracing::debug!(
                    profile = %self.profile,
                    region = ?sdk_config.region(),
                    "IAM client initialized"
                );
                IamClient::new(&sdk_config)
            })
            .await
    }
}

impl fmt::Debug for IamKeyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamKeyService")
            .field("profile", &self.profile)
            .field("client_initialized", &self.client.initialized())
            .finish()
    }
}

fn request_error<E>(operation: &'static str, err: E) -> KeyServiceError
where
    E: std::error::Error,
{
    KeyServiceError::request(operation, DisplayErrorContext(err).to_string())
}

fn to_utc(instant: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(instant.secs(), instant.subsec_nanos())
}

#[async_trait]
impl KeyService for IamKeyService {
    #[tracing::instrument(skip(self), fields(provider = "IAM"))]
    async fn list_keys(
        &self,
        profile: &Profile,
        marker: Option<String>,
    ) -> Result<KeyPage, KeyServiceError> {
        let output = self
            .client()
            .await
            .list_access_keys()
            .set_marker(marker)
            .send()
            .await
            .map_err(|e| request_error("ListAccessKeys", e))?;

        let keys = output
            .access_key_metadata()
            .iter()
            .filter_map(|meta| {
                let key_id = meta.access_key_id()?;
                Some(KeyMetadata {
                    key_id: key_id.to_string(),
                    status: meta
                        .status()
                        .map_or(KeyStatus::Active, |s| KeyStatus::parse(s.as_str())),
                    created_at: meta.create_date().and_then(to_utc),
                })
            })
            .collect();

        let next_marker = if output.is_truncated() {
            let marker = output.marker().ok_or_else(|| KeyServiceError::MalformedResponse {
                operation: "ListAccessKeys",
                reason: "truncated listing without a marker".into(),
            })?;
            Some(marker.to_string())
        } else {
            None
        };

        Ok(KeyPage { keys, next_marker })
    }

    #[tracing::instrument(skip(self), fields(provider = "IAM"))]
    async fn retire_key(&self, key_id: &str, mode: RetireMode) -> Result<(), KeyServiceError> {
        let client = self.client().await;
        match mode {
            RetireMode::Deactivate => {
                client
                    .update_access_key()
                    .access_key_id(key_id)
                    .status(StatusType::Inactive)
                    .send()
                    .await
                    .map_err(|e| request_error("UpdateAccessKey", e))?;
            }
            RetireMode::Delete => {
                client
                    .delete_access_key()
                    .access_key_id(key_id)
                    .send()
                    .await
                    .map_err(|e| request_error("DeleteAccessKey", e))?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(provider = "IAM"))]
    async fn create_key(&self, profile: &Profile) -> Result<KeyPair, KeyServiceError> {
        let output = self
            .client()
            .await
            .create_access_key()
            .send()
            .await
            .map_err(|e| request_error("CreateAccessKey", e))?;

        let key = output
            .access_key()
            .ok_or_else(|| KeyServiceError::MalformedResponse {
                operation: "CreateAccessKey",
                reason: "response carried no access key".into(),
            })?;

        Ok(KeyPair::new(
            key.access_key_id(),
            key.secret_access_key(),
            key.create_date().and_then(to_utc),
        ))
    }
}
