//! Concrete collaborators
//!
//! - [`SharedPaths`]: where the shared config and credentials files live
//! - [`ConfigFileDurations`]: per-profile key lifetime from the config file
//! - [`SharedCredentialsFile`]: credential sink writing the credentials file
//! - [`IamKeyService`]: key service over the AWS SDK (feature `iam`)

pub mod config;
pub mod credentials;
#[cfg(feature = "iam")]
pub mod iam;
pub mod paths;

pub use config::{CREDENTIAL_DURATION_DEFAULT, CREDENTIAL_DURATION_KEY, ConfigFileDurations};
pub use credentials::SharedCredentialsFile;
#[cfg(feature = "iam")]
pub use iam::IamKeyService;
pub use paths::SharedPaths;
