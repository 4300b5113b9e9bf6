//! Profile identifier

use std::fmt;

/// Name used when nothing else selects a profile
pub const DEFAULT_PROFILE: &str = "default";

/// Environment variables consulted by [`Profile::resolve`], in order
pub const PROFILE_ENV_VARS: [&str; 2] = ["AWS_PROFILE", "AWS_DEFAULT_PROFILE"];

/// Named credential set being rotated.
///
/// An empty name is allowed; it addresses the `default` sections of the
/// config and credentials files but keeps its own (empty) record suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Profile(String);

impl Profile {
    /// Wrap a profile name as-is
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Pick the profile from an explicit value, then the environment.
    ///
    /// The first non-empty of `explicit`, `AWS_PROFILE`, `AWS_DEFAULT_PROFILE`
    /// wins; otherwise [`DEFAULT_PROFILE`].
    pub fn resolve<F>(explicit: Option<&str>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = explicit.filter(|n| !n.is_empty()) {
            return Self::new(name);
        }

        PROFILE_ENV_VARS
            .iter()
            .filter_map(|var| env(var))
            .find(|name| !name.is_empty())
            .map_or_else(|| Self::new(DEFAULT_PROFILE), Self::new)
    }

    /// Raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this addresses the default profile
    pub fn is_default(&self) -> bool {
        self.0.is_empty() || self.0 == DEFAULT_PROFILE
    }

    /// Section name in the shared config file
    pub fn config_section(&self) -> String {
        if self.is_default() {
            DEFAULT_PROFILE.to_string()
        } else {
            format!("profile {}", self.0)
        }
    }

    /// Section name in the shared credentials file
    pub fn credentials_section(&self) -> &str {
        if self.0.is_empty() {
            DEFAULT_PROFILE
        } else {
            &self.0
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Profile {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Profile {
    fn from(name: String) -> Self {
        Self(name)
    }
}
