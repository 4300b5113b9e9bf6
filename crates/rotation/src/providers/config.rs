//! Key lifetime from the shared config file
//!
//! ```ini
//! [default]
//! aws_api_key_duration = 8h
//!
//! [profile ci]
//! aws_api_key_duration = 30m
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use crate::core::Profile;
use crate::traits::DurationSource;

/// Config key holding a profile's key lifetime
pub const CREDENTIAL_DURATION_KEY: &str = "aws_api_key_duration";

/// Lifetime used when the config file says nothing usable
pub const CREDENTIAL_DURATION_DEFAULT: Duration = Duration::from_secs(12 * 60 * 60);

/// [`DurationSource`] reading [`CREDENTIAL_DURATION_KEY`] from an INI file
///
/// The file is read on every lookup. Any problem (missing file, unknown
/// profile, unparsable value) falls back to the default with a warning;
/// a profile without the key gets the default silently.
#[derive(Debug, Clone)]
pub struct ConfigFileDurations {
    path: PathBuf,
    default: Duration,
}

impl ConfigFileDurations {
    /// Source reading `path`, falling back to [`CREDENTIAL_DURATION_DEFAULT`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default: CREDENTIAL_DURATION_DEFAULT,
        }
    }

    /// Replace the fallback lifetime
    pub fn with_default(mut self, default: Duration) -> Self {
        self.default = default;
        self
    }

    /// Config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup(&self, profile: &Profile) -> Option<Duration> {
        let ini = match Ini::load_from_file(&self.path) {
            Ok(ini) => ini,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "unable to load config file, using default key duration"
                );
                return None;
            }
        };

        let section = profile.config_section();
        let Some(props) = ini.section(Some(section.as_str())) else {
            tracing::warn!(
                path = %self.path.display(),
                %section,
                "profile not found in config file, using default key duration"
            );
            return None;
        };

        let Some(raw) = props.get(CREDENTIAL_DURATION_KEY) else {
            tracing::debug!(%section, "no {CREDENTIAL_DURATION_KEY} set, using default");
            return None;
        };

        match humantime::parse_duration(raw.trim()) {
            Ok(duration) => Some(duration),
            Err(e) => {
                tracing::warn!(
                    %section,
                    value = raw,
                    error = %e,
                    "unable to parse {CREDENTIAL_DURATION_KEY}, using default key duration"
                );
                None
            }
        }
    }
}

impl DurationSource for ConfigFileDurations {
    fn duration_for(&self, profile: &Profile) -> Duration {
        let duration = self.lookup(profile).unwrap_or(self.default);
        tracing::debug!(
            %profile,
            duration = %humantime::format_duration(duration),
            "key duration"
        );
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    const CONFIG: &str = "\
[default]
region = us-east-1
aws_api_key_duration = 8h

[profile ci]
aws_api_key_duration = 90m

[profile plain]
region = eu-west-1

[profile broken]
aws_api_key_duration = eventually
";

    fn source(dir: &TempDir, content: &str) -> ConfigFileDurations {
        let path = dir.path().join("config");
        std::fs::write(&path, content).unwrap();
        ConfigFileDurations::new(path)
    }

    #[rstest]
    #[case::default_profile("default", 8 * 3600)]
    #[case::empty_name("", 8 * 3600)]
    #[case::named_profile("ci", 90 * 60)]
    #[case::key_missing("plain", 12 * 3600)]
    #[case::bad_value("broken", 12 * 3600)]
    #[case::unknown_profile("nope", 12 * 3600)]
    fn test_duration_lookup(#[case] profile: &str, #[case] secs: u64) {
        let dir = TempDir::new().unwrap();
        let durations = source(&dir, CONFIG);

        assert_eq!(
            durations.duration_for(&Profile::new(profile)),
            Duration::from_secs(secs)
        );
    }

    #[test]
    fn test_missing_file_uses_default() {
        let dir = TempDir::new().unwrap();
        let durations = ConfigFileDurations::new(dir.path().join("absent"));

        assert_eq!(
            durations.duration_for(&Profile::new("default")),
            CREDENTIAL_DURATION_DEFAULT
        );
    }

    #[test]
    fn test_no_default_section() {
        let dir = TempDir::new().unwrap();
        let durations = source(&dir, "[profile other]\naws_api_key_duration = 1h\n")
            .with_default(Duration::from_secs(60));

        assert_eq!(
            durations.duration_for(&Profile::new("default")),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_reads_file_on_each_lookup() {
        let dir = TempDir::new().unwrap();
        let durations = source(&dir, "[default]\naws_api_key_duration = 1h\n");
        let profile = Profile::new("default");
        assert_eq!(durations.duration_for(&profile), Duration::from_secs(3600));

        std::fs::write(durations.path(), "[default]\naws_api_key_duration = 2h\n").unwrap();
        assert_eq!(durations.duration_for(&profile), Duration::from_secs(7200));
    }
}
