//! Command-line arguments

use std::time::Duration;

use clap::Parser;
use keyrot_rotation::{RetireMode, RotationOptions};

/// Rotate the access keys of a credentials profile when they are due.
///
/// Safe to run from cron or a shell hook: concurrent invocations skip while
/// another one holds the rotation lock. A profile name piped on stdin takes
/// precedence over `--profile` and the environment.
#[derive(Parser, Debug)]
#[command(name = "keyrot", about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Delete old keys instead of deactivating them
    #[arg(long)]
    pub delete: bool,

    /// Rotate even if the current key has not expired
    #[arg(long)]
    pub force: bool,

    /// Print the version, then continue
    #[arg(long)]
    pub version: bool,

    /// Profile to rotate
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Milliseconds to wait for a profile name on stdin
    #[arg(
        long,
        hide = true,
        env = "KEYROT_STDIN_TIMEOUT_MS",
        value_name = "MS",
        default_value_t = crate::stdin::STDIN_TIMEOUT_MS
    )]
    pub stdin_timeout_ms: u64,
}

impl Cli {
    /// Rotation switches selected by the flags
    pub fn options(&self) -> RotationOptions {
        let mode = if self.delete {
            RetireMode::Delete
        } else {
            RetireMode::Deactivate
        };
        RotationOptions::default()
            .with_force(self.force)
            .with_retire_mode(mode)
    }

    /// How long to wait for a piped profile name
    pub fn stdin_timeout(&self) -> Duration {
        Duration::from_millis(self.stdin_timeout_ms)
    }

    /// Default log filter for the chosen verbosity
    pub fn log_directives(&self) -> &'static str {
        if self.verbose {
            "warn,keyrot=debug,keyrot_rotation=debug"
        } else {
            "warn,keyrot=info,keyrot_rotation=info"
        }
    }
}
