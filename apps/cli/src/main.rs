//! keyrot - scheduled access-key rotation
//!
//! One invocation is one pass over one profile. Exit status is 0 when the
//! keys were rotated, were not due, or another invocation held the lock.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use keyrot_rotation::prelude::*;
use tracing_subscriber::EnvFilter;

mod cli;
mod stdin;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("keyrot {}", env!("CARGO_PKG_VERSION"));
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directives()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();

    match run(&cli).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "pass finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RotationOutcome> {
    let piped = stdin::read_profile(cli.stdin_timeout());
    let explicit = piped.as_deref().or(cli.profile.as_deref());
    let profile = Profile::resolve(explicit, |var| std::env::var(var).ok());

    let paths = SharedPaths::from_env();
    tracing::debug!(
        %profile,
        config = %paths.config_file.display(),
        credentials = %paths.credentials_file.display(),
        "resolved profile and files"
    );

    let store = ExpirationStore::new(
        paths.record_dir(),
        Arc::new(ConfigFileDurations::new(&paths.config_file)),
    );
    let ctx = RotationContext::new(
        profile.clone(),
        Arc::new(IamKeyService::new(profile)),
        Arc::new(SharedCredentialsFile::new(&paths.credentials_file)),
        store,
    )
    .with_options(cli.options());

    let outcome = RotationCoordinator::new(&ctx).run().await?;
    Ok(outcome)
}
