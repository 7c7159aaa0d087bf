//! Host hook entry point.

use anyhow::Result;
use phasegate::config::CoordConfig;
use phasegate::hooks::{HookEvent, HookResponse, HookRunner};
use phasegate::logging;
use phasegate::session::Session;
use std::io::Write;
use std::time::Duration;
use tokio::io::AsyncReadExt;

use super::super::Cli;

/// Read the event from stdin, print the decision, and exit.
///
/// Never returns an error: a broken config falls back to defaults, and the
/// process exits without waiting on a handler that overran its time cap.
pub async fn cmd_hook(cli: &Cli, session: Session, event: HookEvent) -> Result<()> {
    let guard = logging::init(if cli.verbose { "debug" } else { "warn" }, None).ok();

    let mut config = match CoordConfig::load_or_default(&session.config_path()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "invalid config; using defaults");
            CoordConfig::default()
        }
    };
    config.apply_env();
    config.apply_cli(cli.feature.as_deref(), cli.role);

    let cap = Duration::from_secs(config.hooks.timeout_secs);
    let mut raw = String::new();
    let read = tokio::time::timeout(cap, tokio::io::stdin().read_to_string(&mut raw)).await;
    let response = match read {
        Ok(Ok(_)) => HookRunner::new(session, config).run(event, &raw).await,
        Ok(Err(e)) => {
            tracing::warn!(%event, error = %e, "could not read hook input");
            HookResponse::pass()
        }
        Err(_) => {
            tracing::warn!(%event, "timed out reading hook input");
            HookResponse::pass()
        }
    };

    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", response.to_json());
    let _ = stdout.flush();
    drop(stdout);
    drop(guard);
    std::process::exit(0)
}
