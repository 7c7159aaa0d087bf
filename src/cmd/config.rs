//! Configuration view and validation commands (`phasegate config`).

use anyhow::Result;
use phasegate::config::CoordConfig;

use super::super::ConfigCommands;
use super::Context;

fn print_effective(config: &CoordConfig) {
    println!("[gate]");
    println!("  protected_prefixes = {:?}", config.gate.protected_prefixes);
    println!("  test_markers = {:?}", config.gate.test_markers);
    println!("  helper_markers = {:?}", config.gate.helper_markers);
    println!(
        "  verifier_denied_commands = {:?}",
        config.gate.verifier_denied_commands
    );
    println!("  fail_closed = {}", config.gate.fail_closed);
    println!();
    println!("[monitor]");
    println!("  initial_interval_ms = {}", config.monitor.initial_interval_ms);
    println!("  max_interval_ms = {}", config.monitor.max_interval_ms);
    println!("  backoff_factor = {}", config.monitor.backoff_factor);
    println!("  progress_every_secs = {}", config.monitor.progress_every_secs);
    println!("  default_timeout_secs = {}", config.monitor.default_timeout_secs);
    println!();
    println!("[hooks]");
    println!("  timeout_secs = {}", config.hooks.timeout_secs);
    println!();
    println!("[session]");
    println!("  stale_after_hours = {}", config.session.stale_after_hours);
    println!();
}

pub fn cmd_config(ctx: &Context, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = ctx.session.config_path();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Phasegate Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            print_effective(&ctx.config);

            println!("Effective values (with env/CLI overrides):");
            println!(
                "  feature = {}",
                ctx.feature().as_deref().unwrap_or("(none)")
            );
            println!("  role = {}", ctx.role());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No config.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = ctx.config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("config.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            CoordConfig::default().save(&config_path)?;

            println!("Created config.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [gate] protected_prefixes, test_markers, fail_closed");
            println!("  - [monitor] polling intervals and default timeout");
            println!("  - [hooks] timeout_secs");
            println!();
        }
    }

    Ok(())
}
