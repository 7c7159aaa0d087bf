//! Checkpoint relay commands: wait, create, list, get, info.

use anyhow::{Context as _, Result};
use phasegate::checkpoint::PutOutcome;
use std::time::Duration;

use super::Context;

pub async fn cmd_wait(ctx: &Context, pattern: &str, timeout: Option<u64>) -> Result<()> {
    let monitor = ctx.monitor()?;
    let timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.monitor.default_timeout());

    let content = monitor.wait_for(pattern, timeout).await?;

    println!("Found checkpoint matching {}", pattern);
    println!("{}", "-".repeat(40));
    println!("{}", content);
    Ok(())
}

pub fn cmd_create(ctx: &Context, name: &str, content: &str, metadata: Option<&str>) -> Result<()> {
    let metadata = metadata
        .map(|raw| serde_json::from_str::<serde_json::Value>(raw).context("Invalid --metadata JSON"))
        .transpose()?;

    match ctx.monitor()?.create(name, content, metadata)? {
        PutOutcome::Created => println!("Created checkpoint: {}", name),
        PutOutcome::AlreadyExists => println!("Checkpoint already exists: {}", name),
    }
    Ok(())
}

pub fn cmd_list(ctx: &Context) -> Result<()> {
    let names = ctx.monitor()?.list()?;
    if names.is_empty() {
        println!("No checkpoints found");
        return Ok(());
    }

    println!("Checkpoints:");
    for name in names {
        println!("  - {}", name);
    }
    Ok(())
}

pub fn cmd_get(ctx: &Context, name: &str) -> Result<()> {
    match ctx.monitor()?.get(name)? {
        Some(content) => {
            print!("{}", content);
            Ok(())
        }
        None => anyhow::bail!("Checkpoint not found: {}", name),
    }
}

pub fn cmd_info(ctx: &Context) -> Result<()> {
    let info = ctx.monitor()?.info()?;
    let json = serde_json::to_string_pretty(&info).context("Failed to serialize run info")?;
    println!("{}", json);
    Ok(())
}
