//! Session lifecycle commands: init, status, advance, end.

use anyhow::{Context as _, Result};
use console::style;
use phasegate::checkpoint::is_valid_name;
use phasegate::phase::WorkflowPhase;

use super::Context;

pub fn cmd_init(ctx: &Context, feature: &str) -> Result<()> {
    if !is_valid_name(feature) {
        anyhow::bail!("Invalid feature name: '{}'", feature);
    }

    let states = ctx.states();
    if let Some(existing) = states.read() {
        println!(
            "Replacing active session for '{}' (phase: {})",
            existing.feature, existing.phase
        );
    }

    for dir in [
        ctx.session.checkpoint_dir(feature),
        ctx.session.log_dir(feature),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let state = states
        .initialize(feature)
        .context("Failed to initialize session")?;

    println!(
        "{} session for '{}' (phase: {}, role: {})",
        style("Started").green().bold(),
        state.feature,
        state.phase,
        state.role
    );
    println!("State:       {}", states.path().display());
    println!("Checkpoints: {}", ctx.session.checkpoint_dir(feature).display());
    Ok(())
}

pub fn cmd_status(ctx: &Context) -> Result<()> {
    let states = ctx.states();

    println!();
    println!("Workflow Status");
    println!("===============");
    println!();

    let Some(state) = states.read() else {
        println!("Session: {}", style("inactive").dim());
        println!();
        println!("Run 'phasegate init <feature>' to start a session.");
        println!();
        return Ok(());
    };

    let now = chrono::Utc::now();
    println!("Feature:  {}", style(&state.feature).bold());
    print!("Phase:    ");
    for (i, phase) in WorkflowPhase::all().iter().enumerate() {
        if i > 0 {
            print!(" → ");
        }
        if *phase == state.phase {
            print!("{}", style(phase.as_str()).cyan().bold());
        } else if *phase < state.phase {
            print!("{}", style(phase.as_str()).green());
        } else {
            print!("{}", style(phase.as_str()).dim());
        }
    }
    println!();
    println!("Role:     {}", state.role);
    if let Some(previous) = state.previous_phase {
        println!("Previous: {}", previous);
    }
    println!(
        "Complete: {}",
        if state.phase_complete { "yes" } else { "no" }
    );
    println!(
        "Started:  {} ({} min ago)",
        state.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        state.age(now).num_minutes()
    );
    if let Some(at) = state.last_transition_at {
        println!("Last transition: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if !state.transitions.is_empty() {
        println!();
        println!("Transitions:");
        for t in &state.transitions {
            println!(
                "  {} → {} at {} ({})",
                t.from,
                t.to,
                t.at.format("%H:%M:%S"),
                t.trigger
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_advance(ctx: &Context, to: WorkflowPhase) -> Result<()> {
    let state = ctx
        .states()
        .advance(to, false, "orchestrator")
        .with_context(|| format!("Cannot advance to {}", to))?;

    println!(
        "{} {} → {} (role: {})",
        style("Advanced").green().bold(),
        state.previous_phase.map(|p| p.as_str()).unwrap_or("-"),
        state.phase,
        state.role
    );
    Ok(())
}

pub fn cmd_end(ctx: &Context) -> Result<()> {
    if ctx.states().clear()? {
        println!("Session ended");
    } else {
        println!("No active session");
    }
    Ok(())
}
