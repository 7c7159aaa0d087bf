//! Hook dispatch.
//!
//! Every hook must answer. Work runs on the blocking pool under a wall-clock
//! cap; an elapsed cap, a panic, or an internal error all resolve to
//! `{"continue": true}`.

use super::types::{HookEvent, HookInput, HookResponse};
use crate::audit::{EventLog, SubagentEvent};
use crate::checkpoint::{FsCheckpointStore, is_valid_name};
use crate::config::CoordConfig;
use crate::detector::TransitionDetector;
use crate::gate::{Action, Decision, RolePolicy};
use crate::session::Session;
use crate::state::StateManager;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HookRunner {
    session: Session,
    config: CoordConfig,
}

impl HookRunner {
    pub fn new(session: Session, config: CoordConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.hooks.timeout_secs)
    }

    /// Handle one hook invocation within the configured time cap.
    pub async fn run(&self, event: HookEvent, raw_input: &str) -> HookResponse {
        let runner = self.clone();
        let raw = raw_input.to_string();
        capped(event, self.timeout(), move || runner.dispatch(event, &raw)).await
    }

    /// Handle one hook invocation synchronously.
    pub fn dispatch(&self, event: HookEvent, raw_input: &str) -> HookResponse {
        let input = match HookInput::parse(raw_input) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(%event, error = %e, "malformed hook input");
                return self.malformed(event, None);
            }
        };

        match event {
            HookEvent::PreToolUse => self.pre_tool_use(&input),
            HookEvent::PostToolUse => self.post_tool_use(&input),
            HookEvent::SessionStart => self.session_start(),
            HookEvent::SubagentStop => self.subagent_stop(),
        }
    }

    /// Answer for input the gate cannot judge.
    fn malformed(&self, event: HookEvent, tool: Option<&str>) -> HookResponse {
        if event != HookEvent::PreToolUse || !self.config.gate.fail_closed {
            return HookResponse::pass();
        }
        // Fail closed only matters while a session is live.
        let Some(state) = StateManager::new(&self.session).read() else {
            return HookResponse::pass();
        };
        HookResponse::block(json!({
            "decision": "deny",
            "reason": "Role restriction: tool input could not be interpreted",
            "role": state.role,
            "tool": tool.unwrap_or_default(),
        }))
    }

    fn pre_tool_use(&self, input: &HookInput) -> HookResponse {
        let Some(state) = StateManager::new(&self.session).read() else {
            return HookResponse::pass();
        };

        let Some(action) = Action::from_tool(&input.tool_name, &input.tool_input) else {
            tracing::debug!(tool = %input.tool_name, "tool input lacks a target");
            return self.malformed(HookEvent::PreToolUse, Some(&input.tool_name));
        };

        let policy = RolePolicy::new(self.config.gate.clone());
        match policy.decide(state.role, &action) {
            Decision::Allow => HookResponse::pass(),
            Decision::Deny { reason } => {
                tracing::info!(
                    role = %state.role,
                    tool = %action.tool,
                    target = %action.target,
                    "denied action"
                );
                HookResponse::block(json!({
                    "decision": "deny",
                    "reason": reason,
                    "role": state.role,
                    "tool": action.tool,
                }))
            }
        }
    }

    fn post_tool_use(&self, input: &HookInput) -> HookResponse {
        let states = StateManager::new(&self.session);
        let Some(state) = states.read() else {
            return HookResponse::pass();
        };
        let Some(action) = Action::from_tool(&input.tool_name, &input.tool_input) else {
            return HookResponse::pass();
        };

        let store = FsCheckpointStore::new(self.session.checkpoint_dir(&state.feature));
        let detector = TransitionDetector::default();
        match detector.observe(&states, &store, &state, &action, &input.output_text()) {
            Ok(Some(transition)) => {
                tracing::info!(
                    feature = %state.feature,
                    from = %transition.from,
                    to = %transition.to,
                    "phase transition"
                );
                let mut output = json!({
                    "phase_transition": true,
                    "from_phase": transition.from,
                    "to_phase": transition.to,
                    "message": transition.message,
                    "feature": state.feature,
                });
                if let Some(name) = transition.checkpoint {
                    output["checkpoint"] = json!(name);
                }
                HookResponse::proceed(output)
            }
            Ok(None) => HookResponse::pass(),
            Err(e) => {
                tracing::warn!(feature = %state.feature, error = %e, "transition not recorded");
                HookResponse::pass()
            }
        }
    }

    fn session_start(&self) -> HookResponse {
        let Some(feature) = self.config.feature.as_deref() else {
            return HookResponse::pass();
        };
        if !is_valid_name(feature) {
            tracing::warn!(feature, "refusing to activate session for invalid feature name");
            return HookResponse::pass();
        }

        let states = StateManager::new(&self.session);
        if let Some(existing) = states.read() {
            let stale_after = chrono::Duration::hours(self.config.session.stale_after_hours);
            if existing.age(chrono::Utc::now()) < stale_after {
                tracing::debug!(feature = %existing.feature, "session already active");
                return HookResponse::pass();
            }
            tracing::info!(feature = %existing.feature, "replacing stale session");
        }

        match states.initialize(feature) {
            Ok(state) => {
                tracing::info!(feature = %state.feature, "session activated");
                HookResponse::proceed(json!({
                    "activated": true,
                    "feature": state.feature,
                    "phase": state.phase,
                    "role": state.role,
                }))
            }
            Err(e) => {
                tracing::warn!(feature, error = %e, "could not activate session");
                HookResponse::pass()
            }
        }
    }

    fn subagent_stop(&self) -> HookResponse {
        let Some(state) = StateManager::new(&self.session).read() else {
            return HookResponse::pass();
        };

        let event = SubagentEvent::completed(Some(state.phase), chrono::Local::now());
        let log = EventLog::new(self.session.events_file(&state.feature));
        if let Err(e) = log.append(&event) {
            tracing::warn!(error = %e, "could not record subagent event");
        }

        HookResponse::proceed(json!({
            "subagent_complete": true,
            "subagent_type": event.subagent,
            "timestamp": event.timestamp.to_rfc3339(),
        }))
    }
}

/// Run `work` on the blocking pool; anything but a timely answer passes.
async fn capped<F>(event: HookEvent, cap: Duration, work: F) -> HookResponse
where
    F: FnOnce() -> HookResponse + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(cap, task).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::warn!(%event, error = %e, "hook handler failed; continuing");
            HookResponse::pass()
        }
        Err(_) => {
            tracing::warn!(
                %event,
                timeout_ms = cap.as_millis() as u64,
                "hook handler timed out; continuing"
            );
            HookResponse::pass()
        }
    }
}
