//! Role Authorization Gate.
//!
//! Decides allow/deny for a proposed action before it runs, from the live
//! role alone. The policy is a pure function of
//! `(role, action kind, target)`; the gate has no side effects.
//!
//! | Role           | Denied                                                         |
//! |----------------|----------------------------------------------------------------|
//! | `orchestrator` | nothing                                                        |
//! | `tester`       | writes under a production-source prefix                        |
//! | `implementer`  | writes to test/spec files, except shared helpers and utilities |
//! | `verifier`     | every write; commands that redirect output or touch the tree   |
//!
//! The command denylist is a textual heuristic that keeps well-behaved workers
//! inside their lane. It is not a sandbox.

mod command;

use crate::config::GateConfig;
use crate::phase::Role;
use serde::{Deserialize, Serialize};

pub use command::mutating_command_token;

/// The closed set of action shapes the gate distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Creates, edits or deletes a file
    Write,
    /// Runs a shell command
    Execute,
    /// Anything else (reads, searches, subagent calls)
    Other,
}

impl ActionKind {
    /// Classify a tool name reported by the hosting agent.
    pub fn from_tool_name(tool: &str) -> Self {
        match tool {
            "Write" | "Edit" | "MultiEdit" | "Delete" | "NotebookEdit" => ActionKind::Write,
            "Bash" => ActionKind::Execute,
            _ => ActionKind::Other,
        }
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self, ActionKind::Write)
    }
}

/// A proposed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    /// File path for writes, command text for executes
    pub target: String,
    /// Name the action was requested under, for messages
    pub tool: String,
}

impl Action {
    pub fn new(kind: ActionKind, target: impl Into<String>) -> Self {
        let tool = match kind {
            ActionKind::Write => "Write",
            ActionKind::Execute => "Bash",
            ActionKind::Other => "Other",
        };
        Self {
            kind,
            target: target.into(),
            tool: tool.to_string(),
        }
    }

    pub fn write(path: impl Into<String>) -> Self {
        Self::new(ActionKind::Write, path)
    }

    pub fn execute(command: impl Into<String>) -> Self {
        Self::new(ActionKind::Execute, command)
    }

    /// Build from a tool name and its JSON input.
    ///
    /// Returns `None` when a mutating or executing tool lacks the field the
    /// gate needs to judge it.
    pub fn from_tool(tool: &str, input: &serde_json::Value) -> Option<Self> {
        let kind = ActionKind::from_tool_name(tool);
        let field = |key: &str| input.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let target = match kind {
            ActionKind::Write => field("file_path").or_else(|| field("notebook_path"))?,
            ActionKind::Execute => field("command")?,
            ActionKind::Other => field("file_path")
                .or_else(|| field("path"))
                .unwrap_or_default(),
        };
        Some(Self {
            kind,
            target,
            tool: tool.to_string(),
        })
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason } => Some(reason),
        }
    }
}

/// Static role → permitted-action mapping.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    config: GateConfig,
}

impl RolePolicy {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn decide(&self, role: Role, action: &Action) -> Decision {
        match role {
            Role::Orchestrator => Decision::Allow,
            Role::Tester => self.decide_tester(action),
            Role::Implementer => self.decide_implementer(action),
            Role::Verifier => self.decide_verifier(action),
        }
    }

    fn decide_tester(&self, action: &Action) -> Decision {
        if !action.kind.is_mutating() {
            return Decision::Allow;
        }
        match self.protected_prefix(&action.target) {
            Some(prefix) => Decision::deny(format!(
                "Role restriction: tester cannot use {} on production source under '{}' ({})",
                action.tool, prefix, action.target
            )),
            None => Decision::Allow,
        }
    }

    fn decide_implementer(&self, action: &Action) -> Decision {
        if !action.kind.is_mutating() {
            return Decision::Allow;
        }
        let lower = action.target.to_lowercase();
        let is_test = contains_any(&lower, &self.config.test_markers);
        let is_helper = contains_any(&lower, &self.config.helper_markers);
        if is_test && !is_helper {
            Decision::deny(format!(
                "Role restriction: implementer cannot use {} on test file {}",
                action.tool, action.target
            ))
        } else {
            Decision::Allow
        }
    }

    fn decide_verifier(&self, action: &Action) -> Decision {
        match action.kind {
            ActionKind::Write => Decision::deny(format!(
                "Role restriction: verifier is read-only and cannot use {} on {}",
                action.tool, action.target
            )),
            ActionKind::Execute => {
                match mutating_command_token(&action.target, &self.config.verifier_denied_commands) {
                    Some(token) => Decision::deny(format!(
                        "Role restriction: verifier cannot run commands that modify files ('{}')",
                        token
                    )),
                    None => Decision::Allow,
                }
            }
            ActionKind::Other => Decision::Allow,
        }
    }

    /// The protected prefix `path` lies under, if any.
    ///
    /// Matches relative paths that start with the prefix as well as absolute
    /// paths that contain it as a directory component.
    pub fn protected_prefix(&self, path: &str) -> Option<&str> {
        let normalized = path.replace('\\', "/");
        let trimmed = normalized.trim_start_matches("./");
        self.config
            .protected_prefixes
            .iter()
            .find(|prefix| {
                let dir = prefix.trim_end_matches('/');
                trimmed.starts_with(prefix.as_str())
                    || trimmed == dir
                    || trimmed.contains(&format!("/{}", prefix))
            })
            .map(String::as_str)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack.contains(&n.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RolePolicy {
        RolePolicy::default()
    }

    fn all_roles() -> [Role; 4] {
        [Role::Orchestrator, Role::Tester, Role::Implementer, Role::Verifier]
    }

    #[test]
    fn test_tool_name_classification() {
        for tool in ["Write", "Edit", "MultiEdit", "Delete", "NotebookEdit"] {
            assert_eq!(ActionKind::from_tool_name(tool), ActionKind::Write);
        }
        assert_eq!(ActionKind::from_tool_name("Bash"), ActionKind::Execute);
        assert_eq!(ActionKind::from_tool_name("Read"), ActionKind::Other);
        assert_eq!(ActionKind::from_tool_name("Task"), ActionKind::Other);
    }

    #[test]
    fn test_action_from_tool_input() {
        let action = Action::from_tool("Edit", &serde_json::json!({"file_path": "src/a.rs"})).unwrap();
        assert_eq!(action.kind, ActionKind::Write);
        assert_eq!(action.target, "src/a.rs");

        let action = Action::from_tool("NotebookEdit", &serde_json::json!({"notebook_path": "n.ipynb"})).unwrap();
        assert_eq!(action.target, "n.ipynb");

        let action = Action::from_tool("Bash", &serde_json::json!({"command": "npm test"})).unwrap();
        assert_eq!(action.kind, ActionKind::Execute);

        assert!(Action::from_tool("Write", &serde_json::json!({})).is_none());
        assert!(Action::from_tool("Bash", &serde_json::json!({"command": 3})).is_none());
        assert!(Action::from_tool("Read", &serde_json::json!({})).is_some());
    }

    #[test]
    fn test_orchestrator_is_allowed_everything() {
        let policy = policy();
        let actions = [
            Action::write("src/app.py"),
            Action::write("tests/test_app.py"),
            Action::execute("rm -rf build && echo done > log"),
            Action::new(ActionKind::Other, "anything"),
        ];
        for action in &actions {
            assert!(policy.decide(Role::Orchestrator, action).is_allowed());
        }
    }

    #[test]
    fn test_tester_cannot_write_production_source() {
        let policy = policy();
        let decision = policy.decide(Role::Tester, &Action::write("src/app.py"));
        assert!(!decision.is_allowed());
        assert!(decision.reason().unwrap().contains("src/"));

        assert!(policy.decide(Role::Tester, &Action::write("tests/test_app.py")).is_allowed());
    }

    #[test]
    fn test_tester_prefix_matching() {
        let policy = policy();
        for path in [
            "lib/util.js",
            "./app/main.go",
            "/home/dev/proj/internal/db.go",
            "pkg/server/handler.go",
            "cmd/tool/main.go",
        ] {
            assert!(!policy.decide(Role::Tester, &Action::write(path)).is_allowed(), "{}", path);
        }
        for path in ["test/hello.test.js", "docs/readme.md", "source.txt", "spec/app_spec.rb"] {
            assert!(policy.decide(Role::Tester, &Action::write(path)).is_allowed(), "{}", path);
        }
    }

    #[test]
    fn test_tester_may_read_and_run_anything() {
        let policy = policy();
        assert!(policy.decide(Role::Tester, &Action::execute("cat src/app.py > /tmp/x")).is_allowed());
        assert!(policy.decide(Role::Tester, &Action::new(ActionKind::Other, "src/app.py")).is_allowed());
    }

    #[test]
    fn test_implementer_cannot_rewrite_tests() {
        let policy = policy();
        assert!(!policy.decide(Role::Implementer, &Action::write("tests/test_app.py")).is_allowed());
        assert!(!policy.decide(Role::Implementer, &Action::write("spec/models/user_spec.rb")).is_allowed());
        assert!(!policy.decide(Role::Implementer, &Action::write("src/App.Test.tsx")).is_allowed());
    }

    #[test]
    fn test_implementer_helper_exception() {
        let policy = policy();
        assert!(policy.decide(Role::Implementer, &Action::write("tests/helpers/fixtures.py")).is_allowed());
        assert!(policy.decide(Role::Implementer, &Action::write("test/test_utils.js")).is_allowed());
        assert!(policy.decide(Role::Implementer, &Action::write("src/app.py")).is_allowed());
    }

    #[test]
    fn test_implementer_may_run_tests() {
        assert!(policy().decide(Role::Implementer, &Action::execute("pytest tests/")).is_allowed());
    }

    #[test]
    fn test_verifier_denies_every_write() {
        let policy = policy();
        for path in ["src/app.py", "tests/test_app.py", "README.md", "", "tests/helpers/x.py"] {
            let decision = policy.decide(Role::Verifier, &Action::write(path));
            assert!(!decision.is_allowed(), "{}", path);
        }
    }

    #[test]
    fn test_verifier_command_denylist() {
        let policy = policy();
        for cmd in [
            "npm test > results.txt",
            "cat a >> b",
            "rm -rf node_modules",
            "mv a b",
            "cp a b",
            "mkdir out",
            "touch marker",
            "sed -i 's/a/b/' src/app.py",
            "echo ok",
            "npm test && rm coverage.json",
        ] {
            assert!(!policy.decide(Role::Verifier, &Action::execute(cmd)).is_allowed(), "{}", cmd);
        }
        for cmd in ["npm test", "cargo test 2>&1", "git diff --stat", "npm run format:check", "grep -rn TODO src"] {
            assert!(policy.decide(Role::Verifier, &Action::execute(cmd)).is_allowed(), "{}", cmd);
        }
    }

    #[test]
    fn test_non_mutating_actions_always_allowed() {
        let policy = policy();
        for role in all_roles() {
            assert!(policy.decide(role, &Action::new(ActionKind::Other, "src/app.py")).is_allowed());
        }
    }

    #[test]
    fn test_custom_prefixes() {
        let policy = RolePolicy::new(GateConfig {
            protected_prefixes: vec!["crates/".to_string()],
            ..GateConfig::default()
        });
        assert!(!policy.decide(Role::Tester, &Action::write("crates/core/src/lib.rs")).is_allowed());
        assert!(policy.decide(Role::Tester, &Action::write("src/lib.rs")).is_allowed());
    }
}
