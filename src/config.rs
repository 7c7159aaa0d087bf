//! Unified configuration for the coordination core.
//!
//! Reads `<root>/config.toml` (see [`crate::session::Session::config_path`]).
//! Layered resolution: defaults → file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [gate]
//! protected_prefixes = ["src/", "lib/", "app/", "pkg/", "internal/", "cmd/"]
//! test_markers = ["test", "spec"]
//! helper_markers = ["helper", "util"]
//! verifier_denied_commands = ["rm", "mv", "cp", "mkdir", "touch", "echo"]
//! fail_closed = false
//!
//! [monitor]
//! initial_interval_ms = 2000
//! max_interval_ms = 10000
//! backoff_factor = 1.5
//! progress_every_secs = 30
//! default_timeout_secs = 300
//!
//! [hooks]
//! timeout_secs = 25
//!
//! [session]
//! stale_after_hours = 24
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::phase::Role;

/// Environment variable naming the feature a process works on.
pub const ENV_FEATURE: &str = "PHASEGATE_FEATURE";
/// Environment variable naming the role a process acts as.
pub const ENV_ROLE: &str = "PHASEGATE_ROLE";
/// Environment variable overriding the default wait timeout (seconds).
pub const ENV_TIMEOUT: &str = "PHASEGATE_TIMEOUT";

/// Backoff factors above this are reported by `validate`.
const MAX_SENSIBLE_BACKOFF: f64 = 10.0;

/// Role Authorization Gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Production-source prefixes the tester may not write under
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    /// Path fragments that mark a test or spec file
    #[serde(default = "default_test_markers")]
    pub test_markers: Vec<String>,
    /// Path fragments that mark shared test scaffolding
    #[serde(default = "default_helper_markers")]
    pub helper_markers: Vec<String>,
    /// Command words the verifier may not run
    #[serde(default = "default_verifier_denied_commands")]
    pub verifier_denied_commands: Vec<String>,
    /// Deny instead of allow when the gate cannot read its input
    #[serde(default)]
    pub fail_closed: bool,
}

fn default_protected_prefixes() -> Vec<String> {
    ["src/", "lib/", "app/", "pkg/", "internal/", "cmd/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_test_markers() -> Vec<String> {
    vec!["test".to_string(), "spec".to_string()]
}

fn default_helper_markers() -> Vec<String> {
    vec!["helper".to_string(), "util".to_string()]
}

fn default_verifier_denied_commands() -> Vec<String> {
    ["rm", "mv", "cp", "mkdir", "touch", "echo"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: default_protected_prefixes(),
            test_markers: default_test_markers(),
            helper_markers: default_helper_markers(),
            verifier_denied_commands: default_verifier_denied_commands(),
            fail_closed: false,
        }
    }
}

/// Checkpoint Monitor polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// How often a waiting monitor reports that it is still waiting
    #[serde(default = "default_progress_every_secs")]
    pub progress_every_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
}

fn default_initial_interval_ms() -> u64 {
    2_000
}

fn default_max_interval_ms() -> u64 {
    10_000
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_progress_every_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_factor: default_backoff_factor(),
            progress_every_secs: default_progress_every_secs(),
            default_timeout_secs: default_timeout_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn progress_every(&self) -> Duration {
        Duration::from_secs(self.progress_every_secs)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// Hook entry point settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HooksSection {
    /// Wall-clock cap on a single gate/detector invocation
    #[serde(default = "default_hook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_hook_timeout_secs() -> u64 {
    25
}

impl Default for HooksSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_hook_timeout_secs(),
        }
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSection {
    /// A session older than this may be replaced by `session-start`
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: i64,
}

fn default_stale_after_hours() -> i64 {
    24
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub hooks: HooksSection,
    #[serde(default)]
    pub session: SessionSection,
    /// Feature resolved from the environment or CLI (never read from file)
    #[serde(skip)]
    pub feature: Option<String>,
    /// Role resolved from the environment or CLI (never read from file)
    #[serde(skip)]
    pub role: Option<Role>,
}

impl CoordConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load configuration from `path`, or defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides from an arbitrary lookup.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(feature) = lookup(ENV_FEATURE).filter(|f| !f.trim().is_empty()) {
            self.feature = Some(feature.trim().to_string());
        }
        if let Some(raw) = lookup(ENV_ROLE) {
            match raw.parse::<Role>() {
                Ok(role) => self.role = Some(role),
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {}", ENV_ROLE),
            }
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.monitor.default_timeout_secs = secs,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {}", ENV_TIMEOUT),
            }
        }
    }

    /// Apply CLI overrides; `None` leaves the lower layer in place.
    pub fn apply_cli(&mut self, feature: Option<&str>, role: Option<Role>) {
        if let Some(feature) = feature {
            self.feature = Some(feature.to_string());
        }
        if let Some(role) = role {
            self.role = Some(role);
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let factor = self.monitor.backoff_factor;
        if !factor.is_finite() || factor > MAX_SENSIBLE_BACKOFF {
            warnings.push(format!(
                "backoff_factor {} is above {}; polling will jump straight to max_interval_ms",
                factor, MAX_SENSIBLE_BACKOFF
            ));
        } else if factor < 1.0 {
            warnings.push(format!(
                "backoff_factor {} is below 1.0; polling interval will shrink",
                self.monitor.backoff_factor
            ));
        }
        if self.monitor.initial_interval_ms == 0 {
            warnings.push("initial_interval_ms is 0; monitor will busy-poll".to_string());
        }
        if self.monitor.max_interval_ms < self.monitor.initial_interval_ms {
            warnings.push(format!(
                "max_interval_ms ({}) is below initial_interval_ms ({})",
                self.monitor.max_interval_ms, self.monitor.initial_interval_ms
            ));
        }
        for prefix in &self.gate.protected_prefixes {
            if !prefix.ends_with('/') {
                warnings.push(format!(
                    "protected prefix '{}' has no trailing '/'; it will also match file names",
                    prefix
                ));
            }
        }

        warnings
    }
}
