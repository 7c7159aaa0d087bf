//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module       | Commands handled                          |
//! |--------------|-------------------------------------------|
//! | `checkpoint` | `Wait`, `Create`, `List`, `Get`, `Info`   |
//! | `session`    | `Init`, `Status`, `Advance`, `End`        |
//! | `hook`       | `Hook`                                    |
//! | `config`     | `Config`                                  |

pub mod checkpoint;
pub mod config;
pub mod hook;
pub mod session;

pub use checkpoint::{cmd_create, cmd_get, cmd_info, cmd_list, cmd_wait};
pub use config::cmd_config;
pub use hook::cmd_hook;
pub use session::{cmd_advance, cmd_end, cmd_init, cmd_status};

use anyhow::Result;
use phasegate::checkpoint::{CheckpointMonitor, is_valid_name};
use phasegate::config::{CoordConfig, ENV_FEATURE};
use phasegate::logging::{self, LogGuard};
use phasegate::phase::Role;
use phasegate::session::Session;
use phasegate::state::StateManager;

use super::{Cli, Commands};

/// Resolved session and layered configuration shared by every command.
pub struct Context {
    pub session: Session,
    pub config: CoordConfig,
}

impl Context {
    /// Defaults → `config.toml` → environment → CLI flags.
    pub fn load(cli: &Cli, session: Session) -> Result<Self> {
        let mut config = CoordConfig::load_or_default(&session.config_path())?;
        config.apply_env();
        config.apply_cli(cli.feature.as_deref(), cli.role);
        Ok(Self { session, config })
    }

    pub fn states(&self) -> StateManager {
        StateManager::new(&self.session)
    }

    /// Feature from flags/environment, else the live session's.
    pub fn feature(&self) -> Option<String> {
        self.config
            .feature
            .clone()
            .or_else(|| self.states().read().map(|s| s.feature))
    }

    pub fn require_feature(&self) -> Result<String> {
        let feature = self.feature().ok_or_else(|| {
            anyhow::anyhow!(
                "No feature selected. Pass --feature, set {}, or run 'phasegate init <feature>'.",
                ENV_FEATURE
            )
        })?;
        if !is_valid_name(&feature) {
            anyhow::bail!("Invalid feature name: '{}'", feature);
        }
        Ok(feature)
    }

    /// Role from flags/environment, else the live session's, else orchestrator.
    pub fn role(&self) -> Role {
        self.config
            .role
            .or_else(|| self.states().read().map(|s| s.role))
            .unwrap_or_default()
    }

    pub fn monitor(&self) -> Result<CheckpointMonitor> {
        let feature = self.require_feature()?;
        Ok(CheckpointMonitor::for_session(
            &self.session,
            &feature,
            self.role(),
            &self.config.monitor,
        ))
    }

    /// Checkpoint commands also log to the worker's role log.
    pub fn init_logging(&self, verbose: bool, command: &Commands) -> Result<LogGuard> {
        let level = if verbose { "debug" } else { "info" };
        let log_file = match command {
            Commands::Wait { .. }
            | Commands::Create { .. }
            | Commands::List
            | Commands::Get { .. }
            | Commands::Info => self
                .feature()
                .filter(|feature| is_valid_name(feature))
                .map(|feature| self.session.role_log_file(&feature, self.role().as_str())),
            _ => None,
        };
        logging::init(level, log_file.as_deref())
    }
}
