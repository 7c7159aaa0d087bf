//! Filesystem-coordinated TDD workflow: phase state, role boundaries and a
//! checkpoint relay between independently running workers.

pub mod audit;
pub mod checkpoint;
pub mod config;
pub mod detector;
pub mod errors;
pub mod gate;
pub mod hooks;
pub mod logging;
pub mod phase;
pub mod session;
pub mod state;
