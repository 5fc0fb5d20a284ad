//! I/O helpers for pipeline commands.

pub mod agent;
pub mod batch_state;
pub mod briefing;
pub mod config;
pub mod env_sync;
pub mod git;
pub mod paths;
pub mod process;
pub mod tracker;
