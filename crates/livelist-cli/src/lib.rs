//! Scenario runner for concatenated views.
//!
//! Loads a TOML scenario, replays its steps against a live source of
//! segments and reports the change events the view produced for each step.

pub mod commands;
pub mod logging;
pub mod render;
pub mod scenario;
