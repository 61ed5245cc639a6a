//! Full-screen TUI for KemSU Pulse.

pub mod common;
pub mod effects;
pub mod events;
pub mod features;
pub mod mutations;
pub mod overlays;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

#[cfg(test)]
mod test_support;

use std::io::{IsTerminal, stderr, stdout};

use anyhow::Result;
use pulse_core::config::Config;
pub use runtime::TuiRuntime;

/// Runs the interactive client until the user quits.
///
/// # Errors
/// Returns an error when not attached to a terminal or when the runtime
/// cannot start.
pub async fn run(config: &Config) -> Result<()> {
    if !stdout().is_terminal() || !stderr().is_terminal() {
        anyhow::bail!(
            "The interactive client requires a terminal.\n\
             Use `pulse events list` or `pulse --help` for non-interactive commands."
        );
    }

    tracing::info!("starting interactive client");
    let mut runtime = TuiRuntime::new(config)?;
    let result = runtime.run();
    drop(runtime);
    tracing::info!("interactive client stopped");
    result
}
