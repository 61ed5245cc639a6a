//! Default mode: the full-screen client.

use anyhow::Result;
use pulse_core::config::Config;

#[cfg(feature = "tui")]
pub async fn run(config: &Config) -> Result<()> {
    pulse_tui::run(config).await
}

#[cfg(not(feature = "tui"))]
pub async fn run(_config: &Config) -> Result<()> {
    anyhow::bail!(
        "This build has no interactive client.\n\
         Use `pulse events list` or `pulse --help` for the available commands."
    )
}
