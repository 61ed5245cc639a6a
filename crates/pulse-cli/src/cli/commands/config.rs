//! Config command handlers.

use anyhow::{Context, Result};
use pulse_core::config;

pub fn path() {
    let config_path = config::paths::config_path();
    println!("{}", config_path.display());
    if !config_path.exists() {
        eprintln!("(not created yet; run `pulse config init`)");
    }
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

/// Prints the commented template with every default filled in.
pub fn generate() -> Result<()> {
    print!("{}", config::Config::generate()?);
    Ok(())
}
