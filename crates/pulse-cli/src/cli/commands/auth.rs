//! Session command handlers.

use std::io::{BufRead, IsTerminal};

use anyhow::{Context, Result};
use pulse_core::models::{Credentials, Registration};

use super::Client;

/// Uses the flag or `PULSE_PASSWORD`, otherwise reads one line from stdin.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    if std::io::stdin().is_terminal() {
        eprint!("Password: ");
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password provided");
    }
    Ok(password)
}

pub async fn login(client: &Client, email: String, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let user = client
        .session
        .login(&Credentials { email, password })
        .await
        .context("Login failed")?;
    println!("Signed in as {} <{}>", user.username, user.email);
    Ok(())
}

pub async fn register(
    client: &Client,
    username: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    client
        .session
        .register(&Registration {
            username,
            email,
            confirm_password: password.clone(),
            password,
        })
        .await
        .context("Registration failed")?;
    println!("Account created. Sign in with `pulse login`.");
    Ok(())
}

pub fn logout(client: &Client) {
    client.session.logout();
    println!("Signed out.");
}

pub async fn whoami(client: &Client) -> Result<()> {
    let user = client.require_user().await?;
    println!("{} <{}>", user.username, user.email);
    if user.is_admin {
        println!("role: administrator");
    }
    println!(
        "notifications: {}",
        if user.notifications_enabled { "on" } else { "off" }
    );
    Ok(())
}
