//! Participation command handlers.

use anyhow::{Context, Result};
use pulse_core::calendar;
use pulse_core::config::Config;
use pulse_core::models::ParticipationStatus;
use pulse_core::resources;

use super::Client;

pub async fn list(client: &Client, config: &Config, status: ParticipationStatus) -> Result<()> {
    client.require_user().await?;
    let participations = resources::fetch_participations(&client.session.gateway(), status)
        .await
        .context("Failed to load your participations")?;
    if participations.is_empty() {
        println!("No {} participations.", status.as_str());
        return Ok(());
    }
    let offset = config.calendar.offset();
    for p in &participations {
        let attended = if p.attended { "  attended" } else { "" };
        println!(
            "{:>5}  {}  {}  [{}]{attended}",
            p.event_id,
            calendar::format_range(p.event_start_datetime, p.event_end_datetime, offset),
            p.event_title,
            p.role_name
        );
    }
    Ok(())
}

pub async fn count(client: &Client) -> Result<()> {
    client.require_user().await?;
    let counts = resources::fetch_participation_counts(&client.session.gateway())
        .await
        .context("Failed to load participation counts")?;
    println!("participated: {}", counts.total_participated);
    println!("attended:     {}", counts.attended_events);
    Ok(())
}
