//! Calendar export.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use pulse_core::calendar::{Month, MonthView};
use pulse_core::config::Config;
use pulse_core::ics;
use pulse_core::models::EventStatus;
use pulse_core::resources;

use super::events::query;
use super::{Client, EventsSelection};

/// Exports the active events overlapping `month` to an iCalendar file.
pub async fn export(
    client: &Client,
    config: &Config,
    month: Option<Month>,
    output: Option<PathBuf>,
    selection: &EventsSelection,
) -> Result<()> {
    client.session.verify().await;
    let offset = config.calendar.offset();
    let month = month.unwrap_or_else(|| Month::current(offset));

    let events = resources::fetch_events(
        &client.session.gateway(),
        &query(selection, EventStatus::Active),
    )
    .await
    .context("Failed to load events")?;
    let visible = MonthView::new(month, offset).visible(&events);
    if visible.is_empty() {
        anyhow::bail!("No events in {}", month.label());
    }

    let path = output.unwrap_or_else(|| PathBuf::from(ics::file_name(month)));
    let body = ics::export(visible.iter().copied(), &config.calendar, Utc::now());
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), count = visible.len(), %month, "calendar exported");
    println!("Exported {} events to {}", visible.len(), path.display());
    Ok(())
}
