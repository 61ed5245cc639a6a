//! Event command handlers.

use anyhow::{Context, Result};
use chrono::FixedOffset;
use pulse_core::calendar;
use pulse_core::config::Config;
use pulse_core::models::{Event, EventId, EventStatus, ParticipantRole};
use pulse_core::resources::{self, EventsQuery};

use super::{Client, EventsSelection};

pub fn query(selection: &EventsSelection, status: EventStatus) -> EventsQuery {
    EventsQuery {
        filters: selection.filters.clone(),
        search: selection.search.clone(),
        status: Some(status),
    }
}

/// One line per event: id, campus time, title, place.
pub fn summary_line(event: &Event, offset: FixedOffset) -> String {
    let marker = if event.is_participating() { "*" } else { " " };
    format!(
        "{marker}{:>5}  {}  {}  [{} · {}]",
        event.id,
        calendar::format_range(event.start_datetime, event.end_datetime, offset),
        event.title,
        event.event_type,
        event.location_line(),
    )
}

pub async fn list(
    client: &Client,
    config: &Config,
    selection: &EventsSelection,
    archived: bool,
    json: bool,
) -> Result<()> {
    // Signed-in users get their participation flags.
    client.session.verify().await;
    let status = if archived {
        EventStatus::Archive
    } else {
        EventStatus::Active
    };
    let events = resources::fetch_events(&client.session.gateway(), &query(selection, status))
        .await
        .context("Failed to load events")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }
    let offset = config.calendar.offset();
    for event in &events {
        println!("{}", summary_line(event, offset));
    }
    Ok(())
}

async fn find(client: &Client, id: EventId) -> Result<Event> {
    let gateway = client.session.gateway();
    for status in [EventStatus::Active, EventStatus::Archive] {
        let events = resources::fetch_events(&gateway, &EventsQuery::with_status(status))
            .await
            .context("Failed to load events")?;
        if let Some(event) = events.into_iter().find(|e| e.id == id) {
            return Ok(event);
        }
    }
    anyhow::bail!("Event {id} not found")
}

pub async fn show(client: &Client, config: &Config, id: EventId) -> Result<()> {
    client.session.verify().await;
    let event = find(client, id).await?;
    let offset = config.calendar.offset();

    println!("{}", event.title);
    println!(
        "  when:     {}",
        calendar::format_range(event.start_datetime, event.end_datetime, offset)
    );
    println!("  where:    {}", event.location_line());
    println!("  type:     {}", event.event_type);
    let roles: Vec<&str> = event.roles_available.iter().map(|r| r.label()).collect();
    println!("  roles:    {}", roles.join(", "));
    for role in ParticipantRole::all() {
        if let Some(link) = event.registration_link(*role) {
            println!("  {}: {link}", role.alias());
        }
    }
    if event.is_archived {
        println!("  archived");
    } else if event.is_participating() {
        println!("  you are registered");
    }
    if !event.description.trim().is_empty() {
        println!();
        println!("{}", event.description.trim());
    }
    Ok(())
}

async fn admin(client: &Client) -> Result<()> {
    let user = client.require_user().await?;
    if !user.is_admin {
        anyhow::bail!("Only administrators can manage events");
    }
    Ok(())
}

pub async fn archive(client: &Client, id: EventId) -> Result<()> {
    admin(client).await?;
    client.actions.archive(id).await?;
    println!("Event {id} archived.");
    Ok(())
}

pub async fn restore(client: &Client, id: EventId) -> Result<()> {
    admin(client).await?;
    client.actions.restore(id).await?;
    println!("Event {id} restored.");
    Ok(())
}

/// Only archived events can be deleted.
pub async fn delete(client: &Client, id: EventId) -> Result<()> {
    admin(client).await?;
    let event = find(client, id).await?;
    if !pulse_core::actions::EventActions::can_hard_delete(&event) {
        anyhow::bail!("Event {id} must be archived before it can be deleted");
    }
    client.actions.hard_delete(id).await?;
    println!("Event {id} permanently deleted.");
    Ok(())
}

async fn attendee(client: &Client) -> Result<()> {
    let user = client.require_user().await?;
    if user.is_admin {
        anyhow::bail!("Administrators cannot register for events");
    }
    Ok(())
}

pub async fn participate(client: &Client, id: EventId) -> Result<()> {
    attendee(client).await?;
    client.actions.register(id).await?;
    println!("Registered for event {id}.");
    Ok(())
}

pub async fn leave(client: &Client, id: EventId) -> Result<()> {
    attendee(client).await?;
    client.actions.unregister(id).await?;
    println!("Registration for event {id} cancelled.");
    Ok(())
}
