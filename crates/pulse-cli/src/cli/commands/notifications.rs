//! Notification command handlers.

use anyhow::{Context, Result};
use pulse_core::calendar;
use pulse_core::config::Config;
use pulse_core::models::unread_count;
use pulse_core::resources;

use super::Client;

pub async fn list(client: &Client, config: &Config, unread_only: bool) -> Result<()> {
    client.require_user().await?;
    let mut notifications = resources::fetch_notifications(&client.session.gateway())
        .await
        .context("Failed to load notifications")?;
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let offset = config.calendar.offset();
    let mut shown = 0;
    for n in notifications.iter().filter(|n| !unread_only || !n.is_read) {
        let marker = if n.is_read { " " } else { "•" };
        let event = n
            .event_id
            .map(|id| format!("  (event {id})"))
            .unwrap_or_default();
        println!(
            "{marker}{:>5}  {}  {}{event}",
            n.id,
            calendar::format_datetime(n.created_at, offset),
            n.message
        );
        shown += 1;
    }
    if shown == 0 {
        println!("No notifications.");
    } else {
        println!("{} unread", unread_count(&notifications));
    }
    Ok(())
}

/// Marks `id` as read, or every notification when `id` is `None`.
pub async fn read(client: &Client, id: Option<i64>) -> Result<()> {
    client.require_user().await?;
    match id {
        Some(id) => {
            client.actions.mark_notification_read(id).await?;
            println!("Notification {id} marked as read.");
        }
        None => {
            client.actions.mark_all_notifications_read().await?;
            println!("All notifications marked as read.");
        }
    }
    Ok(())
}
