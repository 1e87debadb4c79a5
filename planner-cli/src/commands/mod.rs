pub mod auth;
pub mod calendars;
pub mod config;
pub mod open;
pub mod show;

use std::sync::Arc;

use anyhow::{Context, Result};
use planner_core::grid::{GridModel, GridSettings};
use planner_core::{CalendarToggles, EventBroker, PlannerConfig};
use planner_provider_google::{GoogleAuthorizer, GoogleCalendar};

/// Broker wired to Google Calendar, authorized and with calendars discovered.
pub async fn connect(config: &PlannerConfig) -> Result<EventBroker<GridModel>> {
    let authorizer = GoogleAuthorizer::new()?;
    let grid = GridModel::new(GridSettings::from_config(config)?);
    let mut broker = EventBroker::from_config(
        Arc::new(GoogleCalendar::new()),
        Arc::new(authorizer),
        config,
        grid,
    )?;

    broker.connect().await.context("Failed to authorize with Google Calendar")?;

    let toggles = CalendarToggles::load()?;
    broker
        .discover_calendars(&toggles)
        .await
        .context("Failed to list calendars")?;

    Ok(broker)
}
