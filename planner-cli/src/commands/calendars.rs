use anyhow::Result;
use dialoguer::MultiSelect;
use owo_colors::OwoColorize;
use planner_core::{CalendarToggles, PlannerConfig};

use crate::utils::tui::create_spinner;

pub async fn run(config: &PlannerConfig, select: bool) -> Result<()> {
    let spinner = create_spinner("Fetching calendars".to_string());
    let broker = super::connect(config).await;
    spinner.finish_and_clear();
    let broker = broker?;

    let sources = broker.sources();
    if sources.is_empty() {
        println!("No calendars found.");
        return Ok(());
    }

    if !select {
        for source in sources {
            let mark = if source.is_visible() {
                "●".green().to_string()
            } else {
                "○".dimmed().to_string()
            };
            println!("{} {} {}", mark, source.name, source.id.dimmed());
        }
        return Ok(());
    }

    let items: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    let defaults: Vec<bool> = sources.iter().map(|s| s.is_visible()).collect();
    let selections = MultiSelect::new()
        .with_prompt("Calendars to show (space to toggle, enter to confirm)")
        .items(&items)
        .defaults(&defaults)
        .interact()?;

    let mut toggles = CalendarToggles::load()?;
    for (i, source) in sources.iter().enumerate() {
        toggles.set_hidden(&source.id, !selections.contains(&i));
    }
    toggles.save()?;

    println!("Showing {} of {} calendars.", selections.len(), sources.len());
    Ok(())
}

pub async fn toggle(config: &PlannerConfig, calendar_id: &str) -> Result<()> {
    let broker = super::connect(config).await?;
    let Some(source) = broker.source(calendar_id) else {
        let available: Vec<_> = broker.sources().iter().map(|s| s.id.as_str()).collect();
        anyhow::bail!(
            "Calendar '{}' not found. Available: {}",
            calendar_id,
            available.join(", ")
        );
    };

    let mut toggles = CalendarToggles::load()?;
    let hidden = toggles.toggle(calendar_id);
    toggles.save()?;

    if hidden {
        println!("{} {}", "Hidden".yellow(), source.name);
    } else {
        println!("{} {}", "Shown".green(), source.name);
    }
    Ok(())
}
