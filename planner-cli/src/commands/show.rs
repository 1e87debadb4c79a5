use anyhow::{Context, Result};
use chrono::NaiveDate;
use owo_colors::OwoColorize;
use planner_core::{LoadReport, PageController, PlannerConfig};

use crate::render::{self, PageDescriptor};
use crate::utils::tui::create_spinner;

/// `YYYY-MM` to the first of that month.
pub fn parse_anchor(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))
}

pub async fn run(config: &PlannerConfig, anchor: Option<NaiveDate>, json: bool, sync: bool) -> Result<()> {
    let spinner = create_spinner("Loading calendars".to_string());
    let broker = match super::connect(config).await {
        Ok(broker) => broker,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let mut page = PageController::new(config.clone(), broker);
    spinner.set_message("Loading events");
    let loaded = match anchor {
        Some(anchor) => page.jump_to(anchor).await,
        None => page.start().await,
    };
    let mut report = match loaded {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    if sync {
        spinner.set_message("Syncing");
        let synced = page.sync().await;
        match synced {
            Ok(delta) => merge(&mut report, delta),
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e.into());
            }
        }
    }
    spinner.finish_and_clear();

    if json {
        let descriptor = PageDescriptor::from_page(&page, &report);
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    println!("{}", render::render_page(&page));
    for error in &report.errors {
        eprintln!("{}", error.red());
    }
    Ok(())
}

fn merge(report: &mut LoadReport, delta: LoadReport) {
    report.added += delta.added;
    report.removed += delta.removed;
    report.skipped += delta.skipped;
    report.reloaded |= delta.reloaded;
    report.errors.extend(delta.errors);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anchor() {
        assert_eq!(
            parse_anchor("2024-02").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert!(parse_anchor("2024-13").is_err());
        assert!(parse_anchor("feb").is_err());
    }
}
