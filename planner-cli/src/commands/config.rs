use anyhow::Result;
use owo_colors::OwoColorize;
use planner_core::{CalendarToggles, PlannerConfig};
use planner_provider_google::{AppConfig, SessionStore};

pub fn run() -> Result<()> {
    println!("{}", "Paths".bold());
    println!("  Config:     {}", PlannerConfig::config_path()?.display());
    println!("  Toggles:    {}", CalendarToggles::path()?.display());
    println!("  Google app: {}", AppConfig::path()?.display());
    println!("  Session:    {}", SessionStore::default_path()?.display());

    Ok(())
}
