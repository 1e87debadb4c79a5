use anyhow::Result;
use owo_colors::OwoColorize;
use planner_core::PlannerConfig;
use planner_core::provider::{Authorizer, CALENDAR_READONLY_SCOPE};
use planner_provider_google::GoogleAuthorizer;

pub async fn run(config: &PlannerConfig) -> Result<()> {
    println!("Authorizing with Google Calendar...");

    let broker = super::connect(config).await?;

    println!("{}\n", "Authorized.".green());
    println!("Found {} calendar(s):", broker.sources().len());
    for source in broker.sources() {
        println!("  {}", source.name);
    }

    println!("\nRun `visual-planner show` to lay them out.");
    Ok(())
}

pub async fn logout() -> Result<()> {
    let authorizer = GoogleAuthorizer::new()?;
    match authorizer.request_access_token(&[CALENDAR_READONLY_SCOPE], false).await {
        Ok(token) => {
            authorizer.revoke(&token).await?;
            println!("Authorization revoked.");
        }
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(_) => println!("Not authorized."),
    }
    Ok(())
}
