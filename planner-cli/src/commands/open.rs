use anyhow::Result;
use chrono::NaiveDate;
use planner_core::DateCursor;
use planner_core::grid::ClickIntent;

pub fn run(date: NaiveDate, new: bool, month: bool) -> Result<()> {
    let intent = if month {
        ClickIntent::month(DateCursor::month_of(date).date())
    } else {
        ClickIntent::day(date, new)
    };

    let Some(url) = intent.url() else {
        anyhow::bail!("Nothing to open");
    };

    println!("{}", url);
    if open::that(&url).is_err() {
        println!("(Could not open browser automatically, please copy the URL above)");
    }
    Ok(())
}
