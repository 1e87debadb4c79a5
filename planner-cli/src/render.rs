//! Terminal and JSON rendering of a loaded page.

use owo_colors::OwoColorize;
use planner_core::grid::{ClickIntent, DayStyle, Label, LabelStyle, Month};
use planner_core::page::{PageMetrics, VisibleMonths};
use planner_core::{EventRecord, GridModel, LoadReport, PageController};
use serde::Serialize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Label {
    fn render(&self) -> String {
        let event = self.event();
        let mut text = event.description.clone();
        if !self.is_first_segment() {
            text = format!("… {}", text);
        }
        if !self.is_last_segment() {
            text.push_str(" …");
        }
        text
    }
}

/// The visible months of the page as text.
pub fn render_page(page: &PageController) -> String {
    let grid = page.grid();
    let start = page.buffer() as usize;
    let end = (start + page.visible_count()).min(grid.months().len());

    let mut blocks = Vec::new();
    for month in &grid.months()[start..end] {
        blocks.push(render_month(grid, month));
    }
    blocks.join("\n\n")
}

fn render_month(grid: &GridModel, month: &Month) -> String {
    let names = &grid.settings().month_names;
    let title = month.title(names);
    let mut lines = vec![if month.is_current() {
        title.bold().green().to_string()
    } else if month.is_past() {
        title.dimmed().to_string()
    } else {
        title.bold().to_string()
    }];

    lines.push(format!("{}{}", " ".repeat(9), ruler(month)));

    let mut bars: Vec<&Label> = month.labels().iter().collect();
    bars.sort_by_key(|l| (l.slot(), l.start_day()));
    for bar in bars {
        let slot = bar.slot().map(|s| s.to_string()).unwrap_or_default();
        lines.push(format!(
            "  slot {:<2} {}  {}",
            slot,
            strip(month, bar),
            bar.render()
        ));
    }

    for day in month.days() {
        for label in day.labels() {
            let marker = format!("{:>2}", day.number());
            lines.push(format!(
                "  {} {}",
                if day.is_weekend() {
                    marker.dimmed().to_string()
                } else {
                    marker
                },
                label.render()
            ));
        }
    }

    lines.join("\n")
}

/// One character per day: last digit of the day number.
fn ruler(month: &Month) -> String {
    month
        .days()
        .iter()
        .map(|day| {
            let digit = (day.number() % 10).to_string();
            if day.is_today() {
                digit.reversed().to_string()
            } else if day.is_weekend() {
                digit.dimmed().to_string()
            } else {
                digit
            }
        })
        .collect()
}

fn strip(month: &Month, bar: &Label) -> String {
    (0..month.len())
        .map(|d| {
            if d >= bar.start_day() && d <= bar.end_day() {
                '█'
            } else {
                '·'
            }
        })
        .collect()
}

#[derive(Serialize)]
pub struct PageDescriptor<'a> {
    pub anchor: String,
    pub buffer: u32,
    pub metrics: PageMetrics,
    pub grid_areas: String,
    pub visible: VisibleMonths,
    pub report: &'a LoadReport,
    pub months: Vec<MonthDescriptor<'a>>,
}

#[derive(Serialize)]
pub struct MonthDescriptor<'a> {
    pub id: String,
    pub title: String,
    pub offset: u32,
    pub is_past: bool,
    pub is_current: bool,
    pub intent: ClickIntent,
    pub bars: Vec<LabelDescriptor<'a>>,
    pub days: Vec<DayDescriptor<'a>>,
}

#[derive(Serialize)]
pub struct DayDescriptor<'a> {
    pub date: String,
    pub style: DayStyle,
    pub labels: Vec<LabelDescriptor<'a>>,
}

#[derive(Serialize)]
pub struct LabelDescriptor<'a> {
    pub event: &'a EventRecord,
    pub start_day: u32,
    pub span: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
    pub style: LabelStyle,
    pub intent: ClickIntent,
}

impl<'a> LabelDescriptor<'a> {
    fn new(grid: &GridModel, month: &Month, label: &'a Label) -> Self {
        LabelDescriptor {
            event: label.event().as_ref(),
            start_day: label.start_day(),
            span: label.span(),
            slot: label.slot(),
            style: grid.label_style(month, label),
            intent: ClickIntent::event(label.event()),
        }
    }
}

impl<'a> PageDescriptor<'a> {
    pub fn from_page(page: &'a PageController, report: &'a LoadReport) -> Self {
        let grid = page.grid();
        let names = &grid.settings().month_names;
        let buffer = page.buffer() as usize;
        let months = grid
            .months()
            .iter()
            .map(|month| MonthDescriptor {
                id: month.id(),
                title: month.title(names),
                offset: month.offset(),
                is_past: month.is_past(),
                is_current: month.is_current(),
                intent: ClickIntent::month(month.first_day()),
                bars: month
                    .labels()
                    .iter()
                    .map(|label| LabelDescriptor::new(grid, month, label))
                    .collect(),
                days: month
                    .days()
                    .iter()
                    .map(|day| DayDescriptor {
                        date: day.cursor().ymd(),
                        style: grid.day_style(month, day),
                        labels: day
                            .labels()
                            .iter()
                            .map(|label| LabelDescriptor::new(grid, month, label))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        PageDescriptor {
            anchor: page.anchor().ym(),
            buffer: page.buffer(),
            metrics: page.metrics(),
            grid_areas: page.grid_areas(),
            visible: VisibleMonths {
                first: buffer,
                months: (buffer..(buffer + page.visible_count()).min(grid.months().len()))
                    .collect(),
            },
            report,
            months,
        }
    }
}
