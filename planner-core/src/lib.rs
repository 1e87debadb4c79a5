//! Layout and paging engine for visual-planner.
//!
//! Calendar events are fetched per calendar by an [`broker::EventBroker`],
//! normalised into [`event::EventRecord`]s and pushed into a
//! [`grid::GridModel`], which splits them into per-month bars and packs
//! those bars into slots. [`page::PageController`] keeps a buffered window
//! of months around the visible ones and rebuilds it as the user scrolls.

pub mod broker;
pub mod config;
pub mod date;
pub mod error;
pub mod event;
pub mod grid;
pub mod page;
pub mod provider;
pub mod relayout;
pub mod session;
pub mod source;
pub mod toggles;

#[cfg(test)]
mod testing;

pub use broker::{EventBroker, EventSink, LoadReport};
pub use config::{EventBackground, LayoutOrientation, PlannerConfig};
pub use date::{DateCursor, DisplayZone, MonthNames, Precision, WeekendDays};
pub use error::{PlannerError, PlannerResult};
pub use event::{EventRecord, SharedRecord};
pub use grid::{ClickIntent, GridModel, GridSettings};
pub use page::{PageController, PageLoaded};
pub use provider::{Authorizer, CalendarInfo, CalendarProvider, Colour};
pub use toggles::CalendarToggles;
