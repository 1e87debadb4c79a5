//! Planner configuration at ~/.config/visual-planner/config.toml
//!
//! Every field has a default, so a missing or empty file is a valid
//! configuration. `VISUAL_PLANNER_*` environment variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Weekday;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::date::{DisplayZone, MonthNames, WeekendDays, weekday_from_sunday_index};
use crate::error::{PlannerError, PlannerResult};

const APP_DIR: &str = "visual-planner";
const ENV_PREFIX: &str = "VISUAL_PLANNER";

/// Where event labels take their colours from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventBackground {
    /// The owning calendar's colours.
    #[default]
    Cal,
    /// White background, default text colour.
    White,
    /// The event's own colour id, falling back to the calendar's colours.
    Evt,
}

/// Months laid out as columns (days run downwards) or as rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutOrientation {
    #[default]
    Column,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Months visible at once.
    pub month_count: u32,
    /// Extra months built before and after the visible range.
    pub scroll_buffer: u32,
    /// Start at the current month (shifted by `auto_scroll_offset`) rather
    /// than at `first_month`.
    pub auto_scroll: bool,
    pub auto_scroll_offset: i32,
    /// 1-based month shown first when `auto_scroll` is off.
    pub first_month: u32,
    /// Offset each month so weekdays line up across months.
    pub align_weekends: bool,
    /// Comma separated day numbers, 0 = Sunday.
    pub weekends: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub first_day_of_week: u8,
    /// Twelve dash separated names.
    pub month_names: String,
    pub show_timed_events: bool,
    pub show_all_day_events: bool,
    /// Draw single-day events as bars too.
    pub single_day_as_multi_day: bool,
    pub event_background: EventBackground,
    pub time_24h: bool,
    /// IANA zone name; the system zone when unset.
    pub time_zone: Option<String>,
    pub slot_height_em: f32,
    pub bulk_relayout_delay_ms: u64,
    pub change_relayout_delay_ms: u64,
    pub failure_backoff_ms: u64,
    pub layout: LayoutOrientation,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            month_count: 6,
            scroll_buffer: 6,
            auto_scroll: true,
            auto_scroll_offset: -1,
            first_month: 1,
            align_weekends: true,
            weekends: "6,0".into(),
            first_day_of_week: 1,
            month_names: "Jan-Feb-Mar-Apr-May-Jun-Jul-Aug-Sep-Oct-Nov-Dec".into(),
            show_timed_events: true,
            show_all_day_events: true,
            single_day_as_multi_day: false,
            event_background: EventBackground::Cal,
            time_24h: true,
            time_zone: None,
            slot_height_em: 1.4,
            bulk_relayout_delay_ms: 1000,
            change_relayout_delay_ms: 100,
            failure_backoff_ms: 3000,
            layout: LayoutOrientation::Column,
        }
    }
}

impl PlannerConfig {
    pub fn config_dir() -> PlannerResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| PlannerError::Config("Could not determine config directory".into()))?
            .join(APP_DIR))
    }

    pub fn config_path() -> PlannerResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default path plus environment overrides, writing a
    /// commented template first if no config file exists yet.
    pub fn load() -> PlannerResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            Self::create_default_config(&path)?;
        }
        Self::load_layers(&path, true)
    }

    /// Load from `path` only.
    pub fn load_from(path: &Path) -> PlannerResult<Self> {
        Self::load_layers(path, false)
    }

    fn load_layers(path: &Path, with_env: bool) -> PlannerResult<Self> {
        let mut builder = Config::builder().add_source(File::from(path).required(false));
        if with_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        }

        let config: PlannerConfig = builder
            .build()
            .map_err(|e| PlannerError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlannerError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        if self.month_count == 0 {
            return Err(PlannerError::Config("month_count must be at least 1".into()));
        }
        if !(1..=12).contains(&self.first_month) {
            return Err(PlannerError::Config(format!(
                "first_month must be 1-12, got {}",
                self.first_month
            )));
        }
        if !(self.slot_height_em > 0.0) {
            return Err(PlannerError::Config("slot_height_em must be positive".into()));
        }
        self.week_start()?;
        self.weekend_days()?;
        self.month_name_list()?;
        self.display_zone()?;
        Ok(())
    }

    pub fn week_start(&self) -> PlannerResult<Weekday> {
        weekday_from_sunday_index(self.first_day_of_week)
    }

    pub fn weekend_days(&self) -> PlannerResult<WeekendDays> {
        self.weekends.parse()
    }

    pub fn month_name_list(&self) -> PlannerResult<MonthNames> {
        self.month_names.parse()
    }

    pub fn display_zone(&self) -> PlannerResult<DisplayZone> {
        DisplayZone::from_name(self.time_zone.as_deref())
    }

    pub fn bulk_relayout_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_relayout_delay_ms)
    }

    pub fn change_relayout_delay(&self) -> Duration {
        Duration::from_millis(self.change_relayout_delay_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }

    /// Months built per page: the visible range plus a buffer either side.
    pub fn page_length(&self) -> u32 {
        2 * self.scroll_buffer + self.month_count
    }

    /// Create a config file with all options commented out.
    pub fn create_default_config(path: &Path) -> PlannerResult<()> {
        let contents = "\
# visual-planner configuration

# Months visible at once, and extra months kept either side for scrolling:
# month_count = 6
# scroll_buffer = 6

# Start at the current month, shifted by auto_scroll_offset months.
# When auto_scroll is off the page starts at first_month (1-12):
# auto_scroll = true
# auto_scroll_offset = -1
# first_month = 1

# Week layout (0 = Sunday):
# align_weekends = true
# weekends = \"6,0\"
# first_day_of_week = 1
# month_names = \"Jan-Feb-Mar-Apr-May-Jun-Jul-Aug-Sep-Oct-Nov-Dec\"

# Events:
# show_timed_events = true
# show_all_day_events = true
# single_day_as_multi_day = false
# event_background = \"cal\"   # cal, white or evt
# time_24h = true
# time_zone = \"Europe/London\"

# Layout:
# layout = \"column\"          # column or list
# slot_height_em = 1.4

# Timing (milliseconds):
# bulk_relayout_delay_ms = 1000
# change_relayout_delay_ms = 100
# failure_backoff_ms = 3000
";

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PlannerError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| PlannerError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
