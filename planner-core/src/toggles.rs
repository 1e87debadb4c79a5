//! Per-calendar visibility toggles at ~/.config/visual-planner/toggles.toml

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};

const TOGGLES_FILE: &str = "toggles.toml";

/// Ids of calendars the user has hidden. Everything else is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarToggles {
    #[serde(default)]
    hidden: BTreeSet<String>,
}

impl CalendarToggles {
    pub fn path() -> PlannerResult<PathBuf> {
        Ok(PlannerConfig::config_dir()?.join(TOGGLES_FILE))
    }

    pub fn load() -> PlannerResult<Self> {
        Self::load_from(&Self::path()?)
    }

    /// A missing file means nothing is hidden.
    pub fn load_from(path: &Path) -> PlannerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PlannerError::Serialization(e.to_string()))
    }

    pub fn save(&self) -> PlannerResult<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> PlannerResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlannerError::Serialization(e.to_string()))?;

        let temp = path.with_extension("toml.tmp");
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, path)?;
        Ok(())
    }

    pub fn is_hidden(&self, calendar_id: &str) -> bool {
        self.hidden.contains(calendar_id)
    }

    pub fn set_hidden(&mut self, calendar_id: &str, hidden: bool) {
        if hidden {
            self.hidden.insert(calendar_id.to_string());
        } else {
            self.hidden.remove(calendar_id);
        }
    }

    /// Flip a calendar's state. Returns true if it is now hidden.
    pub fn toggle(&mut self, calendar_id: &str) -> bool {
        let hidden = !self.is_hidden(calendar_id);
        self.set_hidden(calendar_id, hidden);
        hidden
    }

    pub fn hidden(&self) -> impl Iterator<Item = &str> {
        self.hidden.iter().map(String::as_str)
    }
}
