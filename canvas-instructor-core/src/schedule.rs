//! Course calendar: maps each curriculum block to its due date.
//!
//! A schedule file is a JSON array of `{ "date": "YYYY-MM-DD", "block": "<title>" }`
//! entries where `block` matches the title of a `Block ...` lesson. A block is
//! due `days_until_due` days after its start date, at 23:59 UTC.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::tree::ModuleTree;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("{0} not found in schedule")]
    BlockNotFound(String),

    #[error("due date for {0} is out of range")]
    OutOfRange(String),

    #[error("failed to read schedule {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schedule {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub block: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub days_until_due: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { days_until_due: 7 }
    }
}

/// A block lesson paired with its computed due date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledBlock {
    pub lesson_id: u64,
    pub title: String,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulePlan {
    pub scheduled: Vec<ScheduledBlock>,
    /// Titles of block lessons with no schedule entry.
    pub unscheduled: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModuleSchedule {
    entries: Vec<ScheduleEntry>,
    config: ScheduleConfig,
}

impl ModuleSchedule {
    pub fn new(entries: Vec<ScheduleEntry>, config: ScheduleConfig) -> Self {
        Self { entries, config }
    }

    pub fn from_json_file<P: AsRef<Path>>(
        path: P,
        config: ScheduleConfig,
    ) -> Result<Self, ScheduleError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<ScheduleEntry> =
            serde_json::from_str(&content).map_err(|source| ScheduleError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(schedule_path = ?path, entries = entries.len(), "Loaded module schedule");
        Ok(Self::new(entries, config))
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn calculate_due_date(&self, block: &str) -> Result<DateTime<Utc>, ScheduleError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.block == block)
            .ok_or_else(|| ScheduleError::BlockNotFound(block.to_string()))?;

        let due_day = entry
            .date
            .checked_add_days(Days::new(self.config.days_until_due))
            .ok_or_else(|| ScheduleError::OutOfRange(block.to_string()))?;
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 0)
            .ok_or_else(|| ScheduleError::OutOfRange(block.to_string()))?;
        let due_at = due_day.and_time(end_of_day).and_utc();
        debug!(block, %due_at, "Calculated block due date");
        Ok(due_at)
    }

    /// Pairs every block lesson of `tree` with its due date.
    pub fn plan(&self, tree: &ModuleTree) -> SchedulePlan {
        let mut plan = SchedulePlan::default();
        for block in tree.blocks() {
            match self.calculate_due_date(&block.title) {
                Ok(due_at) => plan.scheduled.push(ScheduledBlock {
                    lesson_id: block.id,
                    title: block.title.clone(),
                    due_at,
                }),
                Err(e) => {
                    warn!(lesson_id = block.id, title = %block.title, error = %e, "Block has no due date");
                    plan.unscheduled.push(block.title.clone());
                }
            }
        }
        plan
    }
}
