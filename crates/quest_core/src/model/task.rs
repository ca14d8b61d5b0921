use crate::error::AppError;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

/// Difficulty tier. Rank and coin reward are fixed per tier and are not
/// stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskLevel {
    Simple,
    Normal,
    Hard,
    Epic,
}

impl TaskLevel {
    pub const ALL: [TaskLevel; 4] = [
        TaskLevel::Simple,
        TaskLevel::Normal,
        TaskLevel::Hard,
        TaskLevel::Epic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Simple => "Simple",
            Self::Normal => "Normal",
            Self::Hard => "Hard",
            Self::Epic => "Epic",
        }
    }

    pub fn order(self) -> u8 {
        match self {
            Self::Simple => 1,
            Self::Normal => 2,
            Self::Hard => 3,
            Self::Epic => 4,
        }
    }

    pub fn reward(self) -> u32 {
        match self {
            Self::Simple => 10,
            Self::Normal => 25,
            Self::Hard => 50,
            Self::Epic => 100,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            "epic" => Some(Self::Epic),
            _ => None,
        }
    }
}

/// How completion cycles: once ever, once per calendar day, or once per
/// rolling seven-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    Once,
    Daily,
    Weekly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 3] = [Recurrence::Once, Recurrence::Daily, Recurrence::Weekly];

    pub fn label(self) -> &'static str {
        match self {
            Self::Once => "One-time",
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" | "one-time" | "onetime" => Some(Self::Once),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub level: TaskLevel,
    pub recurrence: Recurrence,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub last_completed_at: Option<String>,
}

/// Derived presentation state; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    InProgress,
    Available,
    Cooldown,
    Completed,
}

impl DisplayStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Available => "Available",
            Self::Cooldown => "Cooldown",
            Self::Completed => "Completed",
        }
    }
}

impl Task {
    pub fn is_once(&self) -> bool {
        self.recurrence == Recurrence::Once
    }

    /// Completion rule against an explicit calendar date. Daily and Weekly
    /// compare dates only, so completing at 23:59 unblocks at the next
    /// midnight, not 24 hours later.
    pub fn can_complete_on(&self, today: Date, offset: UtcOffset) -> Result<bool, AppError> {
        if self.is_once() {
            return Ok(!self.completed);
        }

        let last = match self.last_completed_at.as_deref() {
            Some(value) => parse_local_date(value, offset)?,
            None => return Ok(true),
        };

        Ok(match self.recurrence {
            Recurrence::Daily => today > last,
            Recurrence::Weekly => today >= last + Duration::days(7),
            Recurrence::Once => unreachable!("handled above"),
        })
    }

    pub fn can_complete(&self) -> Result<bool, AppError> {
        let offset = local_offset();
        let today = OffsetDateTime::now_utc().to_offset(offset).date();
        self.can_complete_on(today, offset)
    }

    /// Records a completion if the task is currently completable. Returns
    /// false without mutating anything otherwise. One-time tasks flip the
    /// terminal `completed` flag; recurring tasks only move
    /// `last_completed_at`.
    pub fn mark_completed(&mut self) -> Result<bool, AppError> {
        if !self.can_complete()? {
            return Ok(false);
        }

        let now = now_rfc3339()?;
        if self.is_once() {
            self.completed = true;
            self.completed_at = Some(now);
        } else {
            self.last_completed_at = Some(now);
        }

        Ok(true)
    }

    pub fn display_status(&self) -> Result<DisplayStatus, AppError> {
        let offset = local_offset();
        let today = OffsetDateTime::now_utc().to_offset(offset).date();
        self.display_status_on(today, offset)
    }

    pub fn display_status_on(
        &self,
        today: Date,
        offset: UtcOffset,
    ) -> Result<DisplayStatus, AppError> {
        if self.is_once() {
            return Ok(if self.completed {
                DisplayStatus::Completed
            } else {
                DisplayStatus::InProgress
            });
        }

        if self.can_complete_on(today, offset)? {
            Ok(DisplayStatus::Available)
        } else if self.last_completed_at.is_some() {
            Ok(DisplayStatus::Cooldown)
        } else {
            Ok(DisplayStatus::InProgress)
        }
    }
}

/// Append-only record of a coin grant. Survives deletion of the task it
/// references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub task_id: String,
    pub task_name: String,
    pub coins: u32,
    pub timestamp: String,
}

pub(crate) fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub(crate) fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub(crate) fn parse_local_date(value: &str, offset: UtcOffset) -> Result<Date, AppError> {
    let parsed = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|_| AppError::invalid_data("timestamp must be RFC3339"))?;
    Ok(parsed.to_offset(offset).date())
}
