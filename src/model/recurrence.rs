use serde::{Deserialize, Serialize};

use super::ordered::Id;
use crate::ops::weekday::MondayFirst;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Daily,
    AlternateDays,
    Weekly,
}

impl RecurrenceType {
    pub fn parse(s: &str) -> Option<RecurrenceType> {
        match s {
            "daily" => Some(RecurrenceType::Daily),
            "alternate_days" | "alternate" => Some(RecurrenceType::AlternateDays),
            "weekly" => Some(RecurrenceType::Weekly),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceType::Daily => write!(f, "daily"),
            RecurrenceType::AlternateDays => write!(f, "alternate_days"),
            RecurrenceType::Weekly => write!(f, "weekly"),
        }
    }
}

/// A stored recurrence rule. Days are in the persisted Monday-first
/// numbering; use `ops::weekday` to show them to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTask {
    pub id: Id,
    pub section_id: Id,
    pub title: String,
    pub recurrence_type: RecurrenceType,
    #[serde(default)]
    pub recurrence_days: Vec<MondayFirst>,
    /// `HH:MM`
    pub recurrence_time: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Create/update body for a recurrence. Built only from a validated form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePayload {
    pub section_id: Id,
    pub title: String,
    pub recurrence_type: RecurrenceType,
    pub recurrence_days: Vec<MondayFirst>,
    pub recurrence_time: String,
}
