use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::IntErrorKind;
use uuid::Uuid;

use crate::errors::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    #[default]
    Boolean,
    Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub target_minutes: u32,
    /// Minutes done toward `target_minutes`. Only meaningful for duration activities.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl Activity {
    pub fn is_done(&self, checked: bool) -> bool {
        match self.kind {
            ActivityKind::Boolean => checked,
            ActivityKind::Duration => {
                self.target_minutes > 0 && self.progress >= self.target_minutes
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub name: String,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub target_minutes: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewActivity {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::Validation("activity name is required".into()));
        }
        validate_schedule(self.scheduled_at.as_deref())?;
        validate_target(self.kind, self.target_minutes)
    }

    pub fn into_activity(self, user_id: UserId) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            user_id,
            name: self.name.trim().to_string(),
            scheduled_at: non_blank(self.scheduled_at),
            kind: self.kind,
            target_minutes: self.target_minutes,
            progress: 0,
            description: non_blank(self.description),
        }
    }
}

/// Fields editable from the activity form. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActivityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActivityPatch {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(TrackerError::Validation("activity name is required".into()));
            }
        }
        validate_schedule(self.scheduled_at.as_deref())
    }

    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|name| name.trim().to_string());
        self
    }
}

fn validate_schedule(value: Option<&str>) -> Result<(), TrackerError> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(time) => NaiveTime::parse_from_str(time, "%H:%M")
            .map(|_| ())
            .map_err(|_| TrackerError::Validation(format!("'{time}' is not a HH:MM time"))),
    }
}

pub fn validate_target(kind: ActivityKind, target_minutes: u32) -> Result<(), TrackerError> {
    if kind == ActivityKind::Duration && target_minutes == 0 {
        return Err(TrackerError::Validation(
            "duration activities need a target above 0 minutes".into(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub activity_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Never,
    Days,
    Weeks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: Uuid,
    pub user_id: UserId,
    pub list_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewList {
    pub name: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewListItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistView {
    pub list: TodoList,
    pub pending: Vec<ListItem>,
    pub validated: Vec<ListItem>,
}

/// One activity as seen on a given day: the activity row joined with that
/// day's tracking record, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: Activity,
    pub checked: bool,
    pub tracking_id: Option<Uuid>,
    pub done: bool,
}

/// A tracking row joined with its activity. `activity` is `None` when the
/// activity has since been deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct DayEntry {
    pub activity: Option<Activity>,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub total: u32,
    pub done: u32,
    pub percent: u8,
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub locked: bool,
    pub status: DayStatus,
    pub activities: Vec<ActivityView>,
}

/// Raw slider value. Anything that is not a number counts as 0.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ProgressInput(pub Value);

impl ProgressInput {
    pub fn minutes(&self) -> i64 {
        match &self.0 {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value.trunc() as i64))
                .unwrap_or(0),
            Value::String(text) => leading_integer(text.trim()),
            _ => 0,
        }
    }
}

impl From<i64> for ProgressInput {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

fn leading_integer(text: &str) -> i64 {
    let digits_end = text
        .char_indices()
        .find(|(idx, ch)| !(ch.is_ascii_digit() || (*idx == 0 && (*ch == '-' || *ch == '+'))))
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    match text[..digits_end].parse::<i64>() {
        Ok(value) => value,
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => 0,
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    #[serde(default)]
    pub value: ProgressInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryView {
    #[default]
    Day,
    Week,
    Month,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub view: HistoryView,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub include_unlocked: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub activity_id: Uuid,
    pub name: String,
    pub kind: ActivityKind,
    pub done: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub view: HistoryView,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub previous: NaiveDate,
    pub next: NaiveDate,
    pub days: Vec<DayStatus>,
    /// Per-activity breakdown, filled for the single-day view only.
    pub items: Vec<HistoryItem>,
}
