//! Scheduled task instances and their status lifecycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    /// Whether an occurrence belongs to a single resident's order or a group session.
    pub enum TaskType: "task type" {
        Individual => "individual",
        Group => "group",
    }
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Individual
    }
}

wire_enum! {
    /// Status of a scheduled task.
    ///
    /// `Pending` is the only initial state; all others are terminal.
    pub enum TaskStatus: "task status" {
        Pending => "pending",
        Completed => "completed",
        NotDone => "not_done",
        Absent => "absent",
        Cancelled => "cancelled",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

/// One dated occurrence of a care type for a resident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledTask {
    pub id: i64,
    /// Standing order this occurrence came from, if any
    pub care_task_id: Option<i64>,
    /// Group session this occurrence came from, if any
    pub care_group_id: Option<i64>,
    pub resident_id: i64,
    pub care_type_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Set when executed
    pub executed_at: Option<DateTime<Utc>>,
    pub executed_by: Option<i64>,
    /// Free-form result; may hold JSON for composite results
    pub result_value: Option<String>,
    pub result_numeric: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledTask {
    /// Closed for editing once an execution has been recorded.
    pub fn is_closed(&self) -> bool {
        self.executed_at.is_some()
    }
}

/// Fields for creating an occurrence. Always starts `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewScheduledTask {
    pub resident_id: i64,
    pub care_type_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub task_type: TaskType,
    pub care_task_id: Option<i64>,
    pub care_group_id: Option<i64>,
}

impl NewScheduledTask {
    pub fn new(resident_id: i64, care_type_id: i64, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            resident_id,
            care_type_id,
            scheduled_at,
            task_type: TaskType::Individual,
            care_task_id: None,
            care_group_id: None,
        }
    }
}

/// Values captured when a task is executed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub result_value: Option<String>,
    pub result_numeric: Option<f64>,
    pub notes: Option<String>,
}

impl ExecutionResult {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            result_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A numeric result, mirrored into the text value.
    pub fn numeric(value: f64) -> Self {
        Self {
            result_value: Some(value.to_string()),
            result_numeric: Some(value),
            notes: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.result_value.is_none() && self.result_numeric.is_none()
    }
}

/// Query filter for scheduled tasks. Unset fields do not narrow.
///
/// The date window is half-open: `date_from <= scheduled_at < date_to`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduledTaskFilter {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub resident_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub care_type_id: Option<i64>,
}

impl ScheduledTaskFilter {
    /// Everything scheduled on the given UTC day.
    pub fn for_day(day: NaiveDate) -> Self {
        let (from, to) = day_bounds(day);
        Self {
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        }
    }

    pub fn resident(mut self, resident_id: i64) -> Self {
        self.resident_id = Some(resident_id);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn care_type(mut self, care_type_id: i64) -> Self {
        self.care_type_id = Some(care_type_id);
        self
    }

    /// Whether a task passes this filter.
    pub fn matches(&self, task: &ScheduledTask) -> bool {
        self.date_from.map_or(true, |from| task.scheduled_at >= from)
            && self.date_to.map_or(true, |to| task.scheduled_at < to)
            && self.resident_id.map_or(true, |id| task.resident_id == id)
            && self.status.map_or(true, |status| task.status == status)
            && self.care_type_id.map_or(true, |id| task.care_type_id == id)
    }
}

/// Midnight of `day` and midnight of the following day, UTC.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let next = day
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start, next)
}

/// Bucket tasks by status, preserving their order within each bucket.
pub fn group_by_status(tasks: Vec<ScheduledTask>) -> BTreeMap<TaskStatus, Vec<ScheduledTask>> {
    let mut board: BTreeMap<TaskStatus, Vec<ScheduledTask>> = BTreeMap::new();
    for task in tasks {
        board.entry(task.status).or_default().push(task);
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_task(id: i64, hour: u32, status: TaskStatus) -> ScheduledTask {
        let at = Utc.with_ymd_and_hms(2024, 1, 10, hour, 0, 0).unwrap();
        ScheduledTask {
            id,
            care_task_id: None,
            care_group_id: None,
            resident_id: 42,
            care_type_id: 1,
            scheduled_at: at,
            task_type: TaskType::Individual,
            status,
            executed_at: None,
            executed_by: None,
            result_value: None,
            result_numeric: None,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        for status in &TaskStatus::ALL[1..] {
            assert!(status.is_terminal(), "{} should be terminal", status);
        }
        assert_eq!("not_done".parse::<TaskStatus>().unwrap(), TaskStatus::NotDone);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_group_by_status() {
        let tasks = vec![
            make_task(1, 8, TaskStatus::Pending),
            make_task(2, 9, TaskStatus::Completed),
            make_task(3, 10, TaskStatus::Pending),
            make_task(4, 11, TaskStatus::Absent),
        ];
        let board = group_by_status(tasks);

        assert_eq!(board.len(), 3);
        let pending: Vec<i64> = board[&TaskStatus::Pending].iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![1, 3]);
        assert_eq!(board[&TaskStatus::Completed].len(), 1);
        assert!(!board.contains_key(&TaskStatus::NotDone));
    }

    #[test]
    fn test_day_bounds() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let (from, to) = day_bounds(day);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_filter_window_is_half_open() {
        let filter = ScheduledTaskFilter {
            date_from: Some(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()),
            date_to: Some(Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(filter.matches(&make_task(1, 8, TaskStatus::Pending)));
        assert!(filter.matches(&make_task(2, 9, TaskStatus::Pending)));
        assert!(!filter.matches(&make_task(3, 10, TaskStatus::Pending)));
        assert!(!filter.matches(&make_task(4, 7, TaskStatus::Pending)));
    }

    #[test]
    fn test_filter_builders() {
        let filter = ScheduledTaskFilter::default()
            .resident(42)
            .status(TaskStatus::Completed);
        assert!(!filter.matches(&make_task(1, 8, TaskStatus::Pending)));
        assert!(filter.matches(&make_task(2, 8, TaskStatus::Completed)));
        assert!(!filter.care_type(7).matches(&make_task(3, 8, TaskStatus::Completed)));
    }

    #[test]
    fn test_execution_result_numeric_mirrors_text() {
        let result = ExecutionResult::numeric(36.6);
        assert_eq!(result.result_value.as_deref(), Some("36.6"));
        assert_eq!(result.result_numeric, Some(36.6));
        assert!(ExecutionResult::default().is_empty());
    }
}
