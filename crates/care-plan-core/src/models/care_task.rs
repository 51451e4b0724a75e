//! Per-resident standing orders.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::care_type::ProfessionalArea;
use super::recurrence::Recurrence;

wire_enum! {
    /// Lifecycle of a standing order.
    pub enum CareTaskStatus: "care task status" {
        Active => "active",
        Paused => "paused",
        Completed => "completed",
        /// Soft-deleted
        Cancelled => "cancelled",
    }
}

/// A standing order: this resident receives this care type on this pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareTask {
    pub id: i64,
    /// External resident id
    pub resident_id: i64,
    pub care_type_id: i64,
    /// Free-text refinement of the care type (e.g. "left heel")
    pub subtype: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Time of day the care is due
    pub scheduled_hour: Option<NaiveTime>,
    pub recurrence: Recurrence,
    pub professional_area: Option<ProfessionalArea>,
    pub assigned_user_id: Option<i64>,
    pub indication: Option<String>,
    pub notes: Option<String>,
    pub status: CareTaskStatus,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a standing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCareTask {
    pub resident_id: i64,
    pub care_type_id: i64,
    pub subtype: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub scheduled_hour: Option<NaiveTime>,
    pub recurrence: Recurrence,
    pub professional_area: Option<ProfessionalArea>,
    pub assigned_user_id: Option<i64>,
    pub indication: Option<String>,
    pub notes: Option<String>,
}

impl NewCareTask {
    pub fn new(resident_id: i64, care_type_id: i64, start_date: NaiveDate) -> Self {
        Self {
            resident_id,
            care_type_id,
            subtype: None,
            start_date,
            end_date: None,
            scheduled_hour: None,
            recurrence: Recurrence::None,
            professional_area: None,
            assigned_user_id: None,
            indication: None,
            notes: None,
        }
    }
}

/// Partial update of a standing order. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CareTaskPatch {
    pub care_type_id: Option<i64>,
    pub subtype: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// `Some(None)` clears the end date
    pub end_date: Option<Option<NaiveDate>>,
    pub scheduled_hour: Option<NaiveTime>,
    pub recurrence: Option<Recurrence>,
    pub professional_area: Option<ProfessionalArea>,
    pub assigned_user_id: Option<i64>,
    pub indication: Option<String>,
    pub notes: Option<String>,
    pub status: Option<CareTaskStatus>,
}

impl CareTaskPatch {
    pub fn apply_to(&self, task: &mut CareTask) {
        if let Some(care_type_id) = self.care_type_id {
            task.care_type_id = care_type_id;
        }
        if let Some(subtype) = &self.subtype {
            task.subtype = Some(subtype.clone());
        }
        if let Some(start_date) = self.start_date {
            task.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            task.end_date = end_date;
        }
        if let Some(hour) = self.scheduled_hour {
            task.scheduled_hour = Some(hour);
        }
        if let Some(recurrence) = &self.recurrence {
            task.recurrence = recurrence.clone();
        }
        if let Some(area) = self.professional_area {
            task.professional_area = Some(area);
        }
        if let Some(user_id) = self.assigned_user_id {
            task.assigned_user_id = Some(user_id);
        }
        if let Some(indication) = &self.indication {
            task.indication = Some(indication.clone());
        }
        if let Some(notes) = &self.notes {
            task.notes = Some(notes.clone());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

/// An end date must not precede the start date.
pub fn check_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), String> {
    match end {
        Some(end) if end < start => Err(format!(
            "end date {} precedes start date {}",
            end, start
        )),
        _ => Ok(()),
    }
}

/// Parse a time of day written as `HH:MM` (seconds accepted).
pub fn parse_hour(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Format a time of day as `HH:MM`.
pub fn format_hour(hour: NaiveTime) -> String {
    hour.format("%H:%M").to_string()
}
