//! Daily task sheet export for the care staff rota.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{format_timestamp, Database, DbResult};
use crate::models::{format_hour, CareType, ScheduledTaskFilter, TaskStatus, VitalKind};

/// A day's scheduled tasks, ready to print or hand to another system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSheet {
    /// Export metadata
    pub metadata: TaskSheetMetadata,
    /// One row per scheduled task, in schedule order
    pub rows: Vec<TaskSheetRow>,
}

/// Task sheet metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSheetMetadata {
    /// Day covered, `YYYY-MM-DD`
    pub day: String,
    /// Resident the sheet is restricted to, if any
    pub resident_id: Option<i64>,
    /// Export timestamp
    pub exported_at: String,
    pub total: usize,
    pub pending: usize,
}

/// Single line of the task sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSheetRow {
    pub scheduled_task_id: i64,
    pub resident_id: i64,
    /// Scheduled time of day, `HH:MM`
    pub time: String,
    pub care_type_code: String,
    pub care_type_name: String,
    pub status: TaskStatus,
    pub result_value: Option<String>,
    pub result_unit: Option<String>,
    /// Vital-sign results outside their reference range. `None` when the care
    /// type is not a vital sign or no readable result was recorded.
    pub out_of_range: Option<bool>,
    pub notes: Option<String>,
}

impl TaskSheet {
    /// Collect the tasks scheduled on `day`, optionally for one resident.
    pub fn for_day(db: &Database, day: NaiveDate, resident_id: Option<i64>) -> DbResult<Self> {
        let mut filter = ScheduledTaskFilter::for_day(day);
        filter.resident_id = resident_id;
        let tasks = db.list_scheduled_tasks(&filter)?;

        let mut care_types: HashMap<i64, Option<CareType>> = HashMap::new();
        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !care_types.contains_key(&task.care_type_id) {
                let care_type = db.get_care_type(task.care_type_id)?;
                care_types.insert(task.care_type_id, care_type);
            }
            let care_type = care_types.get(&task.care_type_id).and_then(Option::as_ref);

            let code = care_type.map(|t| t.code.clone()).unwrap_or_default();
            let out_of_range = VitalKind::for_care_type_code(&code).and_then(|kind| {
                kind.flag_result(task.result_value.as_deref(), task.result_numeric)
            });

            rows.push(TaskSheetRow {
                scheduled_task_id: task.id,
                resident_id: task.resident_id,
                time: format_hour(task.scheduled_at.time()),
                care_type_name: care_type.map(|t| t.name.clone()).unwrap_or_default(),
                care_type_code: code,
                status: task.status,
                result_value: task.result_value,
                result_unit: care_type.and_then(|t| t.result_unit.clone()),
                out_of_range,
                notes: task.notes,
            });
        }

        let pending = rows.iter().filter(|r| r.status == TaskStatus::Pending).count();
        tracing::debug!(%day, rows = rows.len(), "built task sheet");

        Ok(Self {
            metadata: TaskSheetMetadata {
                day: day.format("%Y-%m-%d").to_string(),
                resident_id,
                exported_at: format_timestamp(&Utc::now()),
                total: rows.len(),
                pending,
            },
            rows,
        })
    }

    /// Rows with a result flagged out of range.
    pub fn alerts(&self) -> impl Iterator<Item = &TaskSheetRow> {
        self.rows.iter().filter(|r| r.out_of_range == Some(true))
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("day,time,resident_id,care_type_code,care_type_name,status,result,unit,out_of_range,notes\n");

        for row in &self.rows {
            let out_of_range = match row.out_of_range {
                Some(true) => "yes",
                Some(false) => "no",
                None => "",
            };
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                self.metadata.day,
                row.time,
                row.resident_id,
                escape_csv(&row.care_type_code),
                escape_csv(&row.care_type_name),
                row.status,
                escape_csv(row.result_value.as_deref().unwrap_or("")),
                escape_csv(row.result_unit.as_deref().unwrap_or("")),
                out_of_range,
                escape_csv(row.notes.as_deref().unwrap_or("")),
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
