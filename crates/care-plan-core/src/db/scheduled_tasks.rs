//! Scheduled task database operations.
//!
//! Occurrences are only ever created, executed or re-statused; nothing here
//! deletes a row.

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{format_timestamp, now_utc, parse_timestamp, Database, DbError, DbResult};
use crate::models::{
    day_bounds, Actor, ExecutionResult, NewScheduledTask, ScheduledTask, ScheduledTaskFilter,
    TaskStatus, TaskType,
};

const SCHEDULED_TASK_COLUMNS: &str = "id, care_task_id, care_group_id, resident_id, care_type_id, \
     scheduled_at, task_type, status, executed_at, executed_by, result_value, result_numeric, \
     notes, created_at, updated_at";

impl Database {
    /// Create a pending occurrence.
    pub fn insert_scheduled_task(&self, new: &NewScheduledTask) -> DbResult<ScheduledTask> {
        self.require_care_type(new.care_type_id)?;
        if let Some(care_task_id) = new.care_task_id {
            self.require_care_task(care_task_id)?;
        }
        if let Some(care_group_id) = new.care_group_id {
            self.require_care_group(care_group_id)?;
        }
        if new.task_type == TaskType::Group && new.care_group_id.is_none() {
            tracing::warn!(
                resident_id = new.resident_id,
                "group occurrence created without a care group"
            );
        }

        let now = format_timestamp(&now_utc());
        self.conn.execute(
            r#"
            INSERT INTO scheduled_tasks (
                care_task_id, care_group_id, resident_id, care_type_id, scheduled_at,
                task_type, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                new.care_task_id,
                new.care_group_id,
                new.resident_id,
                new.care_type_id,
                format_timestamp(&new.scheduled_at),
                new.task_type.as_str(),
                TaskStatus::Pending.as_str(),
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(
            scheduled_task_id = id,
            resident_id = new.resident_id,
            care_type_id = new.care_type_id,
            scheduled_at = %new.scheduled_at,
            "scheduled task"
        );
        self.require_scheduled_task(id)
    }

    /// Get an occurrence by ID.
    pub fn get_scheduled_task(&self, id: i64) -> DbResult<Option<ScheduledTask>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM scheduled_tasks WHERE id = ?",
                    SCHEDULED_TASK_COLUMNS
                ),
                [id],
                read_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub(crate) fn require_scheduled_task(&self, id: i64) -> DbResult<ScheduledTask> {
        self.get_scheduled_task(id)?
            .ok_or_else(|| DbError::NotFound(format!("scheduled task {}", id)))
    }

    /// Occurrences matching every set field of `filter`, ordered by
    /// `scheduled_at` ascending.
    pub fn list_scheduled_tasks(&self, filter: &ScheduledTaskFilter) -> DbResult<Vec<ScheduledTask>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(from) = filter.date_from {
            clauses.push("scheduled_at >= ?");
            values.push(Value::Text(format_timestamp(&from)));
        }
        if let Some(to) = filter.date_to {
            clauses.push("scheduled_at < ?");
            values.push(Value::Text(format_timestamp(&to)));
        }
        if let Some(resident_id) = filter.resident_id {
            clauses.push("resident_id = ?");
            values.push(Value::Integer(resident_id));
        }
        if let Some(status) = filter.status {
            if status == TaskStatus::Pending {
                clauses.push("COALESCE(status, 'pending') = ?");
            } else {
                clauses.push("status = ?");
            }
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(care_type_id) = filter.care_type_id {
            clauses.push("care_type_id = ?");
            values.push(Value::Integer(care_type_id));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM scheduled_tasks {} ORDER BY scheduled_at, id",
            SCHEDULED_TASK_COLUMNS, where_clause
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), read_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.try_into()?);
        }
        tracing::debug!(count = tasks.len(), "listed scheduled tasks");
        Ok(tasks)
    }

    /// Number of occurrences scheduled on a UTC day.
    pub fn count_scheduled_tasks_on(&self, day: NaiveDate) -> DbResult<i64> {
        let (from, to) = day_bounds(day);
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM scheduled_tasks WHERE scheduled_at >= ?1 AND scheduled_at < ?2",
            params![format_timestamp(&from), format_timestamp(&to)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record an execution: status becomes `completed` with the actor and
    /// the current time stamped on the row.
    ///
    /// Executing an already executed occurrence overwrites the earlier record.
    pub fn execute_scheduled_task(
        &self,
        actor: &Actor,
        id: i64,
        result: &ExecutionResult,
    ) -> DbResult<ScheduledTask> {
        let mut task = self.require_scheduled_task(id)?;

        if let Some(value) = result.result_numeric {
            if !value.is_finite() {
                return Err(DbError::Validation(format!(
                    "numeric result must be a finite number, got {}",
                    value
                )));
            }
        }

        if let Some(care_type) = self.get_care_type(task.care_type_id)? {
            if care_type.requires_result && result.is_empty() {
                tracing::warn!(
                    scheduled_task_id = id,
                    code = %care_type.code,
                    "executed without the result its care type requires"
                );
            } else if care_type.expects_numeric_result() && result.result_numeric.is_none() {
                tracing::warn!(
                    scheduled_task_id = id,
                    code = %care_type.code,
                    "numeric care type executed without a numeric result"
                );
            }
        }
        if task.is_closed() {
            tracing::warn!(scheduled_task_id = id, "overwriting an earlier execution");
        }

        let now = now_utc();
        task.status = TaskStatus::Completed;
        task.executed_at = Some(now);
        task.executed_by = Some(actor.user_id);
        task.result_value = result.result_value.clone();
        task.result_numeric = result.result_numeric;
        task.notes = result.notes.clone();
        task.updated_at = now;

        self.conn.execute(
            r#"
            UPDATE scheduled_tasks SET
                status = ?2,
                executed_at = ?3,
                executed_by = ?4,
                result_value = ?5,
                result_numeric = ?6,
                notes = ?7,
                updated_at = ?3
            WHERE id = ?1
            "#,
            params![
                id,
                task.status.as_str(),
                format_timestamp(&now),
                actor.user_id,
                task.result_value,
                task.result_numeric,
                task.notes,
            ],
        )?;

        tracing::info!(scheduled_task_id = id, executed_by = actor.user_id, "executed task");
        Ok(task)
    }

    /// Change only the status of an occurrence. Execution fields are left as
    /// they are.
    pub fn update_scheduled_task_status(
        &self,
        id: i64,
        status: TaskStatus,
    ) -> DbResult<ScheduledTask> {
        let mut task = self.require_scheduled_task(id)?;
        task.status = status;
        task.updated_at = now_utc();

        self.conn.execute(
            "UPDATE scheduled_tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), format_timestamp(&task.updated_at)],
        )?;

        tracing::info!(scheduled_task_id = id, status = %status, "updated task status");
        Ok(task)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ScheduledTaskRow> {
    Ok(ScheduledTaskRow {
        id: row.get(0)?,
        care_task_id: row.get(1)?,
        care_group_id: row.get(2)?,
        resident_id: row.get(3)?,
        care_type_id: row.get(4)?,
        scheduled_at: row.get(5)?,
        task_type: row.get(6)?,
        status: row.get(7)?,
        executed_at: row.get(8)?,
        executed_by: row.get(9)?,
        result_value: row.get(10)?,
        result_numeric: row.get(11)?,
        notes: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Intermediate row struct for database mapping.
struct ScheduledTaskRow {
    id: i64,
    care_task_id: Option<i64>,
    care_group_id: Option<i64>,
    resident_id: i64,
    care_type_id: i64,
    scheduled_at: String,
    task_type: String,
    status: Option<String>,
    executed_at: Option<String>,
    executed_by: Option<i64>,
    result_value: Option<String>,
    result_numeric: Option<f64>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ScheduledTaskRow> for ScheduledTask {
    type Error = DbError;

    fn try_from(row: ScheduledTaskRow) -> Result<Self, Self::Error> {
        let status = match row.status {
            Some(status) => status.parse()?,
            None => TaskStatus::Pending,
        };

        Ok(ScheduledTask {
            id: row.id,
            care_task_id: row.care_task_id,
            care_group_id: row.care_group_id,
            resident_id: row.resident_id,
            care_type_id: row.care_type_id,
            scheduled_at: parse_timestamp(&row.scheduled_at)?,
            task_type: row.task_type.parse()?,
            status,
            executed_at: row.executed_at.as_deref().map(parse_timestamp).transpose()?,
            executed_by: row.executed_by,
            result_value: row.result_value,
            result_numeric: row.result_numeric,
            notes: row.notes,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}
