//! Care task (standing order) database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    format_date, format_timestamp, now_utc, parse_date, parse_timestamp, Database, DbError,
    DbResult,
};
use crate::models::{
    check_date_range, format_hour, parse_hour, Actor, CareTask, CareTaskPatch, CareTaskStatus,
    NewCareTask, Recurrence,
};

const CARE_TASK_COLUMNS: &str = "id, resident_id, care_type_id, subtype, start_date, end_date, \
     scheduled_hour, recurrence_type, recurrence_pattern, professional_area, assigned_user_id, \
     indication, notes, status, created_by, created_at, updated_at";

impl Database {
    /// Insert a new standing order for a resident.
    ///
    /// No scheduled tasks are materialised from it.
    pub fn insert_care_task(&self, actor: &Actor, new: &NewCareTask) -> DbResult<CareTask> {
        check_date_range(new.start_date, new.end_date).map_err(DbError::Validation)?;
        new.recurrence.validate().map_err(DbError::Validation)?;
        self.require_care_type(new.care_type_id)?;

        let now = format_timestamp(&now_utc());
        self.conn.execute(
            r#"
            INSERT INTO care_tasks (
                resident_id, care_type_id, subtype, start_date, end_date,
                scheduled_hour, recurrence_type, recurrence_pattern, professional_area,
                assigned_user_id, indication, notes, status, created_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 'active', ?13, ?14, ?14)
            "#,
            params![
                new.resident_id,
                new.care_type_id,
                new.subtype,
                format_date(&new.start_date),
                new.end_date.as_ref().map(format_date),
                new.scheduled_hour.map(format_hour),
                new.recurrence.kind().as_str(),
                new.recurrence.pattern_json()?,
                new.professional_area.map(|a| a.as_str()),
                new.assigned_user_id,
                new.indication,
                new.notes,
                actor.user_id,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(
            care_task_id = id,
            resident_id = new.resident_id,
            care_type_id = new.care_type_id,
            recurrence = %new.recurrence.kind(),
            "created care task"
        );
        self.require_care_task(id)
    }

    /// Get a care task by ID.
    pub fn get_care_task(&self, id: i64) -> DbResult<Option<CareTask>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM care_tasks WHERE id = ?", CARE_TASK_COLUMNS),
                [id],
                read_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub(crate) fn require_care_task(&self, id: i64) -> DbResult<CareTask> {
        self.get_care_task(id)?
            .ok_or_else(|| DbError::NotFound(format!("care task {}", id)))
    }

    /// List a resident's standing orders, newest first.
    ///
    /// With `active_only`, only orders in status `active` are returned.
    pub fn list_care_tasks_for_resident(
        &self,
        resident_id: i64,
        active_only: bool,
    ) -> DbResult<Vec<CareTask>> {
        let filter = if active_only { "AND status = 'active'" } else { "" };
        let sql = format!(
            "SELECT {} FROM care_tasks WHERE resident_id = ? {} ORDER BY created_at DESC, id DESC",
            CARE_TASK_COLUMNS, filter
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([resident_id], read_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.try_into()?);
        }
        Ok(tasks)
    }

    /// Apply a partial update, re-validating the merged order.
    pub fn update_care_task(&self, id: i64, patch: &CareTaskPatch) -> DbResult<CareTask> {
        let mut task = self.require_care_task(id)?;
        if let Some(care_type_id) = patch.care_type_id {
            self.require_care_type(care_type_id)?;
        }

        patch.apply_to(&mut task);
        check_date_range(task.start_date, task.end_date).map_err(DbError::Validation)?;
        task.recurrence.validate().map_err(DbError::Validation)?;
        task.updated_at = now_utc();

        self.conn.execute(
            r#"
            UPDATE care_tasks SET
                care_type_id = ?2,
                subtype = ?3,
                start_date = ?4,
                end_date = ?5,
                scheduled_hour = ?6,
                recurrence_type = ?7,
                recurrence_pattern = ?8,
                professional_area = ?9,
                assigned_user_id = ?10,
                indication = ?11,
                notes = ?12,
                status = ?13,
                updated_at = ?14
            WHERE id = ?1
            "#,
            params![
                task.id,
                task.care_type_id,
                task.subtype,
                format_date(&task.start_date),
                task.end_date.as_ref().map(format_date),
                task.scheduled_hour.map(format_hour),
                task.recurrence.kind().as_str(),
                task.recurrence.pattern_json()?,
                task.professional_area.map(|a| a.as_str()),
                task.assigned_user_id,
                task.indication,
                task.notes,
                task.status.as_str(),
                format_timestamp(&task.updated_at),
            ],
        )?;

        tracing::info!(care_task_id = id, status = %task.status, "updated care task");
        Ok(task)
    }

    /// Cancel a standing order (soft delete). The row stays retrievable.
    pub fn cancel_care_task(&self, id: i64) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE care_tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id,
                CareTaskStatus::Cancelled.as_str(),
                format_timestamp(&now_utc())
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("care task {}", id)));
        }
        tracing::info!(care_task_id = id, "cancelled care task");
        Ok(())
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<CareTaskRow> {
    Ok(CareTaskRow {
        id: row.get(0)?,
        resident_id: row.get(1)?,
        care_type_id: row.get(2)?,
        subtype: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        scheduled_hour: row.get(6)?,
        recurrence_type: row.get(7)?,
        recurrence_pattern: row.get(8)?,
        professional_area: row.get(9)?,
        assigned_user_id: row.get(10)?,
        indication: row.get(11)?,
        notes: row.get(12)?,
        status: row.get(13)?,
        created_by: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Intermediate row struct for database mapping.
struct CareTaskRow {
    id: i64,
    resident_id: i64,
    care_type_id: i64,
    subtype: Option<String>,
    start_date: String,
    end_date: Option<String>,
    scheduled_hour: Option<String>,
    recurrence_type: String,
    recurrence_pattern: Option<String>,
    professional_area: Option<String>,
    assigned_user_id: Option<i64>,
    indication: Option<String>,
    notes: Option<String>,
    status: String,
    created_by: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CareTaskRow> for CareTask {
    type Error = DbError;

    fn try_from(row: CareTaskRow) -> Result<Self, Self::Error> {
        let recurrence =
            Recurrence::from_parts(row.recurrence_type.parse()?, row.recurrence_pattern.as_deref())?;

        Ok(CareTask {
            id: row.id,
            resident_id: row.resident_id,
            care_type_id: row.care_type_id,
            subtype: row.subtype,
            start_date: parse_date(&row.start_date)?,
            end_date: row.end_date.as_deref().map(parse_date).transpose()?,
            scheduled_hour: row.scheduled_hour.as_deref().and_then(parse_hour),
            recurrence,
            professional_area: row.professional_area.map(|a| a.parse()).transpose()?,
            assigned_user_id: row.assigned_user_id,
            indication: row.indication,
            notes: row.notes,
            status: row.status.parse()?,
            created_by: row.created_by,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareCategory, NewCareType, ProfessionalArea};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let care_type = db
            .insert_care_type(&NewCareType::new("CAMBIO_POSTURAL", "Repositioning", CareCategory::Activity))
            .unwrap();
        (db, care_type.id)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, care_type_id) = setup_db();
        let actor = Actor::new(1);

        let mut new = NewCareTask::new(42, care_type_id, date(2024, 1, 1));
        new.end_date = Some(date(2024, 3, 31));
        new.scheduled_hour = parse_hour("08:00");
        new.recurrence = Recurrence::Weekly {
            every: 1,
            days_of_week: vec![1, 4],
        };
        new.professional_area = Some(ProfessionalArea::Physiotherapist);
        new.indication = Some("Every Monday and Thursday".into());

        let created = db.insert_care_task(&actor, &new).unwrap();
        assert_eq!(created.status, CareTaskStatus::Active);
        assert_eq!(created.created_by, 1);

        let retrieved = db.get_care_task(created.id).unwrap().unwrap();
        assert_eq!(retrieved, created);
        assert_eq!(retrieved.end_date, Some(date(2024, 3, 31)));
        assert_eq!(retrieved.scheduled_hour.map(format_hour).as_deref(), Some("08:00"));
        assert_eq!(retrieved.recurrence, new.recurrence);
    }

    #[test]
    fn test_insert_does_not_schedule() {
        let (db, care_type_id) = setup_db();
        let mut new = NewCareTask::new(42, care_type_id, date(2024, 1, 1));
        new.recurrence = Recurrence::Daily { every: 1 };
        db.insert_care_task(&Actor::new(1), &new).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM scheduled_tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_insert_rejects_reversed_dates() {
        let (db, care_type_id) = setup_db();
        let mut new = NewCareTask::new(42, care_type_id, date(2024, 2, 1));
        new.end_date = Some(date(2024, 1, 1));

        let result = db.insert_care_task(&Actor::new(1), &new);
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[test]
    fn test_insert_unknown_care_type() {
        let (db, _) = setup_db();
        let new = NewCareTask::new(42, 999, date(2024, 1, 1));
        let result = db.insert_care_task(&Actor::new(1), &new);
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_list_newest_first_and_active_filter() {
        let (db, care_type_id) = setup_db();
        let actor = Actor::new(1);

        let first = db
            .insert_care_task(&actor, &NewCareTask::new(42, care_type_id, date(2024, 1, 1)))
            .unwrap();
        let second = db
            .insert_care_task(&actor, &NewCareTask::new(42, care_type_id, date(2024, 2, 1)))
            .unwrap();
        db.insert_care_task(&actor, &NewCareTask::new(7, care_type_id, date(2024, 2, 1)))
            .unwrap();

        let tasks = db.list_care_tasks_for_resident(42, true).unwrap();
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let patch = CareTaskPatch {
            status: Some(CareTaskStatus::Paused),
            ..Default::default()
        };
        db.update_care_task(first.id, &patch).unwrap();

        assert_eq!(db.list_care_tasks_for_resident(42, true).unwrap().len(), 1);
        assert_eq!(db.list_care_tasks_for_resident(42, false).unwrap().len(), 2);
    }

    #[test]
    fn test_cancel_is_soft_delete() {
        let (db, care_type_id) = setup_db();
        let created = db
            .insert_care_task(&Actor::new(1), &NewCareTask::new(42, care_type_id, date(2024, 1, 1)))
            .unwrap();

        db.cancel_care_task(created.id).unwrap();

        let retrieved = db.get_care_task(created.id).unwrap().unwrap();
        assert_eq!(retrieved.status, CareTaskStatus::Cancelled);
        assert!(db.list_care_tasks_for_resident(42, true).unwrap().is_empty());
        assert_eq!(db.list_care_tasks_for_resident(42, false).unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_missing() {
        let (db, _) = setup_db();
        assert!(matches!(db.cancel_care_task(404), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_update_revalidates_dates() {
        let (db, care_type_id) = setup_db();
        let created = db
            .insert_care_task(&Actor::new(1), &NewCareTask::new(42, care_type_id, date(2024, 3, 1)))
            .unwrap();

        let patch = CareTaskPatch {
            end_date: Some(Some(date(2024, 2, 1))),
            ..Default::default()
        };
        assert!(matches!(
            db.update_care_task(created.id, &patch),
            Err(DbError::Validation(_))
        ));

        let patch = CareTaskPatch {
            care_type_id: Some(999),
            ..Default::default()
        };
        assert!(matches!(
            db.update_care_task(created.id, &patch),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_partial() {
        let (db, care_type_id) = setup_db();
        let mut new = NewCareTask::new(42, care_type_id, date(2024, 1, 1));
        new.notes = Some("original".into());
        let created = db.insert_care_task(&Actor::new(1), &new).unwrap();

        let patch = CareTaskPatch {
            scheduled_hour: parse_hour("21:00"),
            recurrence: Some(Recurrence::Daily { every: 2 }),
            ..Default::default()
        };
        let updated = db.update_care_task(created.id, &patch).unwrap();

        let retrieved = db.get_care_task(created.id).unwrap().unwrap();
        assert_eq!(retrieved, updated);
        assert_eq!(retrieved.notes.as_deref(), Some("original"));
        assert_eq!(retrieved.recurrence, Recurrence::Daily { every: 2 });
        assert_eq!(retrieved.scheduled_hour.map(format_hour).as_deref(), Some("21:00"));
    }
}
