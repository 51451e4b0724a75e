//! Care group and membership database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    format_timestamp, now_utc, parse_timestamp, require_text, Database, DbError, DbResult,
};
use crate::models::{
    format_hour, parse_hour, Actor, CareGroup, CareGroupPatch, GroupMember, NewCareGroup,
    Recurrence,
};

const CARE_GROUP_COLUMNS: &str = "id, name, group_type, care_type_id, code, unified_code, \
     professional_area, scheduled_hour, recurrence_type, recurrence_pattern, assigned_user_id, \
     duration_hours, indication, is_active, created_by, created_at, updated_at";

const MEMBER_COLUMNS: &str = "id, care_group_id, resident_id, added_by, added_at";

impl Database {
    /// Insert a new group.
    pub fn insert_care_group(&self, actor: &Actor, new: &NewCareGroup) -> DbResult<CareGroup> {
        require_text("name", &new.name)?;
        new.recurrence.validate().map_err(DbError::Validation)?;
        if let Some(care_type_id) = new.care_type_id {
            self.require_care_type(care_type_id)?;
        }

        let now = format_timestamp(&now_utc());
        self.conn.execute(
            r#"
            INSERT INTO care_groups (
                name, group_type, care_type_id, code, unified_code, professional_area,
                scheduled_hour, recurrence_type, recurrence_pattern, assigned_user_id,
                duration_hours, indication, is_active, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?14, ?14)
            "#,
            params![
                new.name,
                new.group_type.as_str(),
                new.care_type_id,
                new.code,
                new.unified_code,
                new.professional_area.map(|a| a.as_str()),
                new.scheduled_hour.map(format_hour),
                new.recurrence.kind().as_str(),
                new.recurrence.pattern_json()?,
                new.assigned_user_id,
                new.duration_hours,
                new.indication,
                actor.user_id,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(care_group_id = id, name = %new.name, "created care group");
        self.require_care_group(id)
    }

    /// Get a group by ID, active or not.
    pub fn get_care_group(&self, id: i64) -> DbResult<Option<CareGroup>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM care_groups WHERE id = ?", CARE_GROUP_COLUMNS),
                [id],
                read_group_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub(crate) fn require_care_group(&self, id: i64) -> DbResult<CareGroup> {
        self.get_care_group(id)?
            .ok_or_else(|| DbError::NotFound(format!("care group {}", id)))
    }

    /// List groups ordered by name.
    pub fn list_care_groups(&self, active_only: bool) -> DbResult<Vec<CareGroup>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM care_groups {} ORDER BY name, id",
            CARE_GROUP_COLUMNS, filter
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_group_row)?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?.try_into()?);
        }
        Ok(groups)
    }

    /// Apply a partial update to a group.
    pub fn update_care_group(&self, id: i64, patch: &CareGroupPatch) -> DbResult<CareGroup> {
        let mut group = self.require_care_group(id)?;
        if let Some(care_type_id) = patch.care_type_id {
            self.require_care_type(care_type_id)?;
        }

        patch.apply_to(&mut group);
        require_text("name", &group.name)?;
        group.recurrence.validate().map_err(DbError::Validation)?;
        group.updated_at = now_utc();

        self.conn.execute(
            r#"
            UPDATE care_groups SET
                name = ?2,
                group_type = ?3,
                care_type_id = ?4,
                code = ?5,
                unified_code = ?6,
                professional_area = ?7,
                scheduled_hour = ?8,
                recurrence_type = ?9,
                recurrence_pattern = ?10,
                assigned_user_id = ?11,
                duration_hours = ?12,
                indication = ?13,
                is_active = ?14,
                updated_at = ?15
            WHERE id = ?1
            "#,
            params![
                group.id,
                group.name,
                group.group_type.as_str(),
                group.care_type_id,
                group.code,
                group.unified_code,
                group.professional_area.map(|a| a.as_str()),
                group.scheduled_hour.map(format_hour),
                group.recurrence.kind().as_str(),
                group.recurrence.pattern_json()?,
                group.assigned_user_id,
                group.duration_hours,
                group.indication,
                group.is_active,
                format_timestamp(&group.updated_at),
            ],
        )?;

        tracing::info!(care_group_id = id, is_active = group.is_active, "updated care group");
        Ok(group)
    }

    /// Deactivate a group (soft delete). Memberships are kept.
    pub fn deactivate_care_group(&self, id: i64) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE care_groups SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            params![id, format_timestamp(&now_utc())],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("care group {}", id)));
        }
        tracing::info!(care_group_id = id, "deactivated care group");
        Ok(())
    }

    /// Add a resident to a group.
    ///
    /// Returns `false` when the resident was already a member; no second row
    /// is written in that case.
    pub fn add_resident_to_group(
        &self,
        actor: &Actor,
        group_id: i64,
        resident_id: i64,
    ) -> DbResult<bool> {
        self.require_care_group(group_id)?;

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM care_group_members WHERE care_group_id = ? AND resident_id = ?",
                [group_id, resident_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            tracing::debug!(care_group_id = group_id, resident_id, "resident already in group");
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO care_group_members (care_group_id, resident_id, added_by, added_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![group_id, resident_id, actor.user_id, format_timestamp(&now_utc())],
        )?;

        tracing::info!(care_group_id = group_id, resident_id, "added resident to group");
        Ok(true)
    }

    /// Remove a resident from a group. Removing a non-member is a no-op.
    ///
    /// Returns whether a membership row was deleted.
    pub fn remove_resident_from_group(&self, group_id: i64, resident_id: i64) -> DbResult<bool> {
        self.require_care_group(group_id)?;
        let rows_affected = self.conn.execute(
            "DELETE FROM care_group_members WHERE care_group_id = ?1 AND resident_id = ?2",
            params![group_id, resident_id],
        )?;
        if rows_affected > 0 {
            tracing::info!(care_group_id = group_id, resident_id, "removed resident from group");
        }
        Ok(rows_affected > 0)
    }

    /// Members of a group in the order they were added.
    pub fn list_group_members(&self, group_id: i64) -> DbResult<Vec<GroupMember>> {
        self.require_care_group(group_id)?;
        let sql = format!(
            "SELECT {} FROM care_group_members WHERE care_group_id = ? ORDER BY added_at, id",
            MEMBER_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([group_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut members = Vec::new();
        for row in rows {
            let (id, care_group_id, resident_id, added_by, added_at) = row?;
            members.push(GroupMember {
                id,
                care_group_id,
                resident_id,
                added_by,
                added_at: parse_timestamp(&added_at)?,
            });
        }
        Ok(members)
    }
}

fn read_group_row(row: &Row<'_>) -> rusqlite::Result<CareGroupRow> {
    Ok(CareGroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        group_type: row.get(2)?,
        care_type_id: row.get(3)?,
        code: row.get(4)?,
        unified_code: row.get(5)?,
        professional_area: row.get(6)?,
        scheduled_hour: row.get(7)?,
        recurrence_type: row.get(8)?,
        recurrence_pattern: row.get(9)?,
        assigned_user_id: row.get(10)?,
        duration_hours: row.get(11)?,
        indication: row.get(12)?,
        is_active: row.get(13)?,
        created_by: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Intermediate row struct for database mapping.
struct CareGroupRow {
    id: i64,
    name: String,
    group_type: String,
    care_type_id: Option<i64>,
    code: Option<String>,
    unified_code: Option<String>,
    professional_area: Option<String>,
    scheduled_hour: Option<String>,
    recurrence_type: String,
    recurrence_pattern: Option<String>,
    assigned_user_id: Option<i64>,
    duration_hours: Option<f64>,
    indication: Option<String>,
    is_active: bool,
    created_by: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<CareGroupRow> for CareGroup {
    type Error = DbError;

    fn try_from(row: CareGroupRow) -> Result<Self, Self::Error> {
        let recurrence =
            Recurrence::from_parts(row.recurrence_type.parse()?, row.recurrence_pattern.as_deref())?;

        Ok(CareGroup {
            id: row.id,
            name: row.name,
            group_type: row.group_type.parse()?,
            care_type_id: row.care_type_id,
            code: row.code,
            unified_code: row.unified_code,
            professional_area: row.professional_area.map(|a| a.parse()).transpose()?,
            scheduled_hour: row.scheduled_hour.as_deref().and_then(parse_hour),
            recurrence,
            assigned_user_id: row.assigned_user_id,
            duration_hours: row.duration_hours,
            indication: row.indication,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}
