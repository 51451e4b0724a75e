//! Care type registry database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    format_timestamp, is_unique_violation, now_utc, parse_timestamp, require_text, Database,
    DbError, DbResult,
};
use crate::models::{CareType, CareTypePatch, NewCareType};

const CARE_TYPE_COLUMNS: &str = "id, code, name, category, professional_area, requires_result, \
     result_type, result_unit, is_active, sort_order, created_at";

impl Database {
    /// Insert a new care type and return it.
    ///
    /// Codes are unique across active and inactive rows.
    pub fn insert_care_type(&self, new: &NewCareType) -> DbResult<CareType> {
        require_text("code", &new.code)?;
        require_text("name", &new.name)?;
        if self.get_care_type_by_code(&new.code)?.is_some() {
            return Err(DbError::DuplicateCode(new.code.clone()));
        }

        self.conn
            .execute(
                r#"
                INSERT INTO care_types (
                    code, name, category, professional_area, requires_result,
                    result_type, result_unit, is_active, sort_order, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
                "#,
                params![
                    new.code,
                    new.name,
                    new.category.as_str(),
                    new.professional_area.as_str(),
                    new.requires_result,
                    new.result_type.map(|t| t.as_str()),
                    new.result_unit,
                    new.sort_order,
                    format_timestamp(&now_utc()),
                ],
            )
            .map_err(|e| duplicate_or(e, &new.code))?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(care_type_id = id, code = %new.code, "created care type");
        self.require_care_type(id)
    }

    /// Get a care type by ID.
    pub fn get_care_type(&self, id: i64) -> DbResult<Option<CareType>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM care_types WHERE id = ?", CARE_TYPE_COLUMNS),
                [id],
                read_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a care type by its unique code.
    pub fn get_care_type_by_code(&self, code: &str) -> DbResult<Option<CareType>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM care_types WHERE code = ?", CARE_TYPE_COLUMNS),
                [code],
                read_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get a care type, failing with `NotFound` when absent.
    pub(crate) fn require_care_type(&self, id: i64) -> DbResult<CareType> {
        self.get_care_type(id)?
            .ok_or_else(|| DbError::NotFound(format!("care type {}", id)))
    }

    /// List care types ordered by sort order, then name.
    pub fn list_care_types(&self, active_only: bool) -> DbResult<Vec<CareType>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM care_types {} ORDER BY sort_order, name",
            CARE_TYPE_COLUMNS, filter
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_row)?;

        let mut care_types = Vec::new();
        for row in rows {
            care_types.push(row?.try_into()?);
        }
        Ok(care_types)
    }

    /// Apply a partial update. Unset patch fields are left untouched.
    pub fn update_care_type(&self, id: i64, patch: &CareTypePatch) -> DbResult<CareType> {
        let mut care_type = self.require_care_type(id)?;

        if let Some(code) = &patch.code {
            require_text("code", code)?;
            if let Some(other) = self.get_care_type_by_code(code)? {
                if other.id != id {
                    return Err(DbError::DuplicateCode(code.clone()));
                }
            }
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }

        patch.apply_to(&mut care_type);

        self.conn
            .execute(
                r#"
                UPDATE care_types SET
                    code = ?2,
                    name = ?3,
                    category = ?4,
                    professional_area = ?5,
                    requires_result = ?6,
                    result_type = ?7,
                    result_unit = ?8,
                    is_active = ?9,
                    sort_order = ?10
                WHERE id = ?1
                "#,
                params![
                    care_type.id,
                    care_type.code,
                    care_type.name,
                    care_type.category.as_str(),
                    care_type.professional_area.as_str(),
                    care_type.requires_result,
                    care_type.result_type.map(|t| t.as_str()),
                    care_type.result_unit,
                    care_type.is_active,
                    care_type.sort_order,
                ],
            )
            .map_err(|e| duplicate_or(e, &care_type.code))?;

        tracing::info!(care_type_id = id, "updated care type");
        Ok(care_type)
    }

    /// Mark a care type inactive (soft delete).
    ///
    /// Care tasks and scheduled tasks keep referencing it by id.
    pub fn deactivate_care_type(&self, id: i64) -> DbResult<()> {
        let rows_affected = self
            .conn
            .execute("UPDATE care_types SET is_active = 0 WHERE id = ?", [id])?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("care type {}", id)));
        }
        tracing::info!(care_type_id = id, "deactivated care type");
        Ok(())
    }
}

fn duplicate_or(err: rusqlite::Error, code: &str) -> DbError {
    if is_unique_violation(&err) {
        DbError::DuplicateCode(code.to_string())
    } else {
        DbError::Sqlite(err)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<CareTypeRow> {
    Ok(CareTypeRow {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        professional_area: row.get(4)?,
        requires_result: row.get(5)?,
        result_type: row.get(6)?,
        result_unit: row.get(7)?,
        is_active: row.get(8)?,
        sort_order: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Intermediate row struct for database mapping.
struct CareTypeRow {
    id: i64,
    code: String,
    name: String,
    category: String,
    professional_area: String,
    requires_result: bool,
    result_type: Option<String>,
    result_unit: Option<String>,
    is_active: bool,
    sort_order: i64,
    created_at: String,
}

impl TryFrom<CareTypeRow> for CareType {
    type Error = DbError;

    fn try_from(row: CareTypeRow) -> Result<Self, Self::Error> {
        Ok(CareType {
            id: row.id,
            code: row.code,
            name: row.name,
            category: row.category.parse()?,
            professional_area: row.professional_area.parse()?,
            requires_result: row.requires_result,
            result_type: row.result_type.map(|t| t.parse()).transpose()?,
            result_unit: row.result_unit,
            is_active: row.is_active,
            sort_order: row.sort_order,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
