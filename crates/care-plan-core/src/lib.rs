//! Care Plan Core Library
//!
//! Local-first care planning for residential elder-care facilities: what care
//! each resident receives, how often, by which discipline, and what happened
//! when it was carried out.
//!
//! # Architecture
//!
//! ```text
//!                          Care Type registry
//!                                  │
//!                 ┌────────────────┴────────────────┐
//!                 ▼                                 ▼
//!      Care Task (per resident)          Care Group + members
//!                 │                                 │
//!                 └────────────────┬────────────────┘
//!                                  ▼
//!                    Scheduled Task (dated occurrence)
//!                                  │
//!                        pending ──► executed / not done /
//!                                    absent / cancelled
//!                                  │
//!                                  ▼
//!                        Daily task sheet export
//! ```
//!
//! Occurrences are created explicitly. Recurrence on care tasks and groups is
//! descriptive and never expanded into scheduled tasks here.
//!
//! # Modules
//!
//! - [`db`]: SQLite storage layer
//! - [`models`]: Domain types (CareType, CareTask, CareGroup, ScheduledTask, etc.)
//! - [`export`]: Daily task sheet export

pub mod db;
pub mod export;
pub mod models;

// Re-export commonly used types
pub use db::{Database, DbError, DbResult};
pub use export::TaskSheet;
pub use models::{
    Actor, CareGroup, CareTask, CareType, ExecutionResult, GroupMember, Recurrence,
    ScheduledTask, ScheduledTaskFilter, TaskStatus, VitalKind,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use db::{format_date, format_timestamp};
use models::{
    day_bounds, format_hour, parse_hour, CareGroupPatch, CareTaskPatch, CareTypePatch,
    NewCareGroup, NewCareTask, NewCareType, NewScheduledTask, RecurrenceKind, UnknownVariant,
};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CarePlanError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
}

impl From<DbError> for CarePlanError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => CarePlanError::NotFound(what),
            DbError::DuplicateCode(code) => CarePlanError::DuplicateCode(code),
            DbError::Validation(msg) => CarePlanError::ValidationError(msg),
            DbError::Sqlite(e) => CarePlanError::StorageUnavailable(e.to_string()),
            DbError::Json(e) => CarePlanError::Serialization(e.to_string()),
            e @ (DbError::Timestamp(_) | DbError::Constraint(_)) => {
                CarePlanError::Serialization(e.to_string())
            }
        }
    }
}

impl From<UnknownVariant> for CarePlanError {
    fn from(e: UnknownVariant) -> Self {
        CarePlanError::ValidationError(e.to_string())
    }
}

impl From<serde_json::Error> for CarePlanError {
    fn from(e: serde_json::Error) -> Self {
        CarePlanError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CarePlanError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CarePlanError::StorageUnavailable(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<CarePlanCore>, CarePlanError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(CarePlanCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<CarePlanCore>, CarePlanError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(CarePlanCore {
        db: Arc::new(Mutex::new(db)),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
///
/// Every call takes the caller's context and is rejected before touching
/// storage when the caller is not authenticated.
#[derive(uniffi::Object)]
pub struct CarePlanCore {
    db: Arc<Mutex<Database>>,
}

#[uniffi::export]
impl CarePlanCore {
    // =========================================================================
    // Care Type Operations
    // =========================================================================

    /// List care types ordered for display.
    pub fn list_care_types(
        &self,
        ctx: FfiCallContext,
        active_only: bool,
    ) -> Result<Vec<FfiCareType>, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        let care_types = db.list_care_types(active_only)?;
        Ok(care_types.into_iter().map(|t| t.into()).collect())
    }

    /// Get a care type by ID.
    pub fn get_care_type(&self, ctx: FfiCallContext, id: i64) -> Result<FfiCareType, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        Ok(db.require_care_type(id)?.into())
    }

    /// Get a care type by code.
    pub fn get_care_type_by_code(
        &self,
        ctx: FfiCallContext,
        code: String,
    ) -> Result<Option<FfiCareType>, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        let care_type = db.get_care_type_by_code(&code)?;
        Ok(care_type.map(|t| t.into()))
    }

    /// Create a care type.
    pub fn create_care_type(
        &self,
        ctx: FfiCallContext,
        care_type: FfiNewCareType,
    ) -> Result<FfiCareType, CarePlanError> {
        authenticate(&ctx)?;
        let new = NewCareType::try_from(care_type)?;
        let db = self.db.lock()?;
        Ok(db.insert_care_type(&new)?.into())
    }

    /// Update a care type. Unset fields are left untouched.
    pub fn update_care_type(
        &self,
        ctx: FfiCallContext,
        id: i64,
        patch: FfiCareTypePatch,
    ) -> Result<FfiCareType, CarePlanError> {
        authenticate(&ctx)?;
        let patch = CareTypePatch::try_from(patch)?;
        let db = self.db.lock()?;
        Ok(db.update_care_type(id, &patch)?.into())
    }

    /// Deactivate a care type.
    pub fn deactivate_care_type(&self, ctx: FfiCallContext, id: i64) -> Result<bool, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.deactivate_care_type(id)?;
        Ok(true)
    }

    /// Seed the default care type catalogue. Returns the number inserted.
    pub fn initialize_default_care_types(&self, ctx: FfiCallContext) -> Result<u32, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        let inserted = db.initialize_default_care_types()?;
        Ok(inserted as u32)
    }

    // =========================================================================
    // Care Task Operations
    // =========================================================================

    /// List a resident's standing orders, newest first.
    pub fn list_care_tasks_for_resident(
        &self,
        ctx: FfiCallContext,
        resident_id: i64,
        active_only: bool,
    ) -> Result<Vec<FfiCareTask>, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        let tasks = db.list_care_tasks_for_resident(resident_id, active_only)?;
        tasks.into_iter().map(FfiCareTask::try_from).collect()
    }

    /// Get a standing order by ID.
    pub fn get_care_task(&self, ctx: FfiCallContext, id: i64) -> Result<FfiCareTask, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.require_care_task(id)?.try_into()
    }

    /// Create a standing order. No scheduled tasks are created.
    pub fn create_care_task(
        &self,
        ctx: FfiCallContext,
        task: FfiNewCareTask,
    ) -> Result<FfiCareTask, CarePlanError> {
        let actor = authenticate(&ctx)?;
        let new = NewCareTask::try_from(task)?;
        let db = self.db.lock()?;
        db.insert_care_task(&actor, &new)?.try_into()
    }

    /// Update a standing order.
    pub fn update_care_task(
        &self,
        ctx: FfiCallContext,
        id: i64,
        patch: FfiCareTaskPatch,
    ) -> Result<FfiCareTask, CarePlanError> {
        authenticate(&ctx)?;
        let patch = CareTaskPatch::try_from(patch)?;
        let db = self.db.lock()?;
        db.update_care_task(id, &patch)?.try_into()
    }

    /// Cancel a standing order.
    pub fn cancel_care_task(&self, ctx: FfiCallContext, id: i64) -> Result<bool, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.cancel_care_task(id)?;
        Ok(true)
    }

    // =========================================================================
    // Care Group Operations
    // =========================================================================

    /// List groups ordered by name.
    pub fn list_care_groups(
        &self,
        ctx: FfiCallContext,
        active_only: bool,
    ) -> Result<Vec<FfiCareGroup>, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        let groups = db.list_care_groups(active_only)?;
        groups.into_iter().map(FfiCareGroup::try_from).collect()
    }

    /// Get a group by ID.
    pub fn get_care_group(&self, ctx: FfiCallContext, id: i64) -> Result<FfiCareGroup, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.require_care_group(id)?.try_into()
    }

    /// Create a group.
    pub fn create_care_group(
        &self,
        ctx: FfiCallContext,
        group: FfiNewCareGroup,
    ) -> Result<FfiCareGroup, CarePlanError> {
        let actor = authenticate(&ctx)?;
        let new = NewCareGroup::try_from(group)?;
        let db = self.db.lock()?;
        db.insert_care_group(&actor, &new)?.try_into()
    }

    /// Update a group.
    pub fn update_care_group(
        &self,
        ctx: FfiCallContext,
        id: i64,
        patch: FfiCareGroupPatch,
    ) -> Result<FfiCareGroup, CarePlanError> {
        authenticate(&ctx)?;
        let patch = CareGroupPatch::try_from(patch)?;
        let db = self.db.lock()?;
        db.update_care_group(id, &patch)?.try_into()
    }

    /// Deactivate a group.
    pub fn deactivate_care_group(&self, ctx: FfiCallContext, id: i64) -> Result<bool, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.deactivate_care_group(id)?;
        Ok(true)
    }

    /// Add a resident to a group. Adding an existing member succeeds without
    /// creating a second membership.
    pub fn add_resident_to_group(
        &self,
        ctx: FfiCallContext,
        group_id: i64,
        resident_id: i64,
    ) -> Result<bool, CarePlanError> {
        let actor = authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.add_resident_to_group(&actor, group_id, resident_id)?;
        Ok(true)
    }

    /// Remove a resident from a group. Removing a non-member succeeds.
    pub fn remove_resident_from_group(
        &self,
        ctx: FfiCallContext,
        group_id: i64,
        resident_id: i64,
    ) -> Result<bool, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        db.remove_resident_from_group(group_id, resident_id)?;
        Ok(true)
    }

    /// Members of a group in the order they joined.
    pub fn list_group_members(
        &self,
        ctx: FfiCallContext,
        group_id: i64,
    ) -> Result<Vec<FfiGroupMember>, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        let members = db.list_group_members(group_id)?;
        Ok(members.into_iter().map(|m| m.into()).collect())
    }

    // =========================================================================
    // Scheduled Task Operations
    // =========================================================================

    /// Query scheduled tasks, ordered by scheduled time.
    pub fn list_scheduled_tasks(
        &self,
        ctx: FfiCallContext,
        filter: FfiScheduledTaskFilter,
    ) -> Result<Vec<FfiScheduledTask>, CarePlanError> {
        authenticate(&ctx)?;
        let filter = ScheduledTaskFilter::try_from(filter)?;
        let db = self.db.lock()?;
        let tasks = db.list_scheduled_tasks(&filter)?;
        Ok(tasks.into_iter().map(|t| t.into()).collect())
    }

    /// Get a scheduled task by ID.
    pub fn get_scheduled_task(
        &self,
        ctx: FfiCallContext,
        id: i64,
    ) -> Result<FfiScheduledTask, CarePlanError> {
        authenticate(&ctx)?;
        let db = self.db.lock()?;
        Ok(db.require_scheduled_task(id)?.into())
    }

    /// Create a pending scheduled task.
    pub fn create_scheduled_task(
        &self,
        ctx: FfiCallContext,
        task: FfiNewScheduledTask,
    ) -> Result<FfiScheduledTask, CarePlanError> {
        authenticate(&ctx)?;
        let new = NewScheduledTask::try_from(task)?;
        let db = self.db.lock()?;
        Ok(db.insert_scheduled_task(&new)?.into())
    }

    /// Mark a scheduled task completed, recording who did it and any result.
    pub fn execute_scheduled_task(
        &self,
        ctx: FfiCallContext,
        id: i64,
        result_value: Option<String>,
        result_numeric: Option<f64>,
        notes: Option<String>,
    ) -> Result<bool, CarePlanError> {
        let actor = authenticate(&ctx)?;
        let result = ExecutionResult {
            result_value,
            result_numeric,
            notes,
        };
        let db = self.db.lock()?;
        db.execute_scheduled_task(&actor, id, &result)?;
        Ok(true)
    }

    /// Set the status of a scheduled task without touching its execution record.
    pub fn update_scheduled_task_status(
        &self,
        ctx: FfiCallContext,
        id: i64,
        status: String,
    ) -> Result<bool, CarePlanError> {
        authenticate(&ctx)?;
        let status: TaskStatus = parse_wire(&status)?;
        let db = self.db.lock()?;
        db.update_scheduled_task_status(id, status)?;
        Ok(true)
    }

    /// Number of tasks scheduled on a day (`YYYY-MM-DD`).
    pub fn count_scheduled_tasks_on(&self, ctx: FfiCallContext, day: String) -> Result<i64, CarePlanError> {
        authenticate(&ctx)?;
        let day = parse_day("day", &day)?;
        let db = self.db.lock()?;
        Ok(db.count_scheduled_tasks_on(day)?)
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export a day's task sheet as JSON.
    pub fn export_task_sheet_json(
        &self,
        ctx: FfiCallContext,
        day: String,
        resident_id: Option<i64>,
    ) -> Result<String, CarePlanError> {
        authenticate(&ctx)?;
        let day = parse_day("day", &day)?;
        let db = self.db.lock()?;
        let sheet = TaskSheet::for_day(&db, day, resident_id)?;
        Ok(sheet.to_json()?)
    }

    /// Export a day's task sheet as CSV.
    pub fn export_task_sheet_csv(
        &self,
        ctx: FfiCallContext,
        day: String,
        resident_id: Option<i64>,
    ) -> Result<String, CarePlanError> {
        authenticate(&ctx)?;
        let day = parse_day("day", &day)?;
        let db = self.db.lock()?;
        let sheet = TaskSheet::for_day(&db, day, resident_id)?;
        Ok(sheet.to_csv())
    }
}

// =========================================================================
// Boundary Parsing
// =========================================================================

fn authenticate(ctx: &FfiCallContext) -> Result<Actor, CarePlanError> {
    let actor = Actor::new(ctx.user_id);
    if !actor.is_authenticated() {
        tracing::warn!(user_id = ctx.user_id, "rejected unauthenticated call");
        return Err(CarePlanError::Unauthenticated(format!(
            "no authenticated user (user id {})",
            ctx.user_id
        )));
    }
    Ok(actor)
}

fn parse_wire<T>(raw: &str) -> Result<T, CarePlanError>
where
    T: FromStr<Err = UnknownVariant>,
{
    Ok(raw.trim().parse()?)
}

fn parse_wire_opt<T>(raw: Option<String>) -> Result<Option<T>, CarePlanError>
where
    T: FromStr<Err = UnknownVariant>,
{
    raw.as_deref().map(parse_wire).transpose()
}

fn parse_day(field: &str, raw: &str) -> Result<NaiveDate, CarePlanError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        CarePlanError::ValidationError(format!("{} is not a YYYY-MM-DD date: {}", field, raw))
    })
}

fn parse_day_opt(field: &str, raw: Option<String>) -> Result<Option<NaiveDate>, CarePlanError> {
    raw.map(|r| parse_day(field, &r)).transpose()
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// A full RFC 3339 timestamp, or a bare date meaning that day's midnight UTC.
fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, CarePlanError> {
    match parse_rfc3339(raw) {
        Some(ts) => Ok(ts),
        None => parse_day(field, raw).map(|day| day_bounds(day).0),
    }
}

/// Exclusive upper bound: a bare date means the midnight after that day, so
/// `date_to = "2024-01-10"` includes everything on the 10th.
fn parse_upper_bound(field: &str, raw: &str) -> Result<DateTime<Utc>, CarePlanError> {
    match parse_rfc3339(raw) {
        Some(ts) => Ok(ts),
        None => parse_day(field, raw).map(|day| day_bounds(day).1),
    }
}

fn parse_hour_opt(raw: Option<String>) -> Result<Option<NaiveTime>, CarePlanError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_hour(&raw).map(Some).ok_or_else(|| {
            CarePlanError::ValidationError(format!("scheduled hour is not HH:MM: {}", raw))
        }),
    }
}

fn parse_recurrence(kind: &str, pattern: Option<&str>) -> Result<Recurrence, CarePlanError> {
    let kind: RecurrenceKind = parse_wire(kind)?;
    Recurrence::from_parts(kind, pattern).map_err(|e| {
        CarePlanError::ValidationError(format!("invalid recurrence pattern: {}", e))
    })
}

fn recurrence_pattern(recurrence: &Recurrence) -> Result<Option<String>, CarePlanError> {
    Ok(recurrence.pattern_json()?)
}

// =========================================================================
// FFI Types
// =========================================================================

/// Identity of the caller, supplied with every operation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCallContext {
    pub user_id: i64,
}

/// FFI-safe care type.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCareType {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub category: String,
    pub professional_area: String,
    pub requires_result: bool,
    pub result_type: Option<String>,
    pub result_unit: Option<String>,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: String,
}

impl From<CareType> for FfiCareType {
    fn from(care_type: CareType) -> Self {
        Self {
            id: care_type.id,
            code: care_type.code,
            name: care_type.name,
            category: care_type.category.to_string(),
            professional_area: care_type.professional_area.to_string(),
            requires_result: care_type.requires_result,
            result_type: care_type.result_type.map(|t| t.to_string()),
            result_unit: care_type.result_unit,
            is_active: care_type.is_active,
            sort_order: care_type.sort_order,
            created_at: format_timestamp(&care_type.created_at),
        }
    }
}

/// Fields for creating a care type.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewCareType {
    pub code: String,
    pub name: String,
    pub category: String,
    /// Defaults to nursing
    pub professional_area: Option<String>,
    pub requires_result: bool,
    pub result_type: Option<String>,
    pub result_unit: Option<String>,
    pub sort_order: Option<i64>,
}

impl TryFrom<FfiNewCareType> for NewCareType {
    type Error = CarePlanError;

    fn try_from(ffi: FfiNewCareType) -> Result<Self, Self::Error> {
        let mut new = NewCareType::new(ffi.code, ffi.name, parse_wire(&ffi.category)?);
        if let Some(area) = parse_wire_opt(ffi.professional_area)? {
            new.professional_area = area;
        }
        new.requires_result = ffi.requires_result;
        new.result_type = parse_wire_opt(ffi.result_type)?;
        new.result_unit = ffi.result_unit;
        new.sort_order = ffi.sort_order.unwrap_or_default();
        Ok(new)
    }
}

/// Partial update of a care type.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCareTypePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub professional_area: Option<String>,
    pub requires_result: Option<bool>,
    pub result_type: Option<String>,
    pub result_unit: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

impl TryFrom<FfiCareTypePatch> for CareTypePatch {
    type Error = CarePlanError;

    fn try_from(ffi: FfiCareTypePatch) -> Result<Self, Self::Error> {
        Ok(CareTypePatch {
            code: ffi.code,
            name: ffi.name,
            category: parse_wire_opt(ffi.category)?,
            professional_area: parse_wire_opt(ffi.professional_area)?,
            requires_result: ffi.requires_result,
            result_type: parse_wire_opt(ffi.result_type)?,
            result_unit: ffi.result_unit,
            is_active: ffi.is_active,
            sort_order: ffi.sort_order,
        })
    }
}

/// FFI-safe standing order. Recurrence crosses as its kind plus JSON pattern.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCareTask {
    pub id: i64,
    pub resident_id: i64,
    pub care_type_id: i64,
    pub subtype: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub scheduled_hour: Option<String>,
    pub recurrence_type: String,
    pub recurrence_pattern: Option<String>,
    pub professional_area: Option<String>,
    pub assigned_user_id: Option<i64>,
    pub indication: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<CareTask> for FfiCareTask {
    type Error = CarePlanError;

    fn try_from(task: CareTask) -> Result<Self, Self::Error> {
        Ok(Self {
            id: task.id,
            resident_id: task.resident_id,
            care_type_id: task.care_type_id,
            subtype: task.subtype,
            start_date: format_date(&task.start_date),
            end_date: task.end_date.as_ref().map(format_date),
            scheduled_hour: task.scheduled_hour.map(format_hour),
            recurrence_type: task.recurrence.kind().to_string(),
            recurrence_pattern: recurrence_pattern(&task.recurrence)?,
            professional_area: task.professional_area.map(|a| a.to_string()),
            assigned_user_id: task.assigned_user_id,
            indication: task.indication,
            notes: task.notes,
            status: task.status.to_string(),
            created_by: task.created_by,
            created_at: format_timestamp(&task.created_at),
            updated_at: format_timestamp(&task.updated_at),
        })
    }
}

/// Fields for creating a standing order.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewCareTask {
    pub resident_id: i64,
    pub care_type_id: i64,
    pub subtype: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: String,
    pub end_date: Option<String>,
    /// `HH:MM`
    pub scheduled_hour: Option<String>,
    /// Defaults to `none`
    pub recurrence_type: Option<String>,
    pub recurrence_pattern: Option<String>,
    pub professional_area: Option<String>,
    pub assigned_user_id: Option<i64>,
    pub indication: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiNewCareTask> for NewCareTask {
    type Error = CarePlanError;

    fn try_from(ffi: FfiNewCareTask) -> Result<Self, Self::Error> {
        let start_date = parse_day("start date", &ffi.start_date)?;
        let mut new = NewCareTask::new(ffi.resident_id, ffi.care_type_id, start_date);
        new.subtype = ffi.subtype;
        new.end_date = parse_day_opt("end date", ffi.end_date)?;
        new.scheduled_hour = parse_hour_opt(ffi.scheduled_hour)?;
        if let Some(kind) = &ffi.recurrence_type {
            new.recurrence = parse_recurrence(kind, ffi.recurrence_pattern.as_deref())?;
        }
        new.professional_area = parse_wire_opt(ffi.professional_area)?;
        new.assigned_user_id = ffi.assigned_user_id;
        new.indication = ffi.indication;
        new.notes = ffi.notes;
        Ok(new)
    }
}

/// Partial update of a standing order.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCareTaskPatch {
    pub care_type_id: Option<i64>,
    pub subtype: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Remove the end date; wins over `end_date`
    pub clear_end_date: bool,
    pub scheduled_hour: Option<String>,
    /// Replaces the recurrence when set, together with `recurrence_pattern`
    pub recurrence_type: Option<String>,
    pub recurrence_pattern: Option<String>,
    pub professional_area: Option<String>,
    pub assigned_user_id: Option<i64>,
    pub indication: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

impl TryFrom<FfiCareTaskPatch> for CareTaskPatch {
    type Error = CarePlanError;

    fn try_from(ffi: FfiCareTaskPatch) -> Result<Self, Self::Error> {
        let end_date = if ffi.clear_end_date {
            Some(None)
        } else {
            parse_day_opt("end date", ffi.end_date)?.map(Some)
        };
        let recurrence = match &ffi.recurrence_type {
            Some(kind) => Some(parse_recurrence(kind, ffi.recurrence_pattern.as_deref())?),
            None => None,
        };

        Ok(CareTaskPatch {
            care_type_id: ffi.care_type_id,
            subtype: ffi.subtype,
            start_date: parse_day_opt("start date", ffi.start_date)?,
            end_date,
            scheduled_hour: parse_hour_opt(ffi.scheduled_hour)?,
            recurrence,
            professional_area: parse_wire_opt(ffi.professional_area)?,
            assigned_user_id: ffi.assigned_user_id,
            indication: ffi.indication,
            notes: ffi.notes,
            status: parse_wire_opt(ffi.status)?,
        })
    }
}

/// FFI-safe care group.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCareGroup {
    pub id: i64,
    pub name: String,
    pub group_type: String,
    pub care_type_id: Option<i64>,
    pub code: Option<String>,
    pub unified_code: Option<String>,
    pub professional_area: Option<String>,
    pub scheduled_hour: Option<String>,
    pub recurrence_type: String,
    pub recurrence_pattern: Option<String>,
    pub assigned_user_id: Option<i64>,
    pub duration_hours: Option<f64>,
    pub indication: Option<String>,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<CareGroup> for FfiCareGroup {
    type Error = CarePlanError;

    fn try_from(group: CareGroup) -> Result<Self, Self::Error> {
        Ok(Self {
            id: group.id,
            name: group.name,
            group_type: group.group_type.to_string(),
            care_type_id: group.care_type_id,
            code: group.code,
            unified_code: group.unified_code,
            professional_area: group.professional_area.map(|a| a.to_string()),
            scheduled_hour: group.scheduled_hour.map(format_hour),
            recurrence_type: group.recurrence.kind().to_string(),
            recurrence_pattern: recurrence_pattern(&group.recurrence)?,
            assigned_user_id: group.assigned_user_id,
            duration_hours: group.duration_hours,
            indication: group.indication,
            is_active: group.is_active,
            created_by: group.created_by,
            created_at: format_timestamp(&group.created_at),
            updated_at: format_timestamp(&group.updated_at),
        })
    }
}

/// Fields for creating a care group.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewCareGroup {
    pub name: String,
    /// Defaults to `control`
    pub group_type: Option<String>,
    pub care_type_id: Option<i64>,
    pub code: Option<String>,
    pub unified_code: Option<String>,
    pub professional_area: Option<String>,
    pub scheduled_hour: Option<String>,
    pub recurrence_type: Option<String>,
    pub recurrence_pattern: Option<String>,
    pub assigned_user_id: Option<i64>,
    pub duration_hours: Option<f64>,
    pub indication: Option<String>,
}

impl TryFrom<FfiNewCareGroup> for NewCareGroup {
    type Error = CarePlanError;

    fn try_from(ffi: FfiNewCareGroup) -> Result<Self, Self::Error> {
        let mut new = NewCareGroup::new(ffi.name);
        if let Some(group_type) = parse_wire_opt(ffi.group_type)? {
            new.group_type = group_type;
        }
        new.care_type_id = ffi.care_type_id;
        new.code = ffi.code;
        new.unified_code = ffi.unified_code;
        new.professional_area = parse_wire_opt(ffi.professional_area)?;
        new.scheduled_hour = parse_hour_opt(ffi.scheduled_hour)?;
        if let Some(kind) = &ffi.recurrence_type {
            new.recurrence = parse_recurrence(kind, ffi.recurrence_pattern.as_deref())?;
        }
        new.assigned_user_id = ffi.assigned_user_id;
        new.duration_hours = ffi.duration_hours;
        new.indication = ffi.indication;
        Ok(new)
    }
}

/// Partial update of a care group.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCareGroupPatch {
    pub name: Option<String>,
    pub group_type: Option<String>,
    pub care_type_id: Option<i64>,
    pub code: Option<String>,
    pub unified_code: Option<String>,
    pub professional_area: Option<String>,
    pub scheduled_hour: Option<String>,
    pub recurrence_type: Option<String>,
    pub recurrence_pattern: Option<String>,
    pub assigned_user_id: Option<i64>,
    pub duration_hours: Option<f64>,
    pub indication: Option<String>,
    pub is_active: Option<bool>,
}

impl TryFrom<FfiCareGroupPatch> for CareGroupPatch {
    type Error = CarePlanError;

    fn try_from(ffi: FfiCareGroupPatch) -> Result<Self, Self::Error> {
        let recurrence = match &ffi.recurrence_type {
            Some(kind) => Some(parse_recurrence(kind, ffi.recurrence_pattern.as_deref())?),
            None => None,
        };

        Ok(CareGroupPatch {
            name: ffi.name,
            group_type: parse_wire_opt(ffi.group_type)?,
            care_type_id: ffi.care_type_id,
            code: ffi.code,
            unified_code: ffi.unified_code,
            professional_area: parse_wire_opt(ffi.professional_area)?,
            scheduled_hour: parse_hour_opt(ffi.scheduled_hour)?,
            recurrence,
            assigned_user_id: ffi.assigned_user_id,
            duration_hours: ffi.duration_hours,
            indication: ffi.indication,
            is_active: ffi.is_active,
        })
    }
}

/// FFI-safe group membership.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiGroupMember {
    pub id: i64,
    pub care_group_id: i64,
    pub resident_id: i64,
    pub added_by: i64,
    pub added_at: String,
}

impl From<GroupMember> for FfiGroupMember {
    fn from(member: GroupMember) -> Self {
        Self {
            id: member.id,
            care_group_id: member.care_group_id,
            resident_id: member.resident_id,
            added_by: member.added_by,
            added_at: format_timestamp(&member.added_at),
        }
    }
}

/// FFI-safe scheduled task.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScheduledTask {
    pub id: i64,
    pub care_task_id: Option<i64>,
    pub care_group_id: Option<i64>,
    pub resident_id: i64,
    pub care_type_id: i64,
    pub scheduled_at: String,
    pub task_type: String,
    pub status: String,
    pub executed_at: Option<String>,
    pub executed_by: Option<i64>,
    pub result_value: Option<String>,
    pub result_numeric: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ScheduledTask> for FfiScheduledTask {
    fn from(task: ScheduledTask) -> Self {
        Self {
            id: task.id,
            care_task_id: task.care_task_id,
            care_group_id: task.care_group_id,
            resident_id: task.resident_id,
            care_type_id: task.care_type_id,
            scheduled_at: format_timestamp(&task.scheduled_at),
            task_type: task.task_type.to_string(),
            status: task.status.to_string(),
            executed_at: task.executed_at.as_ref().map(format_timestamp),
            executed_by: task.executed_by,
            result_value: task.result_value,
            result_numeric: task.result_numeric,
            notes: task.notes,
            created_at: format_timestamp(&task.created_at),
            updated_at: format_timestamp(&task.updated_at),
        }
    }
}

/// Fields for creating a scheduled task.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewScheduledTask {
    pub resident_id: i64,
    pub care_type_id: i64,
    /// RFC 3339 date-time, or `YYYY-MM-DD` for midnight UTC
    pub scheduled_at: String,
    /// Defaults to `individual`
    pub task_type: Option<String>,
    pub care_task_id: Option<i64>,
    pub care_group_id: Option<i64>,
}

impl TryFrom<FfiNewScheduledTask> for NewScheduledTask {
    type Error = CarePlanError;

    fn try_from(ffi: FfiNewScheduledTask) -> Result<Self, Self::Error> {
        let scheduled_at = parse_instant("scheduled at", &ffi.scheduled_at)?;
        let mut new = NewScheduledTask::new(ffi.resident_id, ffi.care_type_id, scheduled_at);
        if let Some(task_type) = parse_wire_opt(ffi.task_type)? {
            new.task_type = task_type;
        }
        new.care_task_id = ffi.care_task_id;
        new.care_group_id = ffi.care_group_id;
        Ok(new)
    }
}

/// Scheduled task query. Unset fields do not narrow the result.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiScheduledTaskFilter {
    /// Inclusive lower bound
    pub date_from: Option<String>,
    /// Exclusive upper bound; a bare date includes that whole day
    pub date_to: Option<String>,
    pub resident_id: Option<i64>,
    pub status: Option<String>,
    pub care_type_id: Option<i64>,
}

impl TryFrom<FfiScheduledTaskFilter> for ScheduledTaskFilter {
    type Error = CarePlanError;

    fn try_from(ffi: FfiScheduledTaskFilter) -> Result<Self, Self::Error> {
        Ok(ScheduledTaskFilter {
            date_from: ffi
                .date_from
                .map(|raw| parse_instant("date from", &raw))
                .transpose()?,
            date_to: ffi
                .date_to
                .map(|raw| parse_upper_bound("date to", &raw))
                .transpose()?,
            resident_id: ffi.resident_id,
            status: parse_wire_opt(ffi.status)?,
            care_type_id: ffi.care_type_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_authenticate() {
        assert_eq!(authenticate(&FfiCallContext { user_id: 4 }).unwrap().user_id, 4);
        assert!(matches!(
            authenticate(&FfiCallContext { user_id: 0 }),
            Err(CarePlanError::Unauthenticated(_))
        ));
        assert!(matches!(
            authenticate(&FfiCallContext { user_id: -1 }),
            Err(CarePlanError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_bare_date_bounds() {
        let from = parse_instant("date from", "2024-01-10").unwrap();
        let to = parse_upper_bound("date to", "2024-01-10").unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap());

        let exact = parse_upper_bound("date to", "2024-01-10T12:00:00+02:00").unwrap();
        assert_eq!(exact, Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap());

        assert!(matches!(
            parse_instant("date from", "10/01/2024"),
            Err(CarePlanError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_wire_value_is_validation_error() {
        let result: Result<TaskStatus, _> = parse_wire("done");
        assert!(matches!(result, Err(CarePlanError::ValidationError(_))));
        let status: TaskStatus = parse_wire(" not_done ").unwrap();
        assert_eq!(status, TaskStatus::NotDone);
    }

    #[test]
    fn test_bad_hour_rejected() {
        assert!(parse_hour_opt(None).unwrap().is_none());
        assert!(parse_hour_opt(Some("08:30".into())).unwrap().is_some());
        assert!(matches!(
            parse_hour_opt(Some("8 o'clock".into())),
            Err(CarePlanError::ValidationError(_))
        ));
    }

    #[test]
    fn test_recurrence_from_boundary() {
        let weekly = parse_recurrence("weekly", Some(r#"{"every":2,"daysOfWeek":[1,3]}"#)).unwrap();
        assert_eq!(
            weekly,
            Recurrence::Weekly {
                every: 2,
                days_of_week: vec![1, 3]
            }
        );
        assert!(matches!(
            parse_recurrence("weekly", Some("{not json")),
            Err(CarePlanError::ValidationError(_))
        ));
        assert!(matches!(
            parse_recurrence("fortnightly", None),
            Err(CarePlanError::ValidationError(_))
        ));
    }

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(
            CarePlanError::from(DbError::NotFound("care type 1".into())),
            CarePlanError::NotFound(_)
        ));
        assert!(matches!(
            CarePlanError::from(DbError::DuplicateCode("CURA".into())),
            CarePlanError::DuplicateCode(_)
        ));
        assert!(matches!(
            CarePlanError::from(DbError::Validation("name is required".into())),
            CarePlanError::ValidationError(_)
        ));
        assert!(matches!(
            CarePlanError::from(DbError::Sqlite(rusqlite::Error::InvalidQuery)),
            CarePlanError::StorageUnavailable(_)
        ));
    }
}
