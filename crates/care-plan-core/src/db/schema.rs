//! SQLite schema definition.

/// Complete database schema for care planning.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Care Types (master list, soft-deleted via is_active)
-- ============================================================================

CREATE TABLE IF NOT EXISTS care_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('control', 'activity', 'log-entry')),
    professional_area TEXT NOT NULL DEFAULT 'nursing',
    requires_result INTEGER NOT NULL DEFAULT 0,
    result_type TEXT CHECK (result_type IN ('numeric', 'text', 'boolean', 'scale')),
    result_unit TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_care_types_order ON care_types(sort_order, name);

-- ============================================================================
-- Care Tasks (per-resident standing orders, soft-deleted via status)
-- ============================================================================

CREATE TABLE IF NOT EXISTS care_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resident_id INTEGER NOT NULL,
    care_type_id INTEGER NOT NULL REFERENCES care_types(id),
    subtype TEXT,
    start_date TEXT NOT NULL,                     -- YYYY-MM-DD
    end_date TEXT,
    scheduled_hour TEXT,                          -- HH:MM
    recurrence_type TEXT NOT NULL DEFAULT 'none'
        CHECK (recurrence_type IN ('none', 'daily', 'weekly', 'monthly', 'custom')),
    recurrence_pattern TEXT,                      -- JSON, e.g. {"every":2,"daysOfWeek":[1,3,5]}
    professional_area TEXT,
    assigned_user_id INTEGER,
    indication TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'paused', 'completed', 'cancelled')),
    created_by INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_care_tasks_resident ON care_tasks(resident_id, status);
CREATE INDEX IF NOT EXISTS idx_care_tasks_type ON care_tasks(care_type_id);

-- ============================================================================
-- Care Groups (group standing orders, soft-deleted via is_active)
-- ============================================================================

CREATE TABLE IF NOT EXISTS care_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    group_type TEXT NOT NULL DEFAULT 'control' CHECK (group_type IN ('control', 'activity')),
    care_type_id INTEGER REFERENCES care_types(id),
    code TEXT,
    unified_code TEXT,
    professional_area TEXT,
    scheduled_hour TEXT,
    recurrence_type TEXT NOT NULL DEFAULT 'none'
        CHECK (recurrence_type IN ('none', 'daily', 'weekly', 'monthly', 'custom')),
    recurrence_pattern TEXT,
    assigned_user_id INTEGER,
    duration_hours REAL,
    indication TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_by INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

-- Membership rows are hard-deleted. The (group, resident) pair is kept unique
-- by the data access layer, not by a constraint.
CREATE TABLE IF NOT EXISTS care_group_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    care_group_id INTEGER NOT NULL REFERENCES care_groups(id),
    resident_id INTEGER NOT NULL,
    added_by INTEGER NOT NULL,
    added_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_group_members_pair ON care_group_members(care_group_id, resident_id);

-- ============================================================================
-- Scheduled Tasks (dated occurrences, never deleted)
-- ============================================================================

CREATE TABLE IF NOT EXISTS scheduled_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    care_task_id INTEGER REFERENCES care_tasks(id),
    care_group_id INTEGER REFERENCES care_groups(id),
    resident_id INTEGER NOT NULL,
    care_type_id INTEGER NOT NULL REFERENCES care_types(id),
    scheduled_at TEXT NOT NULL,                   -- YYYY-MM-DDTHH:MM:SSZ
    task_type TEXT NOT NULL DEFAULT 'individual' CHECK (task_type IN ('individual', 'group')),
    status TEXT DEFAULT 'pending'                 -- NULL is read as pending
        CHECK (status IN ('pending', 'completed', 'not_done', 'absent', 'cancelled')),
    executed_at TEXT,
    executed_by INTEGER,
    result_value TEXT,                            -- may hold JSON for composite results
    result_numeric REAL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_scheduled_at ON scheduled_tasks(scheduled_at);
CREATE INDEX IF NOT EXISTS idx_scheduled_resident ON scheduled_tasks(resident_id, scheduled_at);
CREATE INDEX IF NOT EXISTS idx_scheduled_status ON scheduled_tasks(status);
"#;
