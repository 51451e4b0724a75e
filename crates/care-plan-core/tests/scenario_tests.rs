//! End-to-end planning and execution scenarios against the storage layer.

use care_plan_core::db::{Database, DbError};
use care_plan_core::models::{
    Actor, CareCategory, CareTaskStatus, ExecutionResult, NewCareGroup, NewCareTask,
    NewCareType, NewScheduledTask, Recurrence, ResultType, ScheduledTaskFilter, TaskStatus,
    TaskType,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn nurse() -> Actor {
    Actor::new(1)
}

fn at(day: u32, hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

#[test]
fn test_blood_pressure_execution() {
    let db = Database::open_in_memory().unwrap();

    let bp = db
        .insert_care_type(
            &NewCareType::new("CONTROL_TA", "Blood pressure check", CareCategory::Control)
                .with_result(ResultType::Text, Some("mmHg")),
        )
        .unwrap();
    let task = db
        .insert_scheduled_task(&NewScheduledTask::new(42, bp.id, at(10, 8)))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    db.execute_scheduled_task(&nurse(), task.id, &ExecutionResult::text("120/80"))
        .unwrap();

    let executed = db.get_scheduled_task(task.id).unwrap().unwrap();
    assert_eq!(executed.status, TaskStatus::Completed);
    assert_eq!(executed.result_value.as_deref(), Some("120/80"));
    assert!(executed.executed_at.is_some());
    assert_eq!(executed.executed_by, Some(1));
}

#[test]
fn test_group_membership_added_twice() {
    let db = Database::open_in_memory().unwrap();
    let group = db
        .insert_care_group(&nurse(), &NewCareGroup::new("Group Kinesiotherapy"))
        .unwrap();

    db.add_resident_to_group(&nurse(), group.id, 7).unwrap();
    db.add_resident_to_group(&nurse(), group.id, 7).unwrap();

    let count: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM care_group_members WHERE care_group_id = ? AND resident_id = 7",
            [group.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_absent_leaves_execution_unset() {
    let db = Database::open_in_memory().unwrap();
    let bath = db
        .insert_care_type(&NewCareType::new("BANO", "Bath", CareCategory::Activity))
        .unwrap();
    let task = db
        .insert_scheduled_task(&NewScheduledTask::new(42, bath.id, at(10, 10)))
        .unwrap();

    db.update_scheduled_task_status(task.id, TaskStatus::Absent)
        .unwrap();

    let task = db.get_scheduled_task(task.id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Absent);
    assert!(task.executed_at.is_none());
    assert!(task.executed_by.is_none());
}

#[test]
fn test_duplicate_code_rejected() {
    let db = Database::open_in_memory().unwrap();
    db.insert_care_type(&NewCareType::new("DUP", "First", CareCategory::Control))
        .unwrap();

    let result = db.insert_care_type(&NewCareType::new("DUP", "Second", CareCategory::Control));
    assert!(matches!(result, Err(DbError::DuplicateCode(_))));
}

#[test]
fn test_duplicate_code_of_inactive_type_rejected() {
    let db = Database::open_in_memory().unwrap();
    let first = db
        .insert_care_type(&NewCareType::new("DUP", "First", CareCategory::Control))
        .unwrap();
    db.deactivate_care_type(first.id).unwrap();

    let result = db.insert_care_type(&NewCareType::new("DUP", "Second", CareCategory::Control));
    assert!(matches!(result, Err(DbError::DuplicateCode(_))));
}

#[test]
fn test_execute_twice_last_write_wins() {
    let db = Database::open_in_memory().unwrap();
    let temp = db
        .insert_care_type(
            &NewCareType::new("TEMPERATURA", "Temperature", CareCategory::Control)
                .with_result(ResultType::Numeric, Some("°C")),
        )
        .unwrap();
    let task = db
        .insert_scheduled_task(&NewScheduledTask::new(42, temp.id, at(10, 8)))
        .unwrap();

    db.execute_scheduled_task(&Actor::new(1), task.id, &ExecutionResult::numeric(38.1))
        .unwrap();
    db.execute_scheduled_task(&Actor::new(2), task.id, &ExecutionResult::numeric(37.2))
        .unwrap();

    let task = db.get_scheduled_task(task.id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.executed_by, Some(2));
    assert_eq!(task.result_numeric, Some(37.2));
}

#[test]
fn test_cancelled_care_task_still_retrievable() {
    let db = Database::open_in_memory().unwrap();
    let care_type = db
        .insert_care_type(&NewCareType::new("CURA", "Wound care", CareCategory::Control))
        .unwrap();

    let mut new = NewCareTask::new(42, care_type.id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    new.recurrence = Recurrence::Daily { every: 1 };
    let task = db.insert_care_task(&nurse(), &new).unwrap();

    db.cancel_care_task(task.id).unwrap();

    let task = db.get_care_task(task.id).unwrap().unwrap();
    assert_eq!(task.status, CareTaskStatus::Cancelled);
    assert_eq!(task.recurrence, Recurrence::Daily { every: 1 });
}

#[test]
fn test_deactivated_care_type_keeps_references() {
    let db = Database::open_in_memory().unwrap();
    let care_type = db
        .insert_care_type(&NewCareType::new("ECG", "Electrocardiogram", CareCategory::Control))
        .unwrap();
    let task = db
        .insert_scheduled_task(&NewScheduledTask::new(42, care_type.id, at(10, 9)))
        .unwrap();

    db.deactivate_care_type(care_type.id).unwrap();

    assert!(db.list_care_types(true).unwrap().is_empty());
    let task = db.get_scheduled_task(task.id).unwrap().unwrap();
    assert_eq!(task.care_type_id, care_type.id);
    assert!(!db.get_care_type(care_type.id).unwrap().unwrap().is_active);
}

#[test]
fn test_group_session_day() {
    let db = Database::open_in_memory().unwrap();
    db.initialize_default_care_types().unwrap();
    let kinesio = db.get_care_type_by_code("CINESITERAPIA").unwrap().unwrap();

    let mut new = NewCareGroup::new("Group Kinesiotherapy");
    new.care_type_id = Some(kinesio.id);
    new.recurrence = Recurrence::Weekly {
        every: 1,
        days_of_week: vec![3],
    };
    let group = db.insert_care_group(&nurse(), &new).unwrap();
    for resident in [7, 8, 9] {
        db.add_resident_to_group(&nurse(), group.id, resident).unwrap();
    }

    for member in db.list_group_members(group.id).unwrap() {
        let mut occurrence = NewScheduledTask::new(member.resident_id, kinesio.id, at(10, 11));
        occurrence.task_type = TaskType::Group;
        occurrence.care_group_id = Some(group.id);
        db.insert_scheduled_task(&occurrence).unwrap();
    }

    let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    assert_eq!(db.count_scheduled_tasks_on(day).unwrap(), 3);

    let session = db
        .list_scheduled_tasks(&ScheduledTaskFilter::for_day(day).care_type(kinesio.id))
        .unwrap();
    let first = session[0].id;
    db.update_scheduled_task_status(first, TaskStatus::Absent)
        .unwrap();
    for task in &session[1..] {
        db.execute_scheduled_task(&nurse(), task.id, &ExecutionResult::default())
            .unwrap();
    }

    let completed = db
        .list_scheduled_tasks(&ScheduledTaskFilter::for_day(day).status(TaskStatus::Completed))
        .unwrap();
    assert_eq!(completed.len(), 2);
    assert!(completed.iter().all(|t| t.care_group_id == Some(group.id)));
}
