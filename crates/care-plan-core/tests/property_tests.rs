//! Property tests for membership idempotence and scheduled task filtering.

use std::collections::BTreeSet;

use care_plan_core::db::Database;
use care_plan_core::models::{
    Actor, CareCategory, NewCareGroup, NewCareType, NewScheduledTask, ScheduledTaskFilter,
    TaskStatus,
};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// However often residents are added, each appears once.
    #[test]
    fn membership_is_idempotent(residents in prop::collection::vec(1i64..6, 0..30)) {
        let db = Database::open_in_memory().unwrap();
        let actor = Actor::new(1);
        let group = db.insert_care_group(&actor, &NewCareGroup::new("Choir")).unwrap();

        for resident in &residents {
            db.add_resident_to_group(&actor, group.id, *resident).unwrap();
        }

        let members: Vec<i64> = db
            .list_group_members(group.id)
            .unwrap()
            .into_iter()
            .map(|m| m.resident_id)
            .collect();
        let distinct: BTreeSet<i64> = residents.iter().copied().collect();
        let member_set: BTreeSet<i64> = members.iter().copied().collect();

        prop_assert_eq!(members.len(), distinct.len());
        prop_assert_eq!(member_set, distinct);
    }

    /// The storage query returns exactly the tasks the in-memory filter
    /// accepts, in schedule order.
    #[test]
    fn list_matches_filter(
        tasks in prop::collection::vec((1i64..4, 0i64..96, status_strategy()), 1..25),
        window_start in 0i64..96,
        window_len in 0i64..48,
        resident in prop::option::of(1i64..4),
        status in prop::option::of(status_strategy()),
    ) {
        let db = Database::open_in_memory().unwrap();
        let care_type = db
            .insert_care_type(&NewCareType::new("CURA", "Wound care", CareCategory::Control))
            .unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();

        let mut stored = Vec::new();
        for (resident_id, offset, status) in &tasks {
            let at = base + Duration::hours(*offset);
            let task = db
                .insert_scheduled_task(&NewScheduledTask::new(*resident_id, care_type.id, at))
                .unwrap();
            let task = if *status == TaskStatus::Pending {
                task
            } else {
                db.update_scheduled_task_status(task.id, *status).unwrap()
            };
            stored.push(task);
        }

        let filter = ScheduledTaskFilter {
            date_from: Some(base + Duration::hours(window_start)),
            date_to: Some(base + Duration::hours(window_start + window_len)),
            resident_id: resident,
            status,
            care_type_id: None,
        };

        let listed: Vec<i64> = db
            .list_scheduled_tasks(&filter)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();

        let mut expected: Vec<_> = stored.iter().filter(|t| filter.matches(t)).collect();
        expected.sort_by_key(|t| (t.scheduled_at, t.id));
        let expected: Vec<i64> = expected.into_iter().map(|t| t.id).collect();

        prop_assert_eq!(listed, expected);
    }
}
