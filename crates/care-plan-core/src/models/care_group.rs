//! Group standing orders and their members.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::care_type::ProfessionalArea;
use super::recurrence::Recurrence;

wire_enum! {
    /// What kind of session a group represents.
    pub enum GroupType: "group type" {
        Control => "control",
        Activity => "activity",
    }
}

impl Default for GroupType {
    fn default() -> Self {
        GroupType::Control
    }
}

/// A standing order applied to a set of residents at once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareGroup {
    pub id: i64,
    pub name: String,
    pub group_type: GroupType,
    pub care_type_id: Option<i64>,
    pub code: Option<String>,
    /// Code shared with the facility's unified catalogue
    pub unified_code: Option<String>,
    pub professional_area: Option<ProfessionalArea>,
    pub scheduled_hour: Option<NaiveTime>,
    pub recurrence: Recurrence,
    pub assigned_user_id: Option<i64>,
    /// Session length in hours
    pub duration_hours: Option<f64>,
    pub indication: Option<String>,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCareGroup {
    pub name: String,
    pub group_type: GroupType,
    pub care_type_id: Option<i64>,
    pub code: Option<String>,
    pub unified_code: Option<String>,
    pub professional_area: Option<ProfessionalArea>,
    pub scheduled_hour: Option<NaiveTime>,
    pub recurrence: Recurrence,
    pub assigned_user_id: Option<i64>,
    pub duration_hours: Option<f64>,
    pub indication: Option<String>,
}

impl NewCareGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_type: GroupType::default(),
            care_type_id: None,
            code: None,
            unified_code: None,
            professional_area: None,
            scheduled_hour: None,
            recurrence: Recurrence::None,
            assigned_user_id: None,
            duration_hours: None,
            indication: None,
        }
    }
}

/// Partial update of a group. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CareGroupPatch {
    pub name: Option<String>,
    pub group_type: Option<GroupType>,
    pub care_type_id: Option<i64>,
    pub code: Option<String>,
    pub unified_code: Option<String>,
    pub professional_area: Option<ProfessionalArea>,
    pub scheduled_hour: Option<NaiveTime>,
    pub recurrence: Option<Recurrence>,
    pub assigned_user_id: Option<i64>,
    pub duration_hours: Option<f64>,
    pub indication: Option<String>,
    pub is_active: Option<bool>,
}

impl CareGroupPatch {
    pub fn apply_to(&self, group: &mut CareGroup) {
        if let Some(name) = &self.name {
            group.name = name.clone();
        }
        if let Some(group_type) = self.group_type {
            group.group_type = group_type;
        }
        if let Some(care_type_id) = self.care_type_id {
            group.care_type_id = Some(care_type_id);
        }
        if let Some(code) = &self.code {
            group.code = Some(code.clone());
        }
        if let Some(unified_code) = &self.unified_code {
            group.unified_code = Some(unified_code.clone());
        }
        if let Some(area) = self.professional_area {
            group.professional_area = Some(area);
        }
        if let Some(hour) = self.scheduled_hour {
            group.scheduled_hour = Some(hour);
        }
        if let Some(recurrence) = &self.recurrence {
            group.recurrence = recurrence.clone();
        }
        if let Some(user_id) = self.assigned_user_id {
            group.assigned_user_id = Some(user_id);
        }
        if let Some(hours) = self.duration_hours {
            group.duration_hours = Some(hours);
        }
        if let Some(indication) = &self.indication {
            group.indication = Some(indication.clone());
        }
        if let Some(is_active) = self.is_active {
            group.is_active = is_active;
        }
    }
}

/// A resident's membership in a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMember {
    pub id: i64,
    pub care_group_id: i64,
    pub resident_id: i64,
    pub added_by: i64,
    pub added_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_group_defaults() {
        let group = NewCareGroup::new("Group kinesiotherapy");
        assert_eq!(group.group_type, GroupType::Control);
        assert_eq!(group.recurrence, Recurrence::None);
        assert_eq!(group.care_type_id, None);
    }

    #[test]
    fn test_patch_deactivates() {
        let now = Utc::now();
        let mut group = CareGroup {
            id: 1,
            name: "Memory workshop".into(),
            group_type: GroupType::Activity,
            care_type_id: None,
            code: None,
            unified_code: None,
            professional_area: Some(ProfessionalArea::Psychologist),
            scheduled_hour: None,
            recurrence: Recurrence::None,
            assigned_user_id: None,
            duration_hours: Some(1.5),
            indication: None,
            is_active: true,
            created_by: 1,
            created_at: now,
            updated_at: now,
        };

        let patch = CareGroupPatch {
            is_active: Some(false),
            duration_hours: Some(2.0),
            ..Default::default()
        };
        patch.apply_to(&mut group);

        assert!(!group.is_active);
        assert_eq!(group.duration_hours, Some(2.0));
        assert_eq!(group.name, "Memory workshop");
        assert_eq!(group.group_type, GroupType::Activity);
    }
}
