//! Care type registry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    /// Broad grouping of a care type.
    pub enum CareCategory: "care category" {
        /// Clinical control, usually with a measured result
        Control => "control",
        /// Activity or assistance (transfers, bathing, group therapy)
        Activity => "activity",
        /// Plain log entry (vaccinations, incidents)
        LogEntry => "log-entry",
    }
}

wire_enum! {
    /// Care discipline responsible for a care type or standing order.
    pub enum ProfessionalArea: "professional area" {
        Nursing => "nursing",
        SocialWorker => "social-worker",
        Psychologist => "psychologist",
        Physiotherapist => "physiotherapist",
        OccupationalTherapist => "occupational-therapist",
        ActivityLeader => "activity-leader",
        Educator => "educator",
        Dietitian => "dietitian",
        SpeechTherapist => "speech-therapist",
        Physician => "physician",
    }
}

impl Default for ProfessionalArea {
    fn default() -> Self {
        ProfessionalArea::Nursing
    }
}

wire_enum! {
    /// Shape of the result captured when a care type is executed.
    pub enum ResultType: "result type" {
        Numeric => "numeric",
        Text => "text",
        Boolean => "boolean",
        Scale => "scale",
    }
}

/// A reusable definition of a care or activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareType {
    /// Surrogate key
    pub id: i64,
    /// Unique code (e.g. "CONTROL_TA")
    pub code: String,
    /// Display name
    pub name: String,
    pub category: CareCategory,
    pub professional_area: ProfessionalArea,
    /// Whether execution is expected to capture a result
    pub requires_result: bool,
    pub result_type: Option<ResultType>,
    /// Free-text unit (e.g. "mmHg")
    pub result_unit: Option<String>,
    /// False once soft-deleted
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl CareType {
    /// Whether a result for this type is expected to land in `result_numeric`.
    pub fn expects_numeric_result(&self) -> bool {
        self.requires_result && matches!(self.result_type, Some(ResultType::Numeric))
    }
}

/// Fields for creating a care type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCareType {
    pub code: String,
    pub name: String,
    pub category: CareCategory,
    pub professional_area: ProfessionalArea,
    pub requires_result: bool,
    pub result_type: Option<ResultType>,
    pub result_unit: Option<String>,
    pub sort_order: i64,
}

impl NewCareType {
    /// Create with required fields; everything else takes its default.
    pub fn new(code: impl Into<String>, name: impl Into<String>, category: CareCategory) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category,
            professional_area: ProfessionalArea::default(),
            requires_result: false,
            result_type: None,
            result_unit: None,
            sort_order: 0,
        }
    }

    /// Mark the type as requiring a result of the given shape.
    pub fn with_result(mut self, result_type: ResultType, unit: Option<&str>) -> Self {
        self.requires_result = true;
        self.result_type = Some(result_type);
        self.result_unit = unit.map(str::to_string);
        self
    }
}

/// Partial update of a care type. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CareTypePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<CareCategory>,
    pub professional_area: Option<ProfessionalArea>,
    pub requires_result: Option<bool>,
    pub result_type: Option<ResultType>,
    pub result_unit: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

impl CareTypePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the set fields onto an existing care type.
    pub fn apply_to(&self, care_type: &mut CareType) {
        if let Some(code) = &self.code {
            care_type.code = code.clone();
        }
        if let Some(name) = &self.name {
            care_type.name = name.clone();
        }
        if let Some(category) = self.category {
            care_type.category = category;
        }
        if let Some(area) = self.professional_area {
            care_type.professional_area = area;
        }
        if let Some(requires_result) = self.requires_result {
            care_type.requires_result = requires_result;
        }
        if let Some(result_type) = self.result_type {
            care_type.result_type = Some(result_type);
        }
        if let Some(unit) = &self.result_unit {
            care_type.result_unit = Some(unit.clone());
        }
        if let Some(is_active) = self.is_active {
            care_type.is_active = is_active;
        }
        if let Some(sort_order) = self.sort_order {
            care_type.sort_order = sort_order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_care_type() -> CareType {
        CareType {
            id: 1,
            code: "CONTROL_FC".into(),
            name: "Heart rate check".into(),
            category: CareCategory::Control,
            professional_area: ProfessionalArea::Nursing,
            requires_result: true,
            result_type: Some(ResultType::Numeric),
            result_unit: Some("bpm".into()),
            is_active: true,
            sort_order: 2,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(CareCategory::LogEntry.as_str(), "log-entry");
        assert_eq!("log-entry".parse::<CareCategory>().unwrap(), CareCategory::LogEntry);
        assert_eq!(
            "occupational-therapist".parse::<ProfessionalArea>().unwrap(),
            ProfessionalArea::OccupationalTherapist
        );

        let err = "registro".parse::<CareCategory>().unwrap_err();
        assert_eq!(err.kind, "care category");
        assert_eq!(err.value, "registro");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&ResultType::Scale).unwrap();
        assert_eq!(json, "\"scale\"");
        let parsed: ProfessionalArea = serde_json::from_str("\"speech-therapist\"").unwrap();
        assert_eq!(parsed, ProfessionalArea::SpeechTherapist);
        assert!(serde_json::from_str::<ResultType>("\"decimal\"").is_err());
    }

    #[test]
    fn test_new_care_type_defaults() {
        let new = NewCareType::new("BANO", "Bath", CareCategory::Activity);
        assert_eq!(new.professional_area, ProfessionalArea::Nursing);
        assert!(!new.requires_result);
        assert_eq!(new.result_type, None);

        let new = new.with_result(ResultType::Boolean, None);
        assert!(new.requires_result);
        assert_eq!(new.result_type, Some(ResultType::Boolean));
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let mut care_type = make_care_type();
        let patch = CareTypePatch {
            name: Some("Pulse".into()),
            sort_order: Some(9),
            ..Default::default()
        };
        patch.apply_to(&mut care_type);

        assert_eq!(care_type.name, "Pulse");
        assert_eq!(care_type.sort_order, 9);
        assert_eq!(care_type.code, "CONTROL_FC");
        assert_eq!(care_type.result_unit.as_deref(), Some("bpm"));
        assert!(CareTypePatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_expects_numeric_result() {
        let mut care_type = make_care_type();
        assert!(care_type.expects_numeric_result());
        care_type.result_type = Some(ResultType::Text);
        assert!(!care_type.expects_numeric_result());
    }
}
