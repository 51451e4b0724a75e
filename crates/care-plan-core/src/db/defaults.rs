//! Standard care type catalogue seeded into a fresh facility.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::{CareCategory, NewCareType, ResultType};

/// One entry of the default catalogue.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCareType {
    pub code: &'static str,
    pub name: &'static str,
    pub category: CareCategory,
    pub result: Option<(ResultType, Option<&'static str>)>,
}

const fn control(code: &'static str, name: &'static str) -> DefaultCareType {
    DefaultCareType {
        code,
        name,
        category: CareCategory::Control,
        result: None,
    }
}

const fn activity(code: &'static str, name: &'static str) -> DefaultCareType {
    DefaultCareType {
        code,
        name,
        category: CareCategory::Activity,
        result: None,
    }
}

const fn measured(
    code: &'static str,
    name: &'static str,
    result_type: ResultType,
    unit: &'static str,
) -> DefaultCareType {
    DefaultCareType {
        code,
        name,
        category: CareCategory::Control,
        result: Some((result_type, Some(unit))),
    }
}

/// Default catalogue, in display order.
pub const DEFAULT_CARE_TYPES: &[DefaultCareType] = &[
    measured("CONTROL_TA", "Blood pressure", ResultType::Text, "mmHg"),
    measured("CONTROL_FC", "Heart rate", ResultType::Numeric, "lpm"),
    measured("CONTROL_FR", "Respiratory rate", ResultType::Numeric, "rpm"),
    measured("CONTROL_SO2", "Oxygen saturation", ResultType::Numeric, "%"),
    measured("GLUCEMIA", "Blood glucose", ResultType::Numeric, "mg/dl"),
    measured("TEMPERATURA", "Temperature", ResultType::Numeric, "°C"),
    measured("PESO", "Weight", ResultType::Numeric, "kg"),
    control("CURA", "Wound care"),
    control("ECG", "Electrocardiogram"),
    control("INGESTA_LIQUIDA", "Fluid intake"),
    control("INGESTA_SOLIDA", "Food intake"),
    control("INYECTABLES", "Injections"),
    control("NEBULIZACIONES", "Nebulisation"),
    control("OXIGENOTERAPIA", "Oxygen therapy"),
    control("PARCHE", "Transdermal patch"),
    activity("MOVILIZACIONES", "Mobilisation"),
    activity("TRANSFERENCIAS", "Transfers"),
    activity("CAMBIO_POSTURAL", "Repositioning"),
    activity("CAMBIO_PANAL", "Incontinence pad change"),
    activity("BANO", "Bath"),
    control("SONDA_VESICAL", "Urinary catheter"),
    control("SONDA_NASOGASTRICA", "Nasogastric tube"),
    DefaultCareType {
        code: "VACUNACIONES",
        name: "Vaccinations",
        category: CareCategory::LogEntry,
        result: None,
    },
    activity("CINESITERAPIA", "Kinesiotherapy"),
];

impl DefaultCareType {
    /// Creation fields, with the catalogue position as sort order.
    pub fn to_new(&self, sort_order: i64) -> NewCareType {
        let mut new = NewCareType::new(self.code, self.name, self.category);
        if let Some((result_type, unit)) = self.result {
            new = new.with_result(result_type, unit);
        }
        new.sort_order = sort_order;
        new
    }
}

impl Database {
    /// Insert every default care type whose code is not yet present.
    ///
    /// Returns the number of rows inserted. Blood pressure readings are
    /// "systolic/diastolic" text, so a `CONTROL_TA` stored as numeric is
    /// corrected to text.
    pub fn initialize_default_care_types(&self) -> DbResult<usize> {
        let mut inserted = 0;
        for (position, default) in DEFAULT_CARE_TYPES.iter().enumerate() {
            if self.get_care_type_by_code(default.code)?.is_some() {
                continue;
            }
            self.insert_care_type(&default.to_new(position as i64 + 1))?;
            inserted += 1;
        }

        let corrected = self.conn.execute(
            "UPDATE care_types SET result_type = ?1 WHERE code = 'CONTROL_TA' AND result_type = ?2",
            params![ResultType::Text.as_str(), ResultType::Numeric.as_str()],
        )?;
        if corrected > 0 {
            tracing::warn!("corrected CONTROL_TA result type to text");
        }

        tracing::info!(inserted, total = DEFAULT_CARE_TYPES.len(), "initialized default care types");
        Ok(inserted)
    }
}
