//! Out-of-range flags for vital-sign results.
//!
//! Purely derived from static thresholds; nothing here is persisted.

wire_enum! {
    /// Vital-sign measurement kinds with known reference ranges.
    pub enum VitalKind: "vital sign" {
        BloodPressure => "blood_pressure",
        HeartRate => "heart_rate",
        RespiratoryRate => "respiratory_rate",
        OxygenSaturation => "oxygen_saturation",
        Temperature => "temperature",
        Glucose => "glucose",
    }
}

impl VitalKind {
    /// Measurement kind recorded by a care type, if it is a vital-sign control.
    pub fn for_care_type_code(code: &str) -> Option<Self> {
        match code {
            "CONTROL_TA" => Some(VitalKind::BloodPressure),
            "CONTROL_FC" => Some(VitalKind::HeartRate),
            "CONTROL_FR" => Some(VitalKind::RespiratoryRate),
            "CONTROL_SO2" => Some(VitalKind::OxygenSaturation),
            "TEMPERATURA" => Some(VitalKind::Temperature),
            "GLUCEMIA" => Some(VitalKind::Glucose),
            _ => None,
        }
    }

    /// Threshold check. `secondary` is the diastolic value for blood pressure
    /// and ignored otherwise.
    pub fn is_out_of_range(&self, value: f64, secondary: Option<f64>) -> bool {
        match self {
            VitalKind::BloodPressure => {
                let systolic_bad = !(90.0..=140.0).contains(&value);
                let diastolic_bad = secondary.map_or(false, |d| !(60.0..=90.0).contains(&d));
                systolic_bad || diastolic_bad
            }
            VitalKind::HeartRate => !(50.0..=100.0).contains(&value),
            VitalKind::RespiratoryRate => !(12.0..=20.0).contains(&value),
            VitalKind::OxygenSaturation => value < 92.0,
            VitalKind::Temperature => !(35.5..=37.5).contains(&value),
            VitalKind::Glucose => !(70.0..=180.0).contains(&value),
        }
    }

    /// Flag a recorded result. `None` when the result cannot be read as this kind.
    ///
    /// Blood pressure is read from a `"systolic/diastolic"` text value. Other
    /// kinds prefer the numeric result and fall back to parsing the text.
    pub fn flag_result(&self, result_value: Option<&str>, result_numeric: Option<f64>) -> Option<bool> {
        match self {
            VitalKind::BloodPressure => {
                let (systolic, diastolic) = parse_blood_pressure(result_value?)?;
                Some(self.is_out_of_range(systolic, Some(diastolic)))
            }
            _ => {
                let value = match result_numeric {
                    Some(value) => value,
                    None => parse_decimal(result_value?)?,
                };
                Some(self.is_out_of_range(value, None))
            }
        }
    }
}

/// Parse `"120/80"` (unit suffix tolerated) into systolic and diastolic.
pub fn parse_blood_pressure(raw: &str) -> Option<(f64, f64)> {
    let (systolic, diastolic) = raw.split_once('/')?;
    let diastolic = diastolic.trim().split_whitespace().next()?;
    Some((parse_decimal(systolic)?, parse_decimal(diastolic)?))
}

/// Decimal parse accepting a comma as separator ("36,8").
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(
            VitalKind::for_care_type_code("CONTROL_TA"),
            Some(VitalKind::BloodPressure)
        );
        assert_eq!(VitalKind::for_care_type_code("GLUCEMIA"), Some(VitalKind::Glucose));
        assert_eq!(VitalKind::for_care_type_code("BANO"), None);
    }

    #[test]
    fn test_blood_pressure_thresholds() {
        let bp = VitalKind::BloodPressure;
        assert!(!bp.is_out_of_range(120.0, Some(80.0)));
        assert!(bp.is_out_of_range(141.0, Some(80.0)));
        assert!(bp.is_out_of_range(89.0, Some(80.0)));
        assert!(bp.is_out_of_range(120.0, Some(91.0)));
        assert!(bp.is_out_of_range(120.0, Some(59.0)));
        assert!(!bp.is_out_of_range(140.0, Some(90.0)));
    }

    #[test]
    fn test_single_value_thresholds() {
        assert!(VitalKind::HeartRate.is_out_of_range(101.0, None));
        assert!(!VitalKind::HeartRate.is_out_of_range(50.0, None));
        assert!(VitalKind::RespiratoryRate.is_out_of_range(11.0, None));
        assert!(VitalKind::OxygenSaturation.is_out_of_range(91.9, None));
        assert!(!VitalKind::OxygenSaturation.is_out_of_range(99.0, None));
        assert!(VitalKind::Temperature.is_out_of_range(37.6, None));
        assert!(!VitalKind::Temperature.is_out_of_range(36.6, None));
        assert!(VitalKind::Glucose.is_out_of_range(181.0, None));
        assert!(VitalKind::Glucose.is_out_of_range(69.0, None));
    }

    #[test]
    fn test_flag_result() {
        let bp = VitalKind::BloodPressure;
        assert_eq!(bp.flag_result(Some("120/80"), None), Some(false));
        assert_eq!(bp.flag_result(Some("160/95 mmHg"), None), Some(true));
        assert_eq!(bp.flag_result(Some("high"), None), None);
        assert_eq!(bp.flag_result(None, Some(120.0)), None);

        let temp = VitalKind::Temperature;
        assert_eq!(temp.flag_result(None, Some(38.2)), Some(true));
        assert_eq!(temp.flag_result(Some("36,8"), None), Some(false));
        assert_eq!(temp.flag_result(None, None), None);
    }
}
