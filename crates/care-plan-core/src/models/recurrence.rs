//! Recurrence of standing orders.
//!
//! Recurrence is descriptive: it records how often a standing order is meant
//! to happen, but nothing in this crate expands it into scheduled tasks.
//!
//! It is stored as two columns, a kind and an optional JSON pattern
//! (e.g. `{"every":2,"daysOfWeek":[1,3,5]}`), and decoded into [`Recurrence`]
//! once when a row is read.

use serde::{Deserialize, Serialize};

wire_enum! {
    /// Stored discriminator of a recurrence.
    pub enum RecurrenceKind: "recurrence type" {
        None => "none",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Custom => "custom",
    }
}

/// How often a standing order repeats.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// One-off
    #[default]
    None,
    /// Every `every` days
    Daily { every: u32 },
    /// Every `every` weeks on the given ISO weekdays (1 = Monday .. 7 = Sunday)
    Weekly { every: u32, days_of_week: Vec<u8> },
    /// Every `every` months, optionally pinned to a day of the month
    Monthly { every: u32, day_of_month: Option<u32> },
    /// Facility-specific pattern kept as an opaque document
    Custom { pattern: serde_json::Value },
}

/// JSON layout of the stored pattern column.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    every: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    days_of_week: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    day_of_month: Option<u32>,
}

impl StoredPattern {
    /// A missing or blank column decodes to the default layout.
    fn parse(pattern: Option<&str>) -> Result<Self, serde_json::Error> {
        match pattern {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw),
            _ => Ok(Self::default()),
        }
    }

    fn every(&self) -> u32 {
        self.every.unwrap_or(1)
    }
}

impl Recurrence {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Recurrence::None => RecurrenceKind::None,
            Recurrence::Daily { .. } => RecurrenceKind::Daily,
            Recurrence::Weekly { .. } => RecurrenceKind::Weekly,
            Recurrence::Monthly { .. } => RecurrenceKind::Monthly,
            Recurrence::Custom { .. } => RecurrenceKind::Custom,
        }
    }

    /// Encode the pattern column. `None` for one-off orders.
    pub fn pattern_json(&self) -> Result<Option<String>, serde_json::Error> {
        let stored = match self {
            Recurrence::None => return Ok(None),
            Recurrence::Custom { pattern } => return serde_json::to_string(pattern).map(Some),
            Recurrence::Daily { every } => StoredPattern {
                every: Some(*every),
                ..Default::default()
            },
            Recurrence::Weekly { every, days_of_week } => StoredPattern {
                every: Some(*every),
                days_of_week: days_of_week.clone(),
                ..Default::default()
            },
            Recurrence::Monthly { every, day_of_month } => StoredPattern {
                every: Some(*every),
                day_of_month: *day_of_month,
                ..Default::default()
            },
        };
        serde_json::to_string(&stored).map(Some)
    }

    /// Decode from the kind and pattern columns.
    ///
    /// A missing pattern means "every 1" for the periodic kinds.
    pub fn from_parts(kind: RecurrenceKind, pattern: Option<&str>) -> Result<Self, serde_json::Error> {
        let recurrence = match kind {
            RecurrenceKind::Custom => Recurrence::Custom {
                pattern: match pattern {
                    Some(raw) => serde_json::from_str(raw)?,
                    None => serde_json::Value::Null,
                },
            },
            RecurrenceKind::None => {
                StoredPattern::parse(pattern)?;
                Recurrence::None
            }
            RecurrenceKind::Daily => Recurrence::Daily {
                every: StoredPattern::parse(pattern)?.every(),
            },
            RecurrenceKind::Weekly => {
                let stored = StoredPattern::parse(pattern)?;
                Recurrence::Weekly {
                    every: stored.every(),
                    days_of_week: stored.days_of_week,
                }
            }
            RecurrenceKind::Monthly => {
                let stored = StoredPattern::parse(pattern)?;
                Recurrence::Monthly {
                    every: stored.every(),
                    day_of_month: stored.day_of_month,
                }
            }
        };
        Ok(recurrence)
    }

    /// Check interval and calendar bounds.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Recurrence::None | Recurrence::Custom { .. } => Ok(()),
            Recurrence::Daily { every } => check_every(*every),
            Recurrence::Weekly { every, days_of_week } => {
                check_every(*every)?;
                match days_of_week.iter().find(|d| !(1..=7).contains(*d)) {
                    Some(day) => Err(format!("day of week out of range 1-7: {}", day)),
                    None => Ok(()),
                }
            }
            Recurrence::Monthly { every, day_of_month } => {
                check_every(*every)?;
                match day_of_month {
                    Some(day) if !(1..=31).contains(day) => {
                        Err(format!("day of month out of range 1-31: {}", day))
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}

fn check_every(every: u32) -> Result<(), String> {
    if every == 0 {
        Err("recurrence interval must be at least 1".into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_pattern_layout() {
        let recurrence = Recurrence::Weekly {
            every: 2,
            days_of_week: vec![1, 3, 5],
        };
        let json = recurrence.pattern_json().unwrap().unwrap();
        assert_eq!(json, r#"{"every":2,"daysOfWeek":[1,3,5]}"#);

        let decoded = Recurrence::from_parts(RecurrenceKind::Weekly, Some(&json)).unwrap();
        assert_eq!(decoded, recurrence);
    }

    #[test]
    fn test_none_has_no_pattern() {
        assert_eq!(Recurrence::None.pattern_json().unwrap(), None);
        assert_eq!(
            Recurrence::from_parts(RecurrenceKind::None, None).unwrap(),
            Recurrence::None
        );
    }

    #[test]
    fn test_missing_pattern_defaults_to_every_one() {
        let decoded = Recurrence::from_parts(RecurrenceKind::Daily, None).unwrap();
        assert_eq!(decoded, Recurrence::Daily { every: 1 });

        let decoded = Recurrence::from_parts(RecurrenceKind::Monthly, Some("")).unwrap();
        assert_eq!(
            decoded,
            Recurrence::Monthly {
                every: 1,
                day_of_month: None
            }
        );
    }

    #[test]
    fn test_custom_pattern_is_opaque() {
        let raw = r#"{"shifts":["morning","night"]}"#;
        let decoded = Recurrence::from_parts(RecurrenceKind::Custom, Some(raw)).unwrap();
        match &decoded {
            Recurrence::Custom { pattern } => assert_eq!(pattern["shifts"][1], "night"),
            other => panic!("expected custom, got {:?}", other),
        }
        assert_eq!(decoded.kind(), RecurrenceKind::Custom);
    }

    #[test]
    fn test_malformed_pattern_is_an_error() {
        assert!(Recurrence::from_parts(RecurrenceKind::Weekly, Some("{every:")).is_err());
    }

    #[test]
    fn test_every_kind_decodes_to_itself() {
        for kind in RecurrenceKind::ALL {
            let decoded = Recurrence::from_parts(*kind, None).unwrap();
            assert_eq!(decoded.kind(), *kind);
        }
        assert_eq!(
            Recurrence::from_parts(RecurrenceKind::Custom, None).unwrap(),
            Recurrence::Custom {
                pattern: serde_json::Value::Null
            }
        );
    }

    #[test]
    fn test_validate() {
        assert!(Recurrence::Daily { every: 0 }.validate().is_err());
        assert!(Recurrence::Weekly {
            every: 1,
            days_of_week: vec![0, 2]
        }
        .validate()
        .is_err());
        assert!(Recurrence::Monthly {
            every: 1,
            day_of_month: Some(32)
        }
        .validate()
        .is_err());
        assert!(Recurrence::Weekly {
            every: 1,
            days_of_week: vec![7]
        }
        .validate()
        .is_ok());
    }
}
