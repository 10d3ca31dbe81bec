//! Core domain types for the bedside record store.
//!
//! This module defines:
//! - Bed records with demographics and derived body measures
//! - The fixed-shape clinical groups attached to every record
//! - Shift notes and their priority

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Deserialize `null` the same way as a missing value.
///
/// Older stored records carry `null` where a group or enum was added later.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Demographics
// ============================================================================

/// Biological sex used by the ideal-body-weight formula
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    #[serde(alias = "M", alias = "m")]
    Male,
    #[serde(alias = "V", alias = "v", alias = "F", alias = "f")]
    Female,
}

// ============================================================================
// Clinical Groups
// ============================================================================

/// Blood gas and oxygen transport values
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GasExchange {
    /// Inspired oxygen fraction in percent
    pub fio2: Option<f64>,
    /// kPa
    pub pao2: Option<f64>,
    /// kPa
    pub paco2: Option<f64>,
    /// Arterial saturation in percent
    pub sao2: Option<f64>,
    /// Hemoglobin
    pub hb: Option<f64>,
    /// Mixed venous saturation in percent
    pub svo2: Option<f64>,
}

/// Breathing pattern and capnography
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Breathing {
    pub respiratory_rate: Option<f64>,
    pub etco2: Option<f64>,
    /// RCexp in seconds
    pub expiratory_time_constant: Option<f64>,
}

/// PiCCO hemodynamic values
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Hemodynamics {
    pub ci: Option<f64>,
    pub svr: Option<f64>,
    pub gedi: Option<f64>,
    pub elwi: Option<f64>,
    pub map: Option<f64>,
    pub gef: Option<f64>,
}

/// Renal function values
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Renal {
    /// µmol/L
    pub creatinine: Option<f64>,
    pub urea: Option<f64>,
    /// ml per 24 hours
    pub urine_24h: Option<f64>,
}

/// Controlled-mode ventilator settings and measurements
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ControlledVentilation {
    /// Tidal volume in ml
    pub vt: Option<f64>,
    pub rr: Option<f64>,
    pub peep: Option<f64>,
    pub pplat: Option<f64>,
    pub ppeak: Option<f64>,
    pub resistance: Option<f64>,
    pub paco2: Option<f64>,
    pub peco2: Option<f64>,
}

/// Results computed by the ventilation screen
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct VentilationResults {
    pub driving_pressure: Option<f64>,
    pub cstat: Option<f64>,
    pub cdyn: Option<f64>,
    pub mechanical_power: Option<f64>,
    pub vt_per_kg: Option<f64>,
    pub time_constant: Option<f64>,
    pub vd_vt: Option<f64>,
}

/// Spontaneous-breathing (weaning) occlusion measurements
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SpontaneousBreathing {
    pub ppeak: Option<f64>,
    pub peep_total: Option<f64>,
    pub pnadir: Option<f64>,
    pub pocc: Option<f64>,
    pub pmus: Option<f64>,
    pub ptp: Option<f64>,
}

/// All ventilation data for a bed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Ventilation {
    #[serde(deserialize_with = "null_as_default")]
    pub controlled: ControlledVentilation,
    #[serde(deserialize_with = "null_as_default")]
    pub calculated: VentilationResults,
    #[serde(deserialize_with = "null_as_default")]
    pub spontaneous: SpontaneousBreathing,
}

// ============================================================================
// Bed Record
// ============================================================================

/// Everything recorded for the occupant of one ICU bed.
///
/// Groups are plain structs, so a loaded record always has every group;
/// stored JSON that lacks a group (or has `null`) gets the all-null default.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BedRecord {
    pub bed_id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Years; fractional ages from older records are kept as stored
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sex: Sex,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,

    #[serde(default)]
    pub ideal_body_weight: Option<f64>,
    #[serde(default)]
    pub body_mass_index: Option<f64>,
    #[serde(default)]
    pub body_surface_area: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub gas_exchange: GasExchange,
    #[serde(default, deserialize_with = "null_as_default")]
    pub breathing: Breathing,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hemodynamics: Hemodynamics,
    #[serde(default, deserialize_with = "null_as_default")]
    pub renal: Renal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ventilation: Ventilation,
}

impl BedRecord {
    /// A record with every field empty
    pub fn empty(bed_id: impl Into<String>) -> Self {
        Self {
            bed_id: bed_id.into(),
            name: String::new(),
            age: None,
            sex: Sex::default(),
            weight_kg: None,
            height_cm: None,
            ideal_body_weight: None,
            body_mass_index: None,
            body_surface_area: None,
            gas_exchange: GasExchange::default(),
            breathing: Breathing::default(),
            hemodynamics: Hemodynamics::default(),
            renal: Renal::default(),
            ventilation: Ventilation::default(),
        }
    }

    /// Reset every field to its default while keeping the bed id
    pub fn clear(&mut self) {
        let bed_id = std::mem::take(&mut self.bed_id);
        *self = Self::empty(bed_id);
    }

    /// True when no demographic has been entered
    pub fn is_vacant(&self) -> bool {
        self.name.is_empty()
            && self.age.is_none()
            && self.weight_kg.is_none()
            && self.height_cm.is_none()
    }
}

// ============================================================================
// Shift Notes
// ============================================================================

/// Priority of a shift note
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotePriority {
    #[default]
    Low,
    High,
}

/// A clinical to-do attached to a bed, optionally with a reminder
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShiftNote {
    pub id: Uuid,
    pub bed_id: String,
    pub content: String,
    #[serde(default)]
    pub priority: NotePriority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A reminder waiting to be shown to the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub triggered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_group_is_backfilled() {
        let json = r#"{
            "bed_id": "2-1",
            "name": "J. Jansen",
            "weight_kg": 72.0,
            "gas_exchange": { "fio2": 40.0 }
        }"#;

        let record: BedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "J. Jansen");
        assert_eq!(record.weight_kg, Some(72.0));
        assert_eq!(record.gas_exchange.fio2, Some(40.0));
        assert_eq!(record.gas_exchange.pao2, None);
        assert_eq!(record.renal, Renal::default());
        assert_eq!(record.ventilation, Ventilation::default());
    }

    #[test]
    fn test_null_group_is_backfilled() {
        let json = r#"{ "bed_id": "5", "hemodynamics": null, "sex": null,
                        "ventilation": { "controlled": null } }"#;

        let record: BedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.hemodynamics, Hemodynamics::default());
        assert_eq!(record.sex, Sex::Male);
        assert_eq!(record.ventilation.controlled, ControlledVentilation::default());
    }

    #[test]
    fn test_legacy_sex_codes() {
        let male: Sex = serde_json::from_str(r#""M""#).unwrap();
        let female: Sex = serde_json::from_str(r#""V""#).unwrap();
        assert_eq!(male, Sex::Male);
        assert_eq!(female, Sex::Female);
    }

    #[test]
    fn test_clear_keeps_bed_id() {
        let mut record = BedRecord::empty("3-1");
        record.name = "Test".into();
        record.renal.creatinine = Some(120.0);
        record.ventilation.controlled.peep = Some(8.0);

        record.clear();

        assert_eq!(record, BedRecord::empty("3-1"));
        assert!(record.is_vacant());
    }
}
