//! Closed-form ICU physiology calculators.
//!
//! Pressures are in kPa for gases and cmH2O for the ventilator, volumes in
//! ml unless stated otherwise. A calculation that would divide by zero
//! returns `None`.

use crate::BedRecord;
use serde::Serialize;

/// Barometric pressure at sea level, kPa
const BAROMETRIC_KPA: f64 = 101.3;
/// Water vapour pressure at 37 °C, kPa
const WATER_VAPOUR_KPA: f64 = 6.3;
const RESPIRATORY_QUOTIENT: f64 = 0.8;

fn nonzero(value: f64) -> Option<f64> {
    (value != 0.0 && value.is_finite()).then_some(value)
}

// ============================================================================
// Oxygenation
// ============================================================================

/// Alveolar oxygen pressure from the alveolar gas equation
pub fn alveolar_po2(fio2_percent: f64, paco2: f64) -> f64 {
    (BAROMETRIC_KPA - WATER_VAPOUR_KPA) * (fio2_percent / 100.0) - paco2 / RESPIRATORY_QUOTIENT
}

pub fn aa_gradient(alveolar_po2: f64, pao2: f64) -> f64 {
    alveolar_po2 - pao2
}

/// Expected A-a gradient for age (kPa)
pub fn expected_aa_gradient(age_years: f64) -> f64 {
    2.0 + age_years * 0.03
}

pub fn aa_ratio(pao2: f64, alveolar_po2: f64) -> Option<f64> {
    nonzero(alveolar_po2).map(|pa| pao2 / pa)
}

/// Arterial oxygen content
pub fn oxygen_content(hb: f64, sao2_percent: f64, pao2: f64) -> f64 {
    hb * 1.34 * (sao2_percent / 100.0) + pao2 * 0.0225
}

/// Approximate FiO2 (percent) delivered by a nasal cannula
pub fn nasal_cannula_fio2(litres_per_minute: f64) -> f64 {
    20.0 + 4.0 * litres_per_minute
}

/// PaO2/FiO2 ratio with FiO2 in percent
pub fn pf_ratio(pao2: f64, fio2_percent: f64) -> Option<f64> {
    nonzero(fio2_percent).map(|f| pao2 / (f / 100.0))
}

/// ROX index: (SpO2 / FiO2) / respiratory rate
pub fn rox_index(spo2_percent: f64, fio2_percent: f64, respiratory_rate: f64) -> Option<f64> {
    let fio2 = nonzero(fio2_percent)? / 100.0;
    let rr = nonzero(respiratory_rate)?;
    Some((spo2_percent / fio2) / rr)
}

// ============================================================================
// Ventilation Mechanics
// ============================================================================

/// Static compliance; `None` if plateau pressure does not exceed PEEP
pub fn static_compliance(vt: f64, pplat: f64, peep: f64) -> Option<f64> {
    let driving = pplat - peep;
    (driving > 0.0).then(|| vt / driving)
}

/// Dynamic compliance; `None` if peak pressure does not exceed PEEP
pub fn dynamic_compliance(vt: f64, ppeak: f64, peep: f64) -> Option<f64> {
    let driving = ppeak - peep;
    (driving > 0.0).then(|| vt / driving)
}

/// Dead-space fraction (Bohr-Enghoff)
pub fn dead_space_fraction(paco2: f64, peco2: f64) -> Option<f64> {
    nonzero(paco2).map(|pa| (pa - peco2) / pa)
}

/// Time constant in seconds from compliance (ml/cmH2O) and resistance
pub fn time_constant(compliance_ml: f64, resistance: f64) -> f64 {
    (compliance_ml / 1000.0) * resistance
}

/// Mechanical power in J/min (simplified Gattinoni)
pub fn mechanical_power(vt_ml: f64, rr: f64, ppeak: f64, pplat: f64, peep: f64) -> f64 {
    let driving = pplat - peep;
    0.098 * rr * (vt_ml / 1000.0) * (ppeak - 0.5 * driving)
}

/// Predicted muscle pressure from an occlusion manoeuvre
pub fn muscle_pressure(pnadir: f64, peep: f64) -> f64 {
    -0.75 * (pnadir - peep)
}

/// Predicted transpulmonary pressure from an occlusion manoeuvre
pub fn transpulmonary_pressure(ppeak: f64, peep: f64, pnadir: f64) -> f64 {
    let driving = ppeak - peep;
    let occlusion = pnadir - peep;
    driving - (2.0 / 3.0) * occlusion
}

/// Lung mechanics class by expiratory time constant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LungClass {
    Restrictive,
    Normal,
    Obstructive,
}

/// Classification plus the expiratory time needed for full exhalation
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LungProfile {
    pub class: LungClass,
    pub required_expiratory_time: f64,
}

pub fn lung_profile(rc_exp: f64) -> LungProfile {
    let class = if rc_exp < 0.6 {
        LungClass::Restrictive
    } else if rc_exp > 0.9 {
        LungClass::Obstructive
    } else {
        LungClass::Normal
    };
    LungProfile {
        class,
        required_expiratory_time: rc_exp * 3.0,
    }
}

/// Otis least-work respiratory frequency for a given RCexp
pub fn otis_frequency(rc_exp: f64) -> Option<f64> {
    const A: f64 = 0.33;
    const MINUTE_VOLUME_ML: f64 = 8000.0;
    const DEAD_SPACE_ML: f64 = 150.0;

    let factor = A * nonzero(rc_exp)?;
    let numerator = (1.0 + 2.0 * factor * (MINUTE_VOLUME_ML / DEAD_SPACE_ML)).sqrt() - 1.0;
    Some((numerator / factor).round())
}

// ============================================================================
// Hemodynamics
// ============================================================================

pub fn cardiac_index(cardiac_output: f64, bsa: f64) -> Option<f64> {
    nonzero(bsa).map(|b| cardiac_output / b)
}

/// Systemic vascular resistance in dyn·s·cm⁻⁵
pub fn systemic_vascular_resistance(map: f64, cvp: f64, cardiac_output: f64) -> Option<f64> {
    nonzero(cardiac_output).map(|co| ((map - cvp) * 80.0) / co)
}

pub fn svr_index(svr: f64, bsa: f64) -> f64 {
    svr * bsa
}

// ============================================================================
// Metabolic / Renal
// ============================================================================

pub fn anion_gap(na: f64, cl: f64, hco3: f64) -> f64 {
    na - (cl + hco3)
}

/// MDRD eGFR (ml/min/1.73 m²) from creatinine in µmol/L
pub fn mdrd_egfr(creatinine_umol: f64, age_years: f64, female: bool) -> Option<f64> {
    if creatinine_umol <= 0.0 || age_years <= 0.0 {
        return None;
    }
    let creatinine_mg_dl = creatinine_umol / 88.4;
    let sex_factor = if female { 0.742 } else { 1.0 };
    Some(186.0 * creatinine_mg_dl.powf(-1.154) * age_years.powf(-0.203) * sex_factor)
}

/// 24-hour ultrafiltration volume from an hourly rate
pub fn cvvhd_daily_volume(hourly_rate: f64) -> f64 {
    (hourly_rate * 24.0).round()
}

/// Hourly ultrafiltration rate needed for a 24-hour target
pub fn cvvhd_hourly_rate(daily_target: f64) -> f64 {
    (daily_target / 24.0).round()
}

// ============================================================================
// Medication
// ============================================================================

/// Pump rate in ml/h for a dose in mcg/kg/min
pub fn pump_flow(dose: f64, weight_kg: f64, concentration_mcg_ml: f64) -> Option<f64> {
    nonzero(concentration_mcg_ml).map(|c| (dose * weight_kg * 60.0) / c)
}

// ============================================================================
// Per-bed indices
// ============================================================================

/// Indices a calculator screen can show for a bed with what it has on file
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BedIndices {
    pub pf_ratio: Option<f64>,
    pub rox_index: Option<f64>,
    pub driving_pressure: Option<f64>,
    pub static_compliance: Option<f64>,
    pub vt_per_kg_ibw: Option<f64>,
}

impl BedIndices {
    pub fn from_record(record: &BedRecord) -> Self {
        let gas = &record.gas_exchange;
        let vent = &record.ventilation.controlled;

        let pf_ratio = gas
            .pao2
            .zip(gas.fio2)
            .and_then(|(pao2, fio2)| pf_ratio(pao2, fio2));

        let rox_index = match (gas.sao2, gas.fio2, record.breathing.respiratory_rate) {
            (Some(spo2), Some(fio2), Some(rr)) => rox_index(spo2, fio2, rr),
            _ => None,
        };

        let driving_pressure = vent.pplat.zip(vent.peep).map(|(pplat, peep)| pplat - peep);

        let static_compliance = match (vent.vt, vent.pplat, vent.peep) {
            (Some(vt), Some(pplat), Some(peep)) => static_compliance(vt, pplat, peep),
            _ => None,
        };

        let vt_per_kg_ibw = vent
            .vt
            .zip(record.ideal_body_weight)
            .and_then(|(vt, ibw)| nonzero(ibw).map(|ibw| vt / ibw));

        Self {
            pf_ratio,
            rox_index,
            driving_pressure,
            static_compliance,
            vt_per_kg_ibw,
        }
    }
}
