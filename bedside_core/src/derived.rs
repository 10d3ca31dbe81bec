//! Body measures derived from demographics.
//!
//! - Ideal body weight (Devine)
//! - Body mass index
//! - Body surface area (Du Bois)
//!
//! A measure whose inputs are missing keeps its previous value.

use crate::{BedRecord, Sex};

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Ideal body weight in kg, rounded to 1 decimal
pub fn ideal_body_weight(height_cm: f64, sex: Sex) -> f64 {
    let base = match sex {
        Sex::Male => 50.0,
        Sex::Female => 45.5,
    };
    round_to(base + 0.91 * (height_cm - 152.4), 1)
}

/// Body mass index in kg/m², rounded to 1 decimal
pub fn body_mass_index(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    round_to(weight_kg / (height_m * height_m), 1)
}

/// Du Bois body surface area in m², rounded to 2 decimals
pub fn body_surface_area(weight_kg: f64, height_cm: f64) -> f64 {
    round_to(
        0.007184 * weight_kg.powf(0.425) * height_cm.powf(0.725),
        2,
    )
}

/// Recompute IBW, BMI and BSA on `record` from its demographics
pub fn recompute(record: &mut BedRecord) {
    let Some(height) = positive(record.height_cm) else {
        tracing::debug!(
            "Bed {}: no height, derived values left unchanged",
            record.bed_id
        );
        return;
    };

    record.ideal_body_weight = Some(ideal_body_weight(height, record.sex));

    if let Some(weight) = positive(record.weight_kg) {
        record.body_mass_index = Some(body_mass_index(weight, height));
        record.body_surface_area = Some(body_surface_area(weight, height));
    }
}
