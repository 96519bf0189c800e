//! Auxiliary Calculators - torque sizing and SIL/PFDavg
//!
//! Deliberately simplified closed-form formulas, swappable behind the
//! pipeline surface. Pure and deterministic.

use serde::{Deserialize, Serialize};

use crate::config::SilLevel;
use crate::norms::NormPack;

const DEFAULT_TORQUE_COEFFICIENT: f64 = 0.15;

/// Recommended operating torque with min/max band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TorqueEstimate {
    pub min_torque: f64,
    pub max_torque: f64,
    pub recommended: f64,
    pub unit: String,
    pub formula: String,
}

/// `T = mu x D^e x (1 + f x P)`, banded to [0.9, safety margin].
/// Coefficients and constants come from the active pack.
pub fn calculate_torque(
    pack: &NormPack,
    valve_size_inches: f64,
    pressure_class_rating: u32,
    seat_material: &str,
) -> TorqueEstimate {
    let coefficient = pack
        .torque_coefficients
        .get(seat_material)
        .copied()
        .unwrap_or(DEFAULT_TORQUE_COEFFICIENT);
    let constants = &pack.torque_constants;

    let base = coefficient
        * valve_size_inches.powf(constants.size_exponent)
        * (1.0 + constants.pressure_factor * pressure_class_rating as f64);

    TorqueEstimate {
        min_torque: (base * 0.9).round(),
        max_torque: (base * constants.safety_margin).round(),
        recommended: base.round(),
        unit: "Nm".to_string(),
        formula: format!(
            "T = mu x D^{} x (1 + {} x P)",
            constants.size_exponent, constants.pressure_factor
        ),
    }
}

/// Inputs for the simplified IEC 61508 1oo1 PFDavg formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct SilParameters {
    /// Dangerous undetected failure rate, per hour.
    pub lambda_du: f64,
    /// Proof test interval, hours.
    pub test_interval_hours: f64,
    /// Mean time to repair, hours.
    pub mttr_hours: f64,
    /// Common cause factor.
    pub beta: f64,
}

impl Default for SilParameters {
    fn default() -> Self {
        Self {
            lambda_du: 5.0e-6,
            test_interval_hours: 8760.0,
            mttr_hours: 8.0,
            beta: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SilAssessment {
    pub pfd_avg: f64,
    /// None when PFDavg falls outside every SIL band.
    pub achieved: Option<SilLevel>,
    pub risk_reduction_factor: f64,
    pub meets_required: bool,
}

/// SIL band for a PFDavg value. Band lower bounds are inclusive; values
/// below the SIL3 floor still rate SIL3, values at or above 0.1 rate none.
pub fn sil_level_for_pfd(pfd_avg: f64) -> Option<SilLevel> {
    if pfd_avg < 0.001 {
        Some(SilLevel::Sil3)
    } else if pfd_avg < 0.01 {
        Some(SilLevel::Sil2)
    } else if pfd_avg < 0.1 {
        Some(SilLevel::Sil1)
    } else {
        None
    }
}

/// `PFDavg = (lambda_du x TI)/2 + beta x lambda_du x TI + lambda_du x MTTR`
pub fn calculate_sil(parameters: &SilParameters, required: Option<SilLevel>) -> SilAssessment {
    let SilParameters {
        lambda_du,
        test_interval_hours: ti,
        mttr_hours,
        beta,
    } = *parameters;

    let pfd_avg = (lambda_du * ti) / 2.0 + beta * lambda_du * ti + lambda_du * mttr_hours;
    let achieved = sil_level_for_pfd(pfd_avg);
    let risk_reduction_factor = if pfd_avg > 0.0 { 1.0 / pfd_avg } else { f64::INFINITY };

    let meets_required = match required {
        None | Some(SilLevel::Na) => true,
        Some(required) => achieved.map_or(false, |a| a.tier() >= required.tier()),
    };

    SilAssessment {
        pfd_avg,
        achieved,
        risk_reduction_factor,
        meets_required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torque_scales_with_size_and_class() {
        let pack = NormPack::builtin();
        let small = calculate_torque(&pack, 2.0, 150, "PTFE");
        let large = calculate_torque(&pack, 8.0, 600, "PTFE");
        assert!(large.recommended > small.recommended);
        assert!(small.min_torque < small.recommended);
        assert!(small.recommended < small.max_torque);
        assert_eq!(small.unit, "Nm");
    }

    #[test]
    fn unknown_seat_material_uses_default_coefficient() {
        let pack = NormPack::builtin();
        let unknown = calculate_torque(&pack, 4.0, 300, "UNOBTAINIUM");
        let nylon = calculate_torque(&pack, 4.0, 300, "NYLON");
        // NYLON carries the default coefficient in the builtin pack.
        assert_eq!(unknown.recommended, nylon.recommended);
    }

    #[test]
    fn sil_band_boundaries() {
        assert_eq!(sil_level_for_pfd(0.00005), Some(SilLevel::Sil3));
        // SIL3 floor is inclusive.
        assert_eq!(sil_level_for_pfd(0.0001), Some(SilLevel::Sil3));
        assert_eq!(sil_level_for_pfd(0.001), Some(SilLevel::Sil2));
        assert_eq!(sil_level_for_pfd(0.01), Some(SilLevel::Sil1));
        // SIL1 ceiling is exclusive.
        assert_eq!(sil_level_for_pfd(0.1), None);
        assert_eq!(sil_level_for_pfd(0.5), None);
    }

    #[test]
    fn default_parameters_achieve_sil1() {
        let assessment = calculate_sil(&SilParameters::default(), Some(SilLevel::Sil1));
        // 5e-6 * 8760 / 2 + 0.1 * 5e-6 * 8760 + 5e-6 * 8 = ~0.0263
        assert!(assessment.pfd_avg > 0.01 && assessment.pfd_avg < 0.1);
        assert_eq!(assessment.achieved, Some(SilLevel::Sil1));
        assert!(assessment.meets_required);

        let strict = calculate_sil(&SilParameters::default(), Some(SilLevel::Sil3));
        assert!(!strict.meets_required);
    }

    #[test]
    fn na_requirement_always_met() {
        let assessment = calculate_sil(
            &SilParameters {
                lambda_du: 1.0,
                ..Default::default()
            },
            Some(SilLevel::Na),
        );
        assert_eq!(assessment.achieved, None);
        assert!(assessment.meets_required);
    }
}
