//! Fail-Closed Publication Validator
//!
//! A fixed, ordered sequence of named checks. No check can be bypassed;
//! a draft publishes only when nothing FAILs and nothing is PENDING.

use serde::{Deserialize, Serialize};

use crate::calc::SilAssessment;
use crate::config::ValveConfiguration;
use crate::norms::{
    NormPack, FIRE_TEST_NORM, FLANGE_NORM, LOW_EMISSION_NORM, NACE_NORM, SIL_NORM,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
    Pending,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicationCheck {
    pub id: String,
    pub rule: String,
    pub status: CheckStatus,
    pub message: String,
    pub source_norm: Option<String>,
    /// Always false; there is no bypass-with-approval flow.
    pub can_bypass: bool,
}

impl PublicationCheck {
    fn new(id: &str, rule: &str, status: CheckStatus, message: String) -> Self {
        Self {
            id: id.to_string(),
            rule: rule.to_string(),
            status,
            message,
            source_norm: None,
            can_bypass: false,
        }
    }

    fn with_norm(mut self, norm: &str) -> Self {
        self.source_norm = Some(norm.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicationResult {
    pub can_publish: bool,
    pub coverage_percent: f64,
    pub checks: Vec<PublicationCheck>,
    /// Ids of every check blocking publication (FAIL and PENDING).
    pub blocked_by: Vec<String>,
    pub applicable_norms: Vec<String>,
}

impl PublicationResult {
    pub fn check(&self, id: &str) -> Option<&PublicationCheck> {
        self.checks.iter().find(|c| c.id == id)
    }
}

// Seats that never pass API 607 fire testing, regardless of catalog data.
const POLYMER_SEATS: [&str; 3] = ["PTFE", "NYLON", "PEEK"];

/// The single gate the submit action must call. Runs the full check
/// sequence against the snapshot; `can_publish` is the sole authority for
/// enabling publication.
pub fn validate_for_publication(
    pack: &NormPack,
    config: &ValveConfiguration,
    sil: Option<&SilAssessment>,
) -> PublicationResult {
    let mut checks: Vec<PublicationCheck> = Vec::new();
    let mut applicable_norms: Vec<String> = Vec::new();

    let primary_code = config.construction_standard.as_deref().unwrap_or("");
    if !primary_code.is_empty() {
        applicable_norms.push(primary_code.to_string());
    }

    // 1. Primary construction norm exists.
    match pack.get(primary_code) {
        Some(norm) => checks.push(
            PublicationCheck::new(
                "NORM_001",
                "Primary construction norm",
                CheckStatus::Pass,
                format!("{} - {}", norm.code, norm.title),
            )
            .with_norm(&norm.code),
        ),
        None => checks.push(PublicationCheck::new(
            "NORM_001",
            "Primary construction norm",
            CheckStatus::Fail,
            "Primary norm not found in the active catalog".to_string(),
        )),
    }

    // 2. Basic fields.
    let missing_basic: Vec<&str> = [
        (config.diameter_nps.is_none(), "diameterNPS"),
        (config.pressure_class.is_none(), "pressureClass"),
        (config.end_type.is_none(), "endType"),
    ]
    .iter()
    .filter(|(missing, _)| *missing)
    .map(|(_, name)| *name)
    .collect();
    if missing_basic.is_empty() {
        checks.push(PublicationCheck::new(
            "BASIC_001",
            "Mandatory basic fields",
            CheckStatus::Pass,
            "All basic fields filled".to_string(),
        ));
    } else {
        checks.push(PublicationCheck::new(
            "BASIC_001",
            "Mandatory basic fields",
            CheckStatus::Fail,
            format!("Missing fields: {}", missing_basic.join(", ")),
        ));
    }

    // 3. Flange face when flanged. Not evaluated at all for other ends;
    // absence of the check is equivalent to pass.
    if config.requires_flange_face() {
        let check = match config.flange_face {
            Some(face) => PublicationCheck::new(
                "BASIC_002",
                "Flange face selection",
                CheckStatus::Pass,
                format!("Face {} selected", face.code()),
            ),
            None => PublicationCheck::new(
                "BASIC_002",
                "Flange face selection",
                CheckStatus::Fail,
                "Flanged ends require a face selection".to_string(),
            ),
        };
        checks.push(check.with_norm(FLANGE_NORM));
        push_norm(&mut applicable_norms, FLANGE_NORM);
    }

    // 4. All four materials chosen.
    let missing_materials: Vec<&str> = [
        (config.body_material.is_none(), "bodyMaterial"),
        (config.obturator_material.is_none(), "obturatorMaterial"),
        (config.seat_material.is_none(), "seatMaterial"),
        (config.stem_material.is_none(), "stemMaterial"),
    ]
    .iter()
    .filter(|(missing, _)| *missing)
    .map(|(_, name)| *name)
    .collect();
    if missing_materials.is_empty() {
        checks.push(PublicationCheck::new(
            "MAT_001",
            "Mandatory materials",
            CheckStatus::Pass,
            "All materials selected".to_string(),
        ));
    } else {
        checks.push(PublicationCheck::new(
            "MAT_001",
            "Mandatory materials",
            CheckStatus::Fail,
            format!("Missing materials: {}", missing_materials.join(", ")),
        ));
    }

    // 5. NACE qualification of the body material.
    if config.nace_compliant {
        push_norm(&mut applicable_norms, NACE_NORM);
        let body = config.body_material.as_deref().unwrap_or("");
        let qualification = pack
            .get(NACE_NORM)
            .and_then(|n| n.material_qualifications.get(body));
        let check = match qualification {
            Some(q) if q.qualified => PublicationCheck::new(
                "NACE_001",
                "NACE body qualification",
                CheckStatus::Pass,
                format!(
                    "Material {body} qualified (max {})",
                    q.max_hardness.as_deref().unwrap_or("n/a")
                ),
            ),
            Some(q) => PublicationCheck::new(
                "NACE_001",
                "NACE body qualification",
                CheckStatus::Fail,
                format!(
                    "Material {body} not NACE qualified: {}",
                    q.reason.as_deref().unwrap_or("check the norm")
                ),
            ),
            // Unknown material: fail closed.
            None => PublicationCheck::new(
                "NACE_001",
                "NACE body qualification",
                CheckStatus::Fail,
                format!("Material {body} has no NACE qualification record"),
            ),
        };
        checks.push(check.with_norm(NACE_NORM));
    }

    // 6. Fire-test seat compatibility. Polymer seats are disallowed
    // outright, regardless of catalog data.
    if config.fire_test_required() {
        push_norm(&mut applicable_norms, FIRE_TEST_NORM);
        let seat = config.seat_material.as_deref().unwrap_or("");
        let check = if POLYMER_SEATS.contains(&seat) {
            PublicationCheck::new(
                "FIRE_001",
                "Fire test compatibility",
                CheckStatus::Fail,
                format!("Seat {seat} not admitted for fire test"),
            )
        } else {
            PublicationCheck::new(
                "FIRE_001",
                "Fire test compatibility",
                CheckStatus::Pass,
                format!("Seat {seat} compatible with fire test"),
            )
        };
        checks.push(check.with_norm(FIRE_TEST_NORM));
    }

    // 7. Low fugitive emission.
    // TODO: material gating for ISO 15848-1 stem seals is not implemented;
    // the check passes once the flag is set.
    if config.low_fugitive_emission {
        push_norm(&mut applicable_norms, LOW_EMISSION_NORM);
        checks.push(
            PublicationCheck::new(
                "EMIT_001",
                "ISO 15848 requirements",
                CheckStatus::Pass,
                "Configuration compatible with low fugitive emission".to_string(),
            )
            .with_norm(LOW_EMISSION_NORM),
        );
    }

    // 8. SIL. Requires an explicit PFDavg assessment; pending still blocks.
    if let Some(required) = config.sil_required() {
        push_norm(&mut applicable_norms, SIL_NORM);
        let check = match sil {
            None => PublicationCheck::new(
                "SIL_001",
                &format!("{} requirements", required.code()),
                CheckStatus::Pending,
                "Requires a PFDavg calculation".to_string(),
            ),
            Some(assessment) if assessment.meets_required => PublicationCheck::new(
                "SIL_001",
                &format!("{} requirements", required.code()),
                CheckStatus::Pass,
                format!(
                    "PFDavg {:.2e} achieves {}",
                    assessment.pfd_avg,
                    assessment
                        .achieved
                        .map(|l| l.code())
                        .unwrap_or("no SIL level")
                ),
            ),
            Some(assessment) => PublicationCheck::new(
                "SIL_001",
                &format!("{} requirements", required.code()),
                CheckStatus::Fail,
                format!(
                    "PFDavg {:.2e} does not meet {}",
                    assessment.pfd_avg,
                    required.code()
                ),
            ),
        };
        checks.push(check.with_norm(SIL_NORM));
    }

    // 9. Actuation type.
    match config.actuation_type {
        Some(actuation) => checks.push(PublicationCheck::new(
            "ACT_001",
            "Actuation type",
            CheckStatus::Pass,
            format!("Actuation {}", actuation.code()),
        )),
        None => checks.push(PublicationCheck::new(
            "ACT_001",
            "Actuation type",
            CheckStatus::Fail,
            "Actuation type not selected".to_string(),
        )),
    }

    let blocked_by: Vec<String> = checks
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::Fail | CheckStatus::Pending))
        .map(|c| c.id.clone())
        .collect();

    let passed = checks.iter().filter(|c| c.status == CheckStatus::Pass).count();
    let coverage_percent = if checks.is_empty() {
        0.0
    } else {
        (passed as f64 / checks.len() as f64) * 100.0
    };

    PublicationResult {
        can_publish: blocked_by.is_empty(),
        coverage_percent,
        checks,
        blocked_by,
        applicable_norms,
    }
}

fn push_norm(norms: &mut Vec<String>, code: &str) {
    if !norms.iter().any(|n| n == code) {
        norms.push(code.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ActuationType, EndType, FireTestOption, FlangeFace, PressureClass, SilLevel, ValveType,
    };

    fn complete_config() -> ValveConfiguration {
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.construction_standard = Some("API_6D".to_string());
        config.diameter_nps = Some("8".to_string());
        config.pressure_class = Some(PressureClass::C600);
        config.end_type = Some(EndType::Flangeado);
        config.flange_face = Some(FlangeFace::Rf);
        config.body_material = Some("ASTM_A216_WCB".to_string());
        config.obturator_material = Some("ASTM_A351_CF8M".to_string());
        config.seat_material = Some("PTFE".to_string());
        config.stem_material = Some("ASTM_A182_F316".to_string());
        config.actuation_type = Some(ActuationType::Manual);
        config
    }

    #[test]
    fn complete_config_publishes() {
        let pack = NormPack::builtin();
        let result = validate_for_publication(&pack, &complete_config(), None);
        assert!(result.can_publish, "blocked by {:?}", result.blocked_by);
        assert_eq!(result.coverage_percent, 100.0);
    }

    #[test]
    fn flanged_without_face_blocks() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.flange_face = None;

        let result = validate_for_publication(&pack, &config, None);
        assert!(!result.can_publish);
        assert_eq!(result.check("BASIC_002").unwrap().status, CheckStatus::Fail);
        assert!(result.blocked_by.contains(&"BASIC_002".to_string()));
    }

    #[test]
    fn non_flanged_skips_face_check() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.end_type = Some(EndType::ButtWeld);
        config.flange_face = None;

        let result = validate_for_publication(&pack, &config, None);
        assert!(result.check("BASIC_002").is_none());
        assert!(result.can_publish);
    }

    #[test]
    fn fire_test_ptfe_seat_fails_even_when_complete() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.fire_test = Some(FireTestOption::TestadaAFogo);

        let result = validate_for_publication(&pack, &config, None);
        assert_eq!(result.check("FIRE_001").unwrap().status, CheckStatus::Fail);
        assert!(!result.can_publish);
        assert!(result.applicable_norms.contains(&FIRE_TEST_NORM.to_string()));
    }

    #[test]
    fn nace_unqualified_body_fails() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.nace_compliant = true; // body stays carbon steel WCB

        let result = validate_for_publication(&pack, &config, None);
        assert_eq!(result.check("NACE_001").unwrap().status, CheckStatus::Fail);
        assert!(!result.can_publish);
    }

    #[test]
    fn sil_without_assessment_is_pending_and_blocks() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.sil_certification = Some(SilLevel::Sil2);

        let result = validate_for_publication(&pack, &config, None);
        let check = result.check("SIL_001").unwrap();
        assert_eq!(check.status, CheckStatus::Pending);
        assert!(!result.can_publish);
        assert!(result.blocked_by.contains(&"SIL_001".to_string()));
        // Pending lowers coverage without counting as pass.
        assert!(result.coverage_percent < 100.0);
    }

    #[test]
    fn sil_with_passing_assessment_publishes() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.sil_certification = Some(SilLevel::Sil2);

        let assessment = SilAssessment {
            pfd_avg: 0.002,
            achieved: Some(SilLevel::Sil2),
            risk_reduction_factor: 500.0,
            meets_required: true,
        };
        let result = validate_for_publication(&pack, &config, Some(&assessment));
        assert_eq!(result.check("SIL_001").unwrap().status, CheckStatus::Pass);
        assert!(result.can_publish);
    }

    #[test]
    fn missing_primary_norm_fails_closed() {
        let pack = NormPack::builtin();
        let mut config = complete_config();
        config.construction_standard = Some("API_9999".to_string());

        let result = validate_for_publication(&pack, &config, None);
        assert_eq!(result.check("NORM_001").unwrap().status, CheckStatus::Fail);
        assert!(!result.can_publish);
    }
}
