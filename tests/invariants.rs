//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable fail-closed guarantees.

use uuid::Uuid;

use valvespec_core::{
    calc::{calculate_sil, sil_level_for_pfd, SilParameters},
    config::{
        ActuationType, EndType, FireTestOption, FlangeFace, PressureClass, ServiceType, SilLevel,
        SpecStatus, ValveConfiguration, ValveType,
    },
    pipeline::Configurator,
    publication::CheckStatus,
};

fn ball_pipeline_config() -> ValveConfiguration {
    let mut config = ValveConfiguration::new();
    config.valve_type = Some(ValveType::Esfera);
    config.service_type = Some(ServiceType::Pipeline);
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
fn invariant_no_construction_standard_means_invalid() {
    let configurator = Configurator::with_builtin_data().unwrap();

    // No construction norm covers check valves at the wellhead.
    let resolution = configurator
        .resolve_norms(Some(ValveType::Retencao), Some(ServiceType::Wellhead))
        .unwrap();

    assert!(!resolution.is_valid);
    assert!(resolution.construction_standards.is_empty());
    assert!(resolution.materials.body.is_empty());
    // Never a partial or guessed standard.
    assert!(resolution.primary_norm().is_none());
}

#[test]
fn invariant_flanged_without_face_blocks_publication() {
    let configurator = Configurator::with_builtin_data().unwrap();
    let mut config = ball_pipeline_config();
    config.flange_face = None;

    let result = configurator.validate_for_publication(&config, None).unwrap();
    assert!(!result.can_publish);
    let check = result.check("BASIC_002").unwrap();
    assert_eq!(check.status, CheckStatus::Fail);
    assert!(!check.can_bypass);
}

#[test]
fn invariant_imex_encoding_is_idempotent() {
    let configurator = Configurator::with_builtin_data().unwrap();
    let config = ball_pipeline_config();

    let first = configurator.build_imex_code(&config);
    let second = configurator.build_imex_code(&config);
    assert_eq!(first, second);
}

#[test]
fn invariant_completeness_is_monotonic() {
    let configurator = Configurator::with_builtin_data().unwrap();
    let complete = ball_pipeline_config();

    // Degrade the complete config one field at a time; restoring a field
    // never grows the missing list and never flips complete -> incomplete.
    let mut partial = complete.clone();
    partial.seat_material = None;
    partial.actuation_type = None;

    let before = configurator.build_imex_code(&partial);

    partial.seat_material = complete.seat_material.clone();
    let after = configurator.build_imex_code(&partial);
    assert!(after.missing.len() <= before.missing.len());

    partial.actuation_type = complete.actuation_type;
    let restored = configurator.build_imex_code(&partial);
    assert!(restored.missing.len() <= after.missing.len());
    assert!(restored.is_complete);
}

#[test]
fn invariant_size_class_roundtrip() {
    use valvespec_core::imex::encode_size_class;

    assert_eq!(
        encode_size_class("2", PressureClass::C600).as_deref(),
        Some("0206")
    );
    assert_eq!(
        encode_size_class("1 1/2", PressureClass::C150).as_deref(),
        Some("0151")
    );
    assert_eq!(
        encode_size_class("3/4", PressureClass::C2500).as_deref(),
        Some("008Y")
    );
}

#[test]
fn invariant_sil_band_boundaries() {
    // Inclusive on the SIL3 floor.
    assert_eq!(sil_level_for_pfd(0.0001), Some(SilLevel::Sil3));
    // Exclusive on the SIL1 ceiling.
    assert_eq!(sil_level_for_pfd(0.1), None);
}

#[test]
fn invariant_fire_test_gate_beats_completeness() {
    let configurator = Configurator::with_builtin_data().unwrap();
    let mut config = ball_pipeline_config();
    config.fire_test = Some(FireTestOption::TestadaAFogo);

    let result = configurator.validate_for_publication(&config, None).unwrap();
    assert_eq!(result.check("FIRE_001").unwrap().status, CheckStatus::Fail);
    assert!(!result.can_publish);

    // Completeness of every other field does not help.
    let build = configurator.build_imex_code(&config);
    assert!(build.is_complete);
}

#[test]
fn scenario_ball_pipeline_encodes_and_publishes() {
    let configurator = Configurator::with_builtin_data().unwrap();
    let config = ball_pipeline_config();

    let build = configurator.build_imex_code(&config);
    assert!(build.value.starts_with("TRUF.0806.FRF"), "got {}", build.value);
    let (body, suffix) = build.value.rsplit_once('-').unwrap();
    assert_eq!(suffix, "NEW");
    assert_eq!(body.split('.').count(), 6);
    assert!(build.is_complete);

    let result = configurator.validate_for_publication(&config, None).unwrap();
    assert!(result.can_publish, "blocked by {:?}", result.blocked_by);
    assert_eq!(result.coverage_percent, 100.0);
}

#[test]
fn scenario_fire_test_flips_the_same_config_to_blocked() {
    let configurator = Configurator::with_builtin_data().unwrap();
    let mut config = ball_pipeline_config();
    config.fire_test = Some(FireTestOption::TestadaAFogo);

    let result = configurator.validate_for_publication(&config, None).unwrap();
    assert!(!result.can_publish);
    assert!(result.blocked_by.contains(&"FIRE_001".to_string()));
}

#[test]
fn invariant_publish_always_validates() {
    let mut configurator = Configurator::with_builtin_data().unwrap();
    let mut config = ball_pipeline_config();
    config.flange_face = None;

    let outcome = configurator
        .publish(Uuid::new_v4(), &config, None)
        .unwrap();
    assert!(!outcome.success);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("face")));
}

#[test]
fn invariant_pending_sil_blocks_but_assessment_unblocks() {
    let mut configurator = Configurator::with_builtin_data().unwrap();
    let mut config = ball_pipeline_config();
    config.sil_certification = Some(SilLevel::Sil2);

    let pending = configurator.validate_for_publication(&config, None).unwrap();
    assert_eq!(pending.check("SIL_001").unwrap().status, CheckStatus::Pending);
    assert!(!pending.can_publish);

    // Tight proof-test interval brings PFDavg into the SIL2 band.
    let assessment = calculate_sil(
        &SilParameters {
            lambda_du: 1.0e-6,
            test_interval_hours: 8760.0,
            ..Default::default()
        },
        Some(SilLevel::Sil2),
    );
    assert!(assessment.meets_required);

    let outcome = configurator
        .publish(Uuid::new_v4(), &config, Some(&assessment))
        .unwrap();
    assert!(outcome.success);
    let spec_code = outcome.spec_code.unwrap();
    assert!(spec_code.starts_with("IMEX-ESFERA-"));
}

#[test]
fn invariant_save_never_loses_work() {
    let configurator = Configurator::with_builtin_data().unwrap();

    // Empty drafts are saveable, flagged INCOMPLETO.
    let record = configurator.prepare_for_save(&ValveConfiguration::new(), None);
    assert_eq!(record.status, SpecStatus::Incompleto);
    assert!(!record.missing_fields.is_empty());

    // Only the publish transition is gated.
    let record = configurator.prepare_for_save(&ball_pipeline_config(), None);
    assert_eq!(record.status, SpecStatus::Draft);
}
