//! IMEX encoder and catalog loading tests.

use std::fs;

use valvespec_core::{
    catalog::{Catalog, CatalogCategory, CatalogItem},
    config::{ActuationType, EndType, FlangeFace, PressureClass, ValveConfiguration, ValveType},
    imex::{build_imex_code, extract_material_code, CodeConfidence},
};

fn base_config() -> ValveConfiguration {
    let mut config = ValveConfiguration::new();
    config.valve_type = Some(ValveType::Borboleta);
    config.diameter_nps = Some("10".to_string());
    config.pressure_class = Some(PressureClass::C150);
    config.end_type = Some(EndType::Wafer);
    config.body_material = Some("ASTM_A351_CF8M".to_string());
    config.seat_material = Some("RPTFE".to_string());
    config.actuation_type = Some(ActuationType::Eletrico);
    config
}

#[test]
fn butterfly_wafer_encodes_from_catalog() {
    let result = build_imex_code(&Catalog::builtin(), &base_config());
    assert_eq!(result.value, "BTFL.1001.WAF.36L.RP.0L6GL7-NEW");
    assert!(result.is_complete);
    assert_eq!(result.segments.len(), 7); // six positions + suffix segment
}

#[test]
fn segments_carry_source_descriptions() {
    let result = build_imex_code(&Catalog::builtin(), &base_config());
    let size = result.segments.iter().find(|s| s.key == "size_class").unwrap();
    assert_eq!(size.source.as_deref(), Some("10\" #150"));
    let model = result.segments.iter().find(|s| s.key == "model").unwrap();
    assert_eq!(model.source.as_deref(), Some("BORBOLETA"));
}

#[test]
fn catalog_dir_overrides_one_category() {
    let dir = tempfile::tempdir().unwrap();
    let items = vec![CatalogItem {
        code: "BORBOLETA".to_string(),
        imex_code: "BFHP".to_string(),
        label: "Borboleta - High Performance".to_string(),
    }];
    fs::write(
        dir.path().join("valve_models.json"),
        serde_json::to_string(&items).unwrap(),
    )
    .unwrap();
    // Non-catalog files are ignored.
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let catalog = Catalog::load_from_dir(dir.path()).unwrap();
    assert_eq!(
        catalog.imex_code(CatalogCategory::ValveModels, "BORBOLETA"),
        Some("BFHP")
    );
    // Other categories keep their built-in rows.
    assert_eq!(
        catalog.imex_code(CatalogCategory::SeatMaterials, "RPTFE"),
        Some("RP")
    );

    let result = build_imex_code(&catalog, &base_config());
    assert!(result.value.starts_with("BFHP."));
}

#[test]
fn unknown_material_degrades_with_approximate_confidence() {
    let catalog = Catalog::builtin();
    let mut config = base_config();
    config.body_material = Some("Zirconium 702".to_string());

    let result = build_imex_code(&catalog, &config);
    // Encoder never throws; the body position carries the truncated guess.
    assert!(result.is_complete);
    assert!(result.value.contains(".ZIR."));

    let code = extract_material_code(
        "Zirconium 702",
        catalog.items(CatalogCategory::BodyMaterials),
        &[],
    )
    .unwrap();
    assert_eq!(code.confidence, CodeConfidence::Approximate);
}

#[test]
fn flange_face_variants_use_face_specific_codes() {
    let catalog = Catalog::builtin();
    let mut config = base_config();
    config.end_type = Some(EndType::Flangeado);

    for (face, expected) in [
        (FlangeFace::Rf, "FRF"),
        (FlangeFace::Rtj, "RTJ"),
        (FlangeFace::Ff, "FFF"),
    ] {
        config.flange_face = Some(face);
        let result = build_imex_code(&catalog, &config);
        let connection: Vec<&str> = result.value.split('.').collect();
        assert_eq!(connection[2], expected);
    }
}

#[test]
fn build_result_serializes_for_the_ui() {
    let result = build_imex_code(&Catalog::builtin(), &ValveConfiguration::new());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["isComplete"], serde_json::json!(false));
    assert!(json["missing"].as_array().unwrap().len() >= 6);
}
