//! IMEX Description Builder
//!
//! Pure, deterministic encoder from a configuration snapshot to the
//! canonical product code. Total by construction: unresolved positions
//! degrade to `???` placeholders, material lookups degrade through a
//! fallback chain tagged with a confidence tier, and the function never
//! fails.
//!
//! Format: `MODEL.SIZECLASS.CONNECTION.BODY.TRIM.ACTUATION-SUFFIXES(OBS)`

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogCategory, CatalogItem};
use crate::config::{PressureClass, ValveConfiguration};

pub const SEGMENT_COUNT: usize = 6;
const PLACEHOLDER: &str = "???";

/// Legacy fixed maps kept from the pre-catalog encoder; consulted when the
/// catalog has no entry for a code.
const LEGACY_MODEL_CODES: [(&str, &str); 6] = [
    ("ESFERA", "VE"),
    ("GLOBO", "VG"),
    ("GAVETA", "VGT"),
    ("RETENCAO", "VR"),
    ("BORBOLETA", "VB"),
    ("CONTROLE", "VC"),
];

const LEGACY_END_CODES: [(&str, &str); 6] = [
    ("FLANGEADO", "FL"),
    ("BW", "BW"),
    ("SW", "SW"),
    ("NPT", "TH"),
    ("WAFER", "WF"),
    ("LUG", "LG"),
];

const LEGACY_BODY_CODES: [(&str, &str); 10] = [
    ("ASTM A216 WCB", "WCB"),
    ("ASTM A352 LCC", "LCC"),
    ("ASTM A351 CF8M", "CF8M"),
    ("ASTM A351 CF3M", "CF3M"),
    ("ASTM A995 4A", "DPX"),
    ("ASTM A995 5A", "SDPX"),
    ("ASTM A995 6A", "SDPX"),
    ("ASTM A105", "A105"),
    ("ASTM A182 F316", "F316"),
    ("ASTM A182 F304", "F304"),
];

const LEGACY_SEAT_CODES: [(&str, &str); 10] = [
    ("PTFE", "PT"),
    ("RPTFE", "RPT"),
    ("PEEK", "PK"),
    ("METAL", "MT"),
    ("STELLITE", "ST"),
    ("ENP", "ENP"),
    ("INCONEL", "INC"),
    ("NYLON", "NY"),
    ("DEVLON", "DV"),
    ("GRAFITE", "GR"),
];

const LEGACY_ACTUATION_CODES: [(&str, &str); 4] = [
    ("MANUAL", "MN"),
    ("PNEUMATICO", "PN"),
    ("ELETRICO", "EL"),
    ("HIDRAULICO", "HY"),
];

/// Whether a material code came from the catalog/legacy tables or from a
/// degraded guess (substring match or truncation).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodeConfidence {
    Exact,
    Approximate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialCode {
    pub code: String,
    pub confidence: CodeConfidence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DescriptionSegment {
    pub key: String,
    pub label: String,
    pub value: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub value: String,
    pub segments: Vec<DescriptionSegment>,
    pub missing: Vec<String>,
    pub is_complete: bool,
}

impl BuildResult {
    /// Rounded share of the six positional segments that resolved.
    pub fn completion_percent(&self) -> u32 {
        let missing = self.missing.len().min(SEGMENT_COUNT);
        (((SEGMENT_COUNT - missing) as f64 / SEGMENT_COUNT as f64) * 100.0).round() as u32
    }
}

/// Parses an NPS designation to a decimal inch value.
/// Accepts whole numbers ("2"), decimals ("2.5"), simple fractions ("3/4")
/// and mixed numbers ("1 1/2").
pub fn parse_nps_to_inch(nps: &str) -> Option<f64> {
    let cleaned = nps.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = cleaned.parse::<f64>() {
        return (value.is_finite() && value > 0.0).then_some(value);
    }

    let parse_fraction = |s: &str| -> Option<f64> {
        let (numerator, denominator) = s.split_once('/')?;
        let numerator: f64 = numerator.trim().parse().ok()?;
        let denominator: f64 = denominator.trim().parse().ok()?;
        (denominator > 0.0).then(|| numerator / denominator)
    };

    if let Some((whole, fraction)) = cleaned.split_once(' ') {
        let whole: f64 = whole.trim().parse().ok()?;
        return Some(whole + parse_fraction(fraction.trim())?);
    }

    parse_fraction(cleaned)
}

/// Encodes NPS and pressure class as `NNNX`: three zero-padded digits of
/// NPS x 10 plus the single-character class code.
pub fn encode_size_class(nps: &str, pressure_class: PressureClass) -> Option<String> {
    let inches = parse_nps_to_inch(nps)?;
    let size_code = (inches * 10.0).round() as u64;
    Some(format!("{size_code:03}{}", pressure_class.imex_char()))
}

/// Material code extraction fallback chain: catalog, legacy map,
/// case-insensitive substring, first-3-character truncation. The last two
/// tiers are approximate; the function only returns `None` for blank input.
pub fn extract_material_code(
    raw: &str,
    catalog_items: &[CatalogItem],
    legacy: &[(&str, &str)],
) -> Option<MaterialCode> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(item) = catalog_items.iter().find(|i| i.code == trimmed) {
        return Some(MaterialCode {
            code: item.imex_code.clone(),
            confidence: CodeConfidence::Exact,
        });
    }

    if let Some((_, code)) = legacy.iter().find(|(name, _)| *name == trimmed) {
        return Some(MaterialCode {
            code: (*code).to_string(),
            confidence: CodeConfidence::Exact,
        });
    }

    let upper = trimmed.to_uppercase();
    let contains_either = |candidate: &str| {
        let candidate = candidate.to_uppercase();
        upper.contains(&candidate) || candidate.contains(&upper)
    };
    for item in catalog_items {
        if contains_either(&item.code) || contains_either(&item.label) {
            return Some(MaterialCode {
                code: item.imex_code.clone(),
                confidence: CodeConfidence::Approximate,
            });
        }
    }
    for (name, code) in legacy {
        if contains_either(name) {
            return Some(MaterialCode {
                code: (*code).to_string(),
                confidence: CodeConfidence::Approximate,
            });
        }
    }

    let truncated: String = upper.chars().filter(|c| !c.is_whitespace()).take(3).collect();
    Some(MaterialCode {
        code: truncated,
        confidence: CodeConfidence::Approximate,
    })
}

fn segment(key: &str, label: &str, value: &str, source: Option<String>) -> DescriptionSegment {
    DescriptionSegment {
        key: key.to_string(),
        label: label.to_string(),
        value: value.to_string(),
        source,
    }
}

/// Builds the IMEX description from a configuration snapshot.
pub fn build_imex_code(catalog: &Catalog, config: &ValveConfiguration) -> BuildResult {
    let mut segments: Vec<DescriptionSegment> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut positions: [Option<String>; SEGMENT_COUNT] = Default::default();

    // 1. Model.
    if let Some(valve_type) = config.valve_type {
        let code = catalog
            .imex_code(CatalogCategory::ValveModels, valve_type.code())
            .map(str::to_string)
            .or_else(|| {
                LEGACY_MODEL_CODES
                    .iter()
                    .find(|(k, _)| *k == valve_type.code())
                    .map(|(_, v)| v.to_string())
            });
        match code {
            Some(code) => {
                segments.push(segment("model", "Model", &code, Some(valve_type.code().into())));
                positions[0] = Some(code);
            }
            None => missing.push("valve type".to_string()),
        }
    } else {
        missing.push("valve type".to_string());
    }

    // 2. Size + pressure class; either input missing is reported on its own.
    let size_class = match (config.diameter_nps.as_deref(), config.pressure_class) {
        (Some(nps), Some(class)) => encode_size_class(nps, class),
        _ => None,
    };
    match size_class {
        Some(code) => {
            let source = format!(
                "{}\" #{}",
                config.diameter_nps.as_deref().unwrap_or(""),
                config.pressure_class.map(|c| c.code()).unwrap_or("")
            );
            segments.push(segment("size_class", "Diameter/Class", &code, Some(source)));
            positions[1] = Some(code);
        }
        None => {
            if config.diameter_nps.as_deref().and_then(parse_nps_to_inch).is_none() {
                missing.push("NPS diameter".to_string());
            }
            if config.pressure_class.is_none() {
                missing.push("pressure class".to_string());
            }
        }
    }

    // 3. Connection; a known flange face overrides the generic flanged code.
    if let Some(end_type) = config.end_type {
        let face_specific = match (end_type.is_flanged(), config.flange_face) {
            (true, Some(face)) => catalog
                .imex_code(
                    CatalogCategory::EndConnections,
                    &format!("FLANGEADO_{}", face.code()),
                )
                .map(str::to_string),
            _ => None,
        };
        let code = face_specific
            .or_else(|| {
                catalog
                    .imex_code(CatalogCategory::EndConnections, end_type.code())
                    .map(str::to_string)
            })
            .or_else(|| {
                LEGACY_END_CODES
                    .iter()
                    .find(|(k, _)| *k == end_type.code())
                    .map(|(_, v)| v.to_string())
            });
        match code {
            Some(code) => {
                segments.push(segment(
                    "connection",
                    "Connection",
                    &code,
                    Some(end_type.code().into()),
                ));
                positions[2] = Some(code);
            }
            None => missing.push("end type".to_string()),
        }
    } else {
        missing.push("end type".to_string());
    }

    // 4. Body material.
    match config.body_material.as_deref().and_then(|raw| {
        extract_material_code(
            raw,
            catalog.items(CatalogCategory::BodyMaterials),
            &LEGACY_BODY_CODES,
        )
    }) {
        Some(material) => {
            segments.push(segment(
                "body",
                "Body",
                &material.code,
                config.body_material.clone(),
            ));
            positions[3] = Some(material.code);
        }
        None => missing.push("body material".to_string()),
    }

    // 5. Trim (seat material).
    match config.seat_material.as_deref().and_then(|raw| {
        extract_material_code(
            raw,
            catalog.items(CatalogCategory::SeatMaterials),
            &LEGACY_SEAT_CODES,
        )
    }) {
        Some(material) => {
            segments.push(segment(
                "trim",
                "Trim",
                &material.code,
                config.seat_material.clone(),
            ));
            positions[4] = Some(material.code);
        }
        None => missing.push("seat material".to_string()),
    }

    // 6. Actuation.
    if let Some(actuation) = config.actuation_type {
        let code = catalog
            .imex_code(CatalogCategory::ActuationCodes, actuation.code())
            .map(str::to_string)
            .or_else(|| {
                LEGACY_ACTUATION_CODES
                    .iter()
                    .find(|(k, _)| *k == actuation.code())
                    .map(|(_, v)| v.to_string())
            });
        match code {
            Some(code) => {
                segments.push(segment(
                    "actuation",
                    "Actuation",
                    &code,
                    Some(actuation.code().into()),
                ));
                positions[5] = Some(code);
            }
            None => missing.push("actuation type".to_string()),
        }
    } else {
        missing.push("actuation type".to_string());
    }

    // 7. Suffixes: always present, never missing.
    let suffixes = build_suffixes(config);
    segments.push(segment(
        "suffixes",
        "Suffixes",
        &suffixes,
        Some("Special requirements".into()),
    ));

    // Assembly. Unresolved positions carry a literal placeholder so the
    // code always has exactly six dot-separated components and visibly
    // signals incompleteness inline.
    let body: Vec<&str> = positions
        .iter()
        .map(|p| p.as_deref().unwrap_or(PLACEHOLDER))
        .collect();
    let mut value = format!("{}-{}", body.join("."), suffixes);

    if let Some(observations) = config.observations.as_deref() {
        let observations = observations.trim();
        if !observations.is_empty() {
            value.push_str(&format!("({observations})"));
        }
    }

    BuildResult {
        value,
        segments,
        is_complete: missing.is_empty(),
        missing,
    }
}

fn build_suffixes(config: &ValveConfiguration) -> String {
    let mut suffixes: Vec<&str> = Vec::new();
    if config.fire_test_required() {
        suffixes.push("FS");
    }
    if config.low_fugitive_emission {
        suffixes.push("LFE");
    }
    if let Some(level) = config.sil_required() {
        suffixes.push(level.code());
    }
    if config.nace_compliant {
        suffixes.push("NACE");
    }
    if suffixes.is_empty() {
        suffixes.push("NEW");
    }
    suffixes.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActuationType, EndType, FlangeFace, SilLevel, ValveType};
    use crate::config::FireTestOption;

    #[test]
    fn nps_parsing_accepts_all_formats() {
        assert_eq!(parse_nps_to_inch("2"), Some(2.0));
        assert_eq!(parse_nps_to_inch("2.5"), Some(2.5));
        assert_eq!(parse_nps_to_inch("3/4"), Some(0.75));
        assert_eq!(parse_nps_to_inch("1 1/2"), Some(1.5));
        assert_eq!(parse_nps_to_inch(""), None);
        assert_eq!(parse_nps_to_inch("abc"), None);
        assert_eq!(parse_nps_to_inch("1/0"), None);
    }

    #[test]
    fn size_class_encoding() {
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
        assert_eq!(
            encode_size_class("8", PressureClass::C800).as_deref(),
            Some("0808")
        );
    }

    #[test]
    fn material_fallback_chain_confidence() {
        let catalog = Catalog::builtin();
        let bodies = catalog.items(CatalogCategory::BodyMaterials);

        let exact = extract_material_code("ASTM_A216_WCB", bodies, &LEGACY_BODY_CODES).unwrap();
        assert_eq!(exact.code, "WCB");
        assert_eq!(exact.confidence, CodeConfidence::Exact);

        let legacy = extract_material_code("ASTM A216 WCB", bodies, &LEGACY_BODY_CODES).unwrap();
        assert_eq!(legacy.code, "WCB");
        assert_eq!(legacy.confidence, CodeConfidence::Exact);

        let substring =
            extract_material_code("Corpo em ASTM A216 WCB fundido", bodies, &LEGACY_BODY_CODES)
                .unwrap();
        assert_eq!(substring.code, "WCB");
        assert_eq!(substring.confidence, CodeConfidence::Approximate);

        let truncated =
            extract_material_code("Hastelloy C276", bodies, &LEGACY_BODY_CODES).unwrap();
        assert_eq!(truncated.code, "HAS");
        assert_eq!(truncated.confidence, CodeConfidence::Approximate);
    }

    #[test]
    fn empty_config_emits_placeholders() {
        let catalog = Catalog::builtin();
        let result = build_imex_code(&catalog, &ValveConfiguration::new());
        assert_eq!(result.value, "???.???.???.???.???.???-NEW");
        assert!(!result.is_complete);
        assert_eq!(result.completion_percent(), 0);
    }

    #[test]
    fn placeholders_keep_positions() {
        let catalog = Catalog::builtin();
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.actuation_type = Some(ActuationType::Manual);

        let result = build_imex_code(&catalog, &config);
        assert_eq!(result.value, "TRUF.???.???.???.???.0L0000-NEW");
        let components: Vec<&str> =
            result.value.split('-').next().unwrap().split('.').collect();
        assert_eq!(components.len(), SEGMENT_COUNT);
    }

    #[test]
    fn flange_face_overrides_generic_connection_code() {
        let catalog = Catalog::builtin();
        let mut config = ValveConfiguration::new();
        config.end_type = Some(EndType::Flangeado);

        let generic = build_imex_code(&catalog, &config);
        assert!(generic.value.contains("FRE"));

        config.flange_face = Some(FlangeFace::Rf);
        let faced = build_imex_code(&catalog, &config);
        assert!(faced.value.contains("FRF"));
        assert!(!faced.value.contains("FRE"));
    }

    #[test]
    fn suffixes_accumulate_in_order() {
        let mut config = ValveConfiguration::new();
        config.fire_test = Some(FireTestOption::TestadaAFogo);
        config.low_fugitive_emission = true;
        config.sil_certification = Some(SilLevel::Sil2);
        config.nace_compliant = true;
        assert_eq!(build_suffixes(&config), "FS-LFE-SIL2-NACE");

        assert_eq!(build_suffixes(&ValveConfiguration::new()), "NEW");
    }

    #[test]
    fn observations_are_appended() {
        let catalog = Catalog::builtin();
        let mut config = ValveConfiguration::new();
        config.observations = Some("  trunnion mounted  ".to_string());
        let result = build_imex_code(&catalog, &config);
        assert!(result.value.ends_with("(trunnion mounted)"));
    }
}
