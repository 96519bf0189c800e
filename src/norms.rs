//! Norm Registry and Resolver - the fail-closed rule catalog
//!
//! Standards apply per (valve type, service type); the subset typed
//! CONSTRUCTION elects the primary norm, which owns the attribute domains
//! and material lists. Absence of data rejects the combination - the engine
//! never guesses a standard.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{FieldValue, ServiceType, ValveConfiguration, ValveType};
use crate::materials::{FireTestCompatibility, MaterialRecord, MaterialRole, MaterialsByRole};

pub const NACE_NORM: &str = "NACE_MR0175_2015";
pub const FIRE_TEST_NORM: &str = "API_607_2016";
pub const LOW_EMISSION_NORM: &str = "ISO_15848_2015";
pub const SIL_NORM: &str = "IEC_61508_2010";
pub const FLANGE_NORM: &str = "ASME_B16_5";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum NormType {
    Construction,
    Performance,
    Material,
    Interface,
    Safety,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Block,
    Warn,
    Info,
}

/// NACE qualification verdict for one material under a MATERIAL norm.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct MaterialQualification {
    pub qualified: bool,
    pub reason: Option<String>,
    pub max_hardness: Option<String>,
    pub min_temp: Option<String>,
}

/// A single predicate over the configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Condition {
    Equals { field: String, value: FieldValue },
}

impl Condition {
    pub fn equals_text(field: &str, value: &str) -> Self {
        Condition::Equals {
            field: field.to_string(),
            value: FieldValue::Text(value.to_string()),
        }
    }

    pub fn equals_bool(field: &str, value: bool) -> Self {
        Condition::Equals {
            field: field.to_string(),
            value: FieldValue::Bool(value),
        }
    }

    pub fn holds(&self, config: &ValveConfiguration) -> bool {
        match self {
            Condition::Equals { field, value } => config.field(field).matches(value),
        }
    }
}

/// What a triggered constraint does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "effect")]
pub enum ConstraintEffect {
    /// Restrict a field to the complement of the listed values.
    BlockValues {
        field: String,
        values: Vec<String>,
    },
    /// Forbid the listed values wherever they appear in the configuration.
    BlockAnywhere { values: Vec<String> },
    /// The listed fields must be set.
    Require { fields: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Constraint {
    pub name: String,
    pub when: Vec<Condition>,
    pub effects: Vec<ConstraintEffect>,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub source_norm: Option<String>,
}

impl Constraint {
    pub fn triggered(&self, config: &ValveConfiguration) -> bool {
        self.when.iter().all(|c| c.holds(config))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct Norm {
    pub code: String,
    pub title: String,
    pub norm_type: NormType,
    /// Applicability lists; `*` matches every value.
    pub valve_types: Vec<String>,
    pub service_types: Vec<String>,
    pub precedence: u32,
    pub domains: BTreeMap<String, Vec<String>>,
    pub material_qualifications: BTreeMap<String, MaterialQualification>,
    pub constraints: Vec<Constraint>,
    pub materials: Vec<MaterialRecord>,
}

impl Default for Norm {
    fn default() -> Self {
        Self {
            code: String::new(),
            title: String::new(),
            norm_type: NormType::Construction,
            valve_types: Vec::new(),
            service_types: Vec::new(),
            precedence: 100,
            domains: BTreeMap::new(),
            material_qualifications: BTreeMap::new(),
            constraints: Vec::new(),
            materials: Vec::new(),
        }
    }
}

impl Norm {
    pub fn applies_to(&self, valve_type: ValveType, service_type: ServiceType) -> bool {
        self.applies_to_valve(valve_type) && self.applies_to_service(service_type)
    }

    pub fn applies_to_valve(&self, valve_type: ValveType) -> bool {
        self.valve_types.iter().any(|v| v == "*" || v == valve_type.code())
    }

    pub fn applies_to_service(&self, service_type: ServiceType) -> bool {
        self.service_types.iter().any(|s| s == "*" || s == service_type.code())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackStatus {
    Draft,
    Active,
    Deprecated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SystemRequirements {
    pub min_norms_for_operation: usize,
    pub required_domain_completeness: f64,
    pub auto_block_threshold: f64,
}

impl Default for SystemRequirements {
    fn default() -> Self {
        Self {
            min_norms_for_operation: 6,
            required_domain_completeness: 90.0,
            auto_block_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TorqueConstants {
    pub pressure_factor: f64,
    pub size_exponent: f64,
    pub safety_margin: f64,
}

impl Default for TorqueConstants {
    fn default() -> Self {
        Self {
            pressure_factor: 0.008,
            size_exponent: 2.5,
            safety_margin: 1.15,
        }
    }
}

/// One versioned rule catalog. Exactly one version is ACTIVE at a time;
/// the health check enforces that invariant across the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct NormPack {
    pub version: String,
    pub status: PackStatus,
    pub min_engine_version: String,
    pub norms: BTreeMap<String, Norm>,
    pub system_requirements: SystemRequirements,
    pub torque_coefficients: BTreeMap<String, f64>,
    pub torque_constants: TorqueConstants,
    pub fire_test_compatibility: Vec<FireTestCompatibility>,
}

impl Default for NormPack {
    fn default() -> Self {
        Self {
            version: "0.0.0".to_string(),
            status: PackStatus::Draft,
            min_engine_version: "1.0.0".to_string(),
            norms: BTreeMap::new(),
            system_requirements: SystemRequirements::default(),
            torque_coefficients: BTreeMap::new(),
            torque_constants: TorqueConstants::default(),
            fire_test_compatibility: Vec::new(),
        }
    }
}

impl NormPack {
    pub fn get(&self, code: &str) -> Option<&Norm> {
        self.norms.get(code)
    }

    pub fn norm_count(&self) -> usize {
        self.norms.len()
    }

    /// Norms applicable to the combination, primary-first
    /// (ascending precedence, then code).
    pub fn norms_for_combination(
        &self,
        valve_type: ValveType,
        service_type: ServiceType,
    ) -> Vec<&Norm> {
        let mut applicable: Vec<&Norm> = self
            .norms
            .values()
            .filter(|n| n.applies_to(valve_type, service_type))
            .collect();
        applicable.sort_by(|a, b| a.precedence.cmp(&b.precedence).then(a.code.cmp(&b.code)));
        applicable
    }

    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Production starter pack.
    pub fn builtin() -> Self {
        let mut norms = BTreeMap::new();

        let pipeline_materials = production_materials();

        let mut abnt = Norm {
            code: "ABNT_NBR_15827".to_string(),
            title: "ABNT NBR 15827 - Valvulas industriais para petroleo e gas".to_string(),
            norm_type: NormType::Construction,
            valve_types: ["ESFERA", "GLOBO", "GAVETA", "RETENCAO", "BORBOLETA", "CONTROLE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            service_types: ["PROCESS", "GENERAL"].iter().map(|s| s.to_string()).collect(),
            precedence: 30,
            materials: pipeline_materials.clone(),
            ..Norm::default()
        };
        abnt.domains.insert(
            "pressure_class".to_string(),
            ["150", "300", "600", "900", "1500", "2500"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        abnt.domains.insert(
            "end_type".to_string(),
            ["FLANGEADO", "BW", "SW", "NPT", "WAFER", "LUG"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        abnt.constraints.push(Constraint {
            name: "flange_face_when_flanged".to_string(),
            when: vec![Condition::equals_text("end_type", "FLANGEADO")],
            effects: vec![ConstraintEffect::Require {
                fields: vec!["flange_face".to_string()],
            }],
            severity: Severity::Block,
            message: "Flanged ends require a flange face selection".to_string(),
            source_norm: Some(FLANGE_NORM.to_string()),
        });
        norms.insert(abnt.code.clone(), abnt);

        let mut api6d = Norm {
            code: "API_6D".to_string(),
            title: "API 6D - Specification for Pipeline and Piping Valves".to_string(),
            norm_type: NormType::Construction,
            valve_types: ["ESFERA", "GAVETA", "RETENCAO"].iter().map(|s| s.to_string()).collect(),
            service_types: vec!["PIPELINE".to_string()],
            precedence: 10,
            materials: pipeline_materials.clone(),
            ..Norm::default()
        };
        api6d.domains.insert(
            "pressure_class".to_string(),
            ["150", "300", "600", "900", "1500", "2500"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        api6d.domains.insert(
            "end_type".to_string(),
            ["FLANGEADO", "BW"].iter().map(|s| s.to_string()).collect(),
        );
        api6d.constraints.push(Constraint {
            name: "no_threaded_pipeline_ends".to_string(),
            when: vec![Condition::equals_text("end_type", "NPT")],
            effects: vec![ConstraintEffect::BlockValues {
                field: "end_type".to_string(),
                values: vec!["NPT".to_string(), "SW".to_string()],
            }],
            severity: Severity::Block,
            message: "Threaded ends are not admitted for pipeline valves".to_string(),
            source_norm: Some("API_6D".to_string()),
        });
        api6d.constraints.push(Constraint {
            name: "flange_face_when_flanged".to_string(),
            when: vec![Condition::equals_text("end_type", "FLANGEADO")],
            effects: vec![ConstraintEffect::Require {
                fields: vec!["flange_face".to_string()],
            }],
            severity: Severity::Block,
            message: "Flanged ends require a flange face selection".to_string(),
            source_norm: Some(FLANGE_NORM.to_string()),
        });
        norms.insert(api6d.code.clone(), api6d);

        let iso14313 = Norm {
            code: "ISO_14313".to_string(),
            title: "ISO 14313 - Pipeline transportation systems - Pipeline valves".to_string(),
            norm_type: NormType::Construction,
            valve_types: ["ESFERA", "GAVETA", "RETENCAO"].iter().map(|s| s.to_string()).collect(),
            service_types: vec!["PIPELINE".to_string()],
            precedence: 20,
            materials: pipeline_materials.clone(),
            ..Norm::default()
        };
        norms.insert(iso14313.code.clone(), iso14313);

        let api600 = Norm {
            code: "API_600".to_string(),
            title: "API 600 - Steel Gate Valves".to_string(),
            norm_type: NormType::Construction,
            valve_types: vec!["GAVETA".to_string()],
            service_types: ["PROCESS", "GENERAL"].iter().map(|s| s.to_string()).collect(),
            precedence: 40,
            materials: pipeline_materials.clone(),
            ..Norm::default()
        };
        norms.insert(api600.code.clone(), api600);

        let api6a = Norm {
            code: "API_6A".to_string(),
            title: "API 6A - Wellhead and Tree Equipment".to_string(),
            norm_type: NormType::Construction,
            valve_types: ["ESFERA", "GAVETA"].iter().map(|s| s.to_string()).collect(),
            service_types: vec!["WELLHEAD".to_string()],
            precedence: 10,
            materials: pipeline_materials,
            ..Norm::default()
        };
        norms.insert(api6a.code.clone(), api6a);

        let asme_b16_34 = Norm {
            code: "ASME_B16_34".to_string(),
            title: "ASME B16.34 - Valves Flanged, Threaded and Welding End".to_string(),
            norm_type: NormType::Performance,
            valve_types: vec!["*".to_string()],
            service_types: vec!["*".to_string()],
            precedence: 50,
            ..Norm::default()
        };
        norms.insert(asme_b16_34.code.clone(), asme_b16_34);

        let asme_b16_5 = Norm {
            code: FLANGE_NORM.to_string(),
            title: "ASME B16.5 - Pipe Flanges and Flanged Fittings".to_string(),
            norm_type: NormType::Interface,
            valve_types: vec!["*".to_string()],
            service_types: vec!["*".to_string()],
            precedence: 60,
            ..Norm::default()
        };
        norms.insert(asme_b16_5.code.clone(), asme_b16_5);

        let mut nace = Norm {
            code: NACE_NORM.to_string(),
            title: "NACE MR0175 / ISO 15156 - Materials for H2S-containing environments"
                .to_string(),
            norm_type: NormType::Material,
            valve_types: vec!["*".to_string()],
            service_types: vec!["*".to_string()],
            precedence: 70,
            ..Norm::default()
        };
        nace.material_qualifications = nace_qualifications();
        norms.insert(nace.code.clone(), nace);

        let api607 = Norm {
            code: FIRE_TEST_NORM.to_string(),
            title: "API 607 - Fire Test for Quarter-turn Valves".to_string(),
            norm_type: NormType::Safety,
            valve_types: vec!["*".to_string()],
            service_types: vec!["*".to_string()],
            precedence: 70,
            ..Norm::default()
        };
        norms.insert(api607.code.clone(), api607);

        let iso15848 = Norm {
            code: LOW_EMISSION_NORM.to_string(),
            title: "ISO 15848-1 - Fugitive emissions of industrial valves".to_string(),
            norm_type: NormType::Performance,
            valve_types: vec!["*".to_string()],
            service_types: vec!["*".to_string()],
            precedence: 70,
            ..Norm::default()
        };
        norms.insert(iso15848.code.clone(), iso15848);

        let iec61508 = Norm {
            code: SIL_NORM.to_string(),
            title: "IEC 61508 - Functional safety of E/E/PE safety-related systems".to_string(),
            norm_type: NormType::Safety,
            valve_types: vec!["*".to_string()],
            service_types: vec!["*".to_string()],
            precedence: 70,
            ..Norm::default()
        };
        norms.insert(iec61508.code.clone(), iec61508);

        let mut torque_coefficients = BTreeMap::new();
        for (material, coefficient) in [
            ("PTFE", 0.12),
            ("RPTFE", 0.14),
            ("NYLON", 0.15),
            ("METAL", 0.25),
            ("STELLITE", 0.22),
            ("ENP", 0.20),
            ("INCONEL", 0.24),
        ] {
            torque_coefficients.insert(material.to_string(), coefficient);
        }

        let fire_test_compatibility = ["ESFERA", "BORBOLETA", "GAVETA"]
            .iter()
            .map(|valve_type| FireTestCompatibility {
                valve_type: valve_type.to_string(),
                allowed_body_materials: [
                    "ASTM_A216_WCB",
                    "ASTM_A352_LCC",
                    "ASTM_A351_CF8M",
                    "ASTM_A995_4A",
                    "ASTM_A995_5A",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                allowed_seat_materials: ["METAL", "STELLITE", "GRAFITE", "ENP", "INCONEL"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                max_pressure_rating: Some(1500),
                norm_code: Some(FIRE_TEST_NORM.to_string()),
            })
            .collect();

        Self {
            version: "2.0.0".to_string(),
            status: PackStatus::Active,
            min_engine_version: "1.0.0".to_string(),
            norms,
            system_requirements: SystemRequirements::default(),
            torque_coefficients,
            torque_constants: TorqueConstants::default(),
            fire_test_compatibility,
        }
    }
}

fn production_materials() -> Vec<MaterialRecord> {
    vec![
        // Body
        MaterialRecord::new("ASTM_A216_WCB", "ASTM A216 WCB - Aco Carbono", MaterialRole::Body)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("ASTM_A352_LCC", "ASTM A352 LCC", MaterialRole::Body)
            .nace(-46.0, 22.0)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("ASTM_A351_CF8M", "ASTM A351 CF8M - Inox 316", MaterialRole::Body)
            .nace(-60.0, 22.0)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("ASTM_A995_4A", "ASTM A995 4A - Duplex", MaterialRole::Body)
            .nace(-46.0, 28.0)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("ASTM_A995_5A", "ASTM A995 5A - Super Duplex", MaterialRole::Body)
            .nace(-46.0, 32.0)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("ASTM_A105", "ASTM A105 - Aco Carbono Forjado", MaterialRole::Body)
            .fire_test(),
        // Obturator
        MaterialRecord::new("ASTM_A351_CF8M", "ASTM A351 CF8M", MaterialRole::Obturator)
            .nace(-60.0, 22.0)
            .fire_test()
            .low_emission()
            .compatible(&["METAL", "STELLITE", "PTFE", "RPTFE", "PEEK"]),
        MaterialRecord::new("ASTM_A182_F316_ENP", "F316 + ENP", MaterialRole::Obturator)
            .nace(-60.0, 22.0)
            .fire_test()
            .low_emission()
            .compatible(&["METAL", "STELLITE", "ENP"]),
        MaterialRecord::new("ASTM_A182_F51", "ASTM A182 F51 - Duplex", MaterialRole::Obturator)
            .nace(-46.0, 28.0)
            .fire_test()
            .low_emission()
            .compatible(&["METAL", "STELLITE", "DEVLON"]),
        // Seat
        MaterialRecord::new("PTFE", "PTFE", MaterialRole::Seat)
            .low_emission()
            .compatible(&["ASTM_A351_CF8M"]),
        MaterialRecord::new("RPTFE", "RPTFE (Reforcado)", MaterialRole::Seat)
            .low_emission()
            .compatible(&["ASTM_A351_CF8M"]),
        MaterialRecord::new("PEEK", "PEEK", MaterialRole::Seat)
            .nace(-40.0, 0.0)
            .low_emission()
            .compatible(&["ASTM_A351_CF8M"]),
        MaterialRecord::new("METAL", "Metal-Metal", MaterialRole::Seat)
            .nace(-60.0, 22.0)
            .fire_test()
            .low_emission()
            .compatible(&["ASTM_A351_CF8M", "ASTM_A182_F316_ENP", "ASTM_A182_F51"]),
        MaterialRecord::new("STELLITE", "Stellite", MaterialRole::Seat)
            .nace(-60.0, 22.0)
            .fire_test()
            .low_emission()
            .compatible(&["ASTM_A351_CF8M", "ASTM_A182_F316_ENP", "ASTM_A182_F51"]),
        MaterialRecord::new("NYLON", "Nylon", MaterialRole::Seat).compatible(&["ASTM_A351_CF8M"]),
        MaterialRecord::new("DEVLON", "Devlon", MaterialRole::Seat)
            .compatible(&["ASTM_A182_F51"]),
        // Stem
        MaterialRecord::new("ASTM_A182_F6A", "ASTM A182 F6a - Inox 410", MaterialRole::Stem)
            .fire_test(),
        MaterialRecord::new("ASTM_A182_F316", "ASTM A182 F316", MaterialRole::Stem)
            .nace(-60.0, 22.0)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("ASTM_A182_F51", "ASTM A182 F51 - Duplex", MaterialRole::Stem)
            .nace(-46.0, 28.0)
            .fire_test()
            .low_emission(),
        MaterialRecord::new("INCONEL_625", "Inconel 625", MaterialRole::Stem)
            .nace(-100.0, 35.0)
            .fire_test()
            .low_emission(),
    ]
}

fn nace_qualifications() -> BTreeMap<String, MaterialQualification> {
    let mut map = BTreeMap::new();
    map.insert(
        "ASTM_A216_WCB".to_string(),
        MaterialQualification {
            qualified: false,
            reason: Some("Carbon steel exceeds 22 HRC without PWHT control".to_string()),
            ..Default::default()
        },
    );
    map.insert(
        "ASTM_A105".to_string(),
        MaterialQualification {
            qualified: false,
            reason: Some("Forged carbon steel not qualified for sour service".to_string()),
            ..Default::default()
        },
    );
    map.insert(
        "ASTM_A106".to_string(),
        MaterialQualification {
            qualified: false,
            reason: Some("Carbon steel pipe grade not qualified for sour service".to_string()),
            ..Default::default()
        },
    );
    for (code, hardness, temp) in [
        ("ASTM_A352_LCC", "22 HRC", "-46C"),
        ("ASTM_A351_CF8M", "22 HRC", "-60C"),
        ("ASTM_A995_4A", "28 HRC", "-46C"),
        ("ASTM_A995_5A", "32 HRC", "-46C"),
    ] {
        map.insert(
            code.to_string(),
            MaterialQualification {
                qualified: true,
                reason: None,
                max_hardness: Some(hardness.to_string()),
                min_temp: Some(temp.to_string()),
            },
        );
    }
    map
}

/// Registry of pack versions. The ACTIVE one serves all resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackRegistry {
    pub packs: Vec<NormPack>,
}

impl PackRegistry {
    pub fn new(packs: Vec<NormPack>) -> Self {
        Self { packs }
    }

    pub fn builtin() -> Self {
        Self::new(vec![NormPack::builtin()])
    }

    pub fn active_count(&self) -> usize {
        self.packs.iter().filter(|p| p.status == PackStatus::Active).count()
    }

    /// The single ACTIVE pack, or None - callers treat None as blocking.
    pub fn active(&self) -> Option<&NormPack> {
        let mut active = self.packs.iter().filter(|p| p.status == PackStatus::Active);
        let first = active.next()?;
        if active.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Explicit invalidate/reload: the whole registry is replaced.
    pub fn replace(&mut self, packs: Vec<NormPack>) {
        self.packs = packs;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandardRef {
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedStandard {
    pub norm: String,
    pub reason: String,
}

/// Outcome of resolving (valve type, service type) against the active pack.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NormResolution {
    pub is_valid: bool,
    pub applicable_norms: Vec<String>,
    pub rejected_norms: Vec<RejectedStandard>,
    pub construction_standards: Vec<StandardRef>,
    /// Set when exactly one construction standard applies - the gateway
    /// skips the manual pick.
    pub auto_selected: Option<String>,
    pub attribute_domains: BTreeMap<String, Vec<String>>,
    pub materials: MaterialsByRole,
}

impl NormResolution {
    fn invalid() -> Self {
        Self::default()
    }

    /// The primary construction standard, if the combination resolved.
    pub fn primary_norm(&self) -> Option<&StandardRef> {
        self.construction_standards.first()
    }
}

/// Applicability resolver. Missing inputs yield the neutral invalid result
/// without touching the pack; zero construction standards reject the
/// combination outright.
pub fn resolve(
    pack: &NormPack,
    valve_type: Option<ValveType>,
    service_type: Option<ServiceType>,
) -> NormResolution {
    let (valve_type, service_type) = match (valve_type, service_type) {
        (Some(v), Some(s)) => (v, s),
        _ => return NormResolution::invalid(),
    };

    let applicable = pack.norms_for_combination(valve_type, service_type);
    let rejected: Vec<RejectedStandard> = pack
        .norms
        .values()
        .filter(|n| !n.applies_to(valve_type, service_type))
        .map(|n| RejectedStandard {
            norm: n.code.clone(),
            reason: format!(
                "Not applicable for {} + {}",
                valve_type.code(),
                service_type.code()
            ),
        })
        .collect();

    let construction: Vec<&Norm> = applicable
        .iter()
        .filter(|n| n.norm_type == NormType::Construction)
        .copied()
        .collect();

    if construction.is_empty() {
        return NormResolution {
            rejected_norms: rejected,
            ..NormResolution::invalid()
        };
    }

    // Domains and materials come from the primary norm only; additional
    // construction standards are informational for the caller.
    let primary = construction[0];
    let construction_standards: Vec<StandardRef> = construction
        .iter()
        .map(|n| StandardRef {
            code: n.code.clone(),
            title: n.title.clone(),
        })
        .collect();

    let auto_selected = if construction_standards.len() == 1 {
        Some(construction_standards[0].code.clone())
    } else {
        None
    };

    NormResolution {
        is_valid: true,
        applicable_norms: applicable.iter().map(|n| n.code.clone()).collect(),
        rejected_norms: rejected,
        construction_standards,
        auto_selected,
        attribute_domains: primary.domains.clone(),
        materials: MaterialsByRole::partition(primary.materials.iter().cloned()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstraintViolation {
    pub field: String,
    pub message: String,
    pub source_norm: Option<String>,
    pub severity: Severity,
}

/// Result of evaluating the primary norm's constraints over a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstraintValidation {
    pub is_valid: bool,
    pub errors: Vec<ConstraintViolation>,
    pub warnings: Vec<ConstraintViolation>,
    pub applicable_norms: Vec<String>,
    pub blocked_options: BTreeMap<String, Vec<String>>,
}

/// Evaluate the primary norm's declarative constraints, plus the built-in
/// NACE and fire-test gates, against the configuration snapshot.
pub fn validate_constraints(
    pack: &NormPack,
    config: &ValveConfiguration,
    primary_norm_code: &str,
) -> ConstraintValidation {
    let mut out = ConstraintValidation::default();
    out.applicable_norms.push(primary_norm_code.to_string());

    let primary = match pack.get(primary_norm_code) {
        Some(norm) => norm,
        None => {
            out.errors.push(ConstraintViolation {
                field: "construction_standard".to_string(),
                message: "Primary norm not found in the active catalog".to_string(),
                source_norm: None,
                severity: Severity::Block,
            });
            out.applicable_norms.clear();
            return out;
        }
    };

    for constraint in &primary.constraints {
        if !constraint.triggered(config) {
            continue;
        }
        for effect in &constraint.effects {
            match effect {
                ConstraintEffect::BlockAnywhere { values } => {
                    for blocked in values {
                        if config.contains_value(blocked) {
                            let violation = ConstraintViolation {
                                field: "material".to_string(),
                                message: constraint.message.clone(),
                                source_norm: constraint.source_norm.clone(),
                                severity: constraint.severity,
                            };
                            if constraint.severity == Severity::Block {
                                out.errors.push(violation);
                            } else {
                                out.warnings.push(violation);
                            }
                        }
                    }
                }
                ConstraintEffect::BlockValues { field, values } => {
                    out.blocked_options
                        .entry(field.clone())
                        .or_default()
                        .extend(values.iter().cloned());
                    if let Some(current) = config.field(field).as_text() {
                        if values.iter().any(|v| v == current) {
                            out.errors.push(ConstraintViolation {
                                field: field.clone(),
                                message: constraint.message.clone(),
                                source_norm: constraint.source_norm.clone(),
                                severity: Severity::Block,
                            });
                        }
                    }
                }
                ConstraintEffect::Require { fields } => {
                    for field in fields {
                        if !config.field(field).is_set() {
                            out.errors.push(ConstraintViolation {
                                field: field.clone(),
                                message: constraint.message.clone(),
                                source_norm: constraint.source_norm.clone(),
                                severity: Severity::Block,
                            });
                        }
                    }
                }
            }
        }
        if let Some(source) = &constraint.source_norm {
            if !out.applicable_norms.contains(source) {
                out.applicable_norms.push(source.clone());
            }
        }
    }

    if config.nace_compliant {
        if let Some(nace) = pack.get(NACE_NORM) {
            for (material, qualification) in &nace.material_qualifications {
                if qualification.qualified {
                    continue;
                }
                out.blocked_options
                    .entry("body_material".to_string())
                    .or_default()
                    .push(material.clone());
                if config.body_material.as_deref() == Some(material.as_str()) {
                    let reason = qualification
                        .reason
                        .as_deref()
                        .unwrap_or("see norm for qualification requirements");
                    out.errors.push(ConstraintViolation {
                        field: "body_material".to_string(),
                        message: format!("Material {material} not NACE qualified: {reason}"),
                        source_norm: Some(NACE_NORM.to_string()),
                        severity: Severity::Block,
                    });
                }
            }
        }
        if !out.applicable_norms.iter().any(|n| n == NACE_NORM) {
            out.applicable_norms.push(NACE_NORM.to_string());
        }
    }

    if config.fire_test_required() {
        let polymer_seats = ["PTFE", "NYLON"];
        out.blocked_options
            .entry("seat_material".to_string())
            .or_default()
            .extend(polymer_seats.iter().map(|s| s.to_string()));
        if let Some(seat) = config.seat_material.as_deref() {
            if polymer_seats.contains(&seat) {
                out.errors.push(ConstraintViolation {
                    field: "seat_material".to_string(),
                    message: "Fire test does not admit a polymer seat".to_string(),
                    source_norm: Some(FIRE_TEST_NORM.to_string()),
                    severity: Severity::Block,
                });
            }
        }
        if !out.applicable_norms.iter().any(|n| n == FIRE_TEST_NORM) {
            out.applicable_norms.push(FIRE_TEST_NORM.to_string());
        }
    }

    out.is_valid = out.errors.is_empty();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ball_pipeline_resolves_api_6d_primary() {
        let pack = NormPack::builtin();
        let resolution = resolve(&pack, Some(ValveType::Esfera), Some(ServiceType::Pipeline));
        assert!(resolution.is_valid);
        assert_eq!(resolution.primary_norm().unwrap().code, "API_6D");
        // API 6D and ISO 14313 both apply; no auto-selection.
        assert_eq!(resolution.construction_standards.len(), 2);
        assert!(resolution.auto_selected.is_none());
        assert!(!resolution.materials.body.is_empty());
        assert!(!resolution.attribute_domains["pressure_class"].is_empty());
    }

    #[test]
    fn missing_inputs_resolve_invalid_without_lookup() {
        let pack = NormPack::builtin();
        let resolution = resolve(&pack, None, Some(ServiceType::Pipeline));
        assert!(!resolution.is_valid);
        assert!(resolution.construction_standards.is_empty());
        assert!(resolution.rejected_norms.is_empty());
    }

    #[test]
    fn no_construction_standard_rejects_combination() {
        let pack = NormPack::builtin();
        // No construction norm covers check valves at the wellhead.
        let resolution = resolve(&pack, Some(ValveType::Retencao), Some(ServiceType::Wellhead));
        assert!(!resolution.is_valid);
        assert!(resolution.construction_standards.is_empty());
        assert!(!resolution.rejected_norms.is_empty());
    }

    #[test]
    fn single_construction_standard_is_auto_selected() {
        let pack = NormPack::builtin();
        let resolution = resolve(&pack, Some(ValveType::Esfera), Some(ServiceType::Wellhead));
        assert!(resolution.is_valid);
        assert_eq!(resolution.auto_selected.as_deref(), Some("API_6A"));
    }

    #[test]
    fn nace_gate_blocks_carbon_steel_body() {
        let pack = NormPack::builtin();
        let mut config = ValveConfiguration::new();
        config.nace_compliant = true;
        config.body_material = Some("ASTM_A216_WCB".to_string());

        let result = validate_constraints(&pack, &config, "API_6D");
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.field == "body_material"));
        assert!(result.applicable_norms.iter().any(|n| n == NACE_NORM));
        assert!(result.blocked_options["body_material"].contains(&"ASTM_A216_WCB".to_string()));
    }

    #[test]
    fn unknown_primary_norm_is_blocking() {
        let pack = NormPack::builtin();
        let config = ValveConfiguration::new();
        let result = validate_constraints(&pack, &config, "API_9999");
        assert!(!result.is_valid);
        assert!(result.applicable_norms.is_empty());
    }
}
