//! Valve Configuration Model
//!
//! One fully-typed draft shared by every engine component.
//! The engine is read-only over a snapshot; only the editing session mutates it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValveType {
    #[serde(rename = "ESFERA")]
    Esfera,
    #[serde(rename = "GLOBO")]
    Globo,
    #[serde(rename = "GAVETA")]
    Gaveta,
    #[serde(rename = "RETENCAO")]
    Retencao,
    #[serde(rename = "BORBOLETA")]
    Borboleta,
    #[serde(rename = "CONTROLE")]
    Controle,
}

impl ValveType {
    pub fn code(&self) -> &'static str {
        match self {
            ValveType::Esfera => "ESFERA",
            ValveType::Globo => "GLOBO",
            ValveType::Gaveta => "GAVETA",
            ValveType::Retencao => "RETENCAO",
            ValveType::Borboleta => "BORBOLETA",
            ValveType::Controle => "CONTROLE",
        }
    }

    /// Quarter-turn valves are sized by torque and ISO 5211 top flange.
    pub fn is_quarter_turn(&self) -> bool {
        matches!(self, ValveType::Esfera | ValveType::Borboleta)
    }

    /// Linear valves are sized by stem, travel and thrust.
    pub fn is_linear(&self) -> bool {
        matches!(self, ValveType::Globo | ValveType::Gaveta | ValveType::Controle)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceType {
    Pipeline,
    Process,
    Wellhead,
    General,
}

impl ServiceType {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceType::Pipeline => "PIPELINE",
            ServiceType::Process => "PROCESS",
            ServiceType::Wellhead => "WELLHEAD",
            ServiceType::General => "GENERAL",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PressureClass {
    #[serde(rename = "150")]
    C150,
    #[serde(rename = "300")]
    C300,
    #[serde(rename = "600")]
    C600,
    #[serde(rename = "800")]
    C800,
    #[serde(rename = "900")]
    C900,
    #[serde(rename = "1500")]
    C1500,
    #[serde(rename = "2500")]
    C2500,
}

impl PressureClass {
    pub fn code(&self) -> &'static str {
        match self {
            PressureClass::C150 => "150",
            PressureClass::C300 => "300",
            PressureClass::C600 => "600",
            PressureClass::C800 => "800",
            PressureClass::C900 => "900",
            PressureClass::C1500 => "1500",
            PressureClass::C2500 => "2500",
        }
    }

    pub fn rating(&self) -> u32 {
        match self {
            PressureClass::C150 => 150,
            PressureClass::C300 => 300,
            PressureClass::C600 => 600,
            PressureClass::C800 => 800,
            PressureClass::C900 => 900,
            PressureClass::C1500 => 1500,
            PressureClass::C2500 => 2500,
        }
    }

    /// Single-character class code used in the size/class IMEX segment.
    pub fn imex_char(&self) -> char {
        match self {
            PressureClass::C150 => '1',
            PressureClass::C300 => '3',
            PressureClass::C600 => '6',
            PressureClass::C800 => '8',
            PressureClass::C900 => 'A',
            PressureClass::C1500 => 'B',
            PressureClass::C2500 => 'Y',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "150" => Some(PressureClass::C150),
            "300" => Some(PressureClass::C300),
            "600" => Some(PressureClass::C600),
            "800" => Some(PressureClass::C800),
            "900" => Some(PressureClass::C900),
            "1500" => Some(PressureClass::C1500),
            "2500" => Some(PressureClass::C2500),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EndType {
    #[serde(rename = "FLANGEADO")]
    Flangeado,
    #[serde(rename = "BW")]
    ButtWeld,
    #[serde(rename = "SW")]
    SocketWeld,
    #[serde(rename = "NPT")]
    Threaded,
    #[serde(rename = "WAFER")]
    Wafer,
    #[serde(rename = "LUG")]
    Lug,
}

impl EndType {
    pub fn code(&self) -> &'static str {
        match self {
            EndType::Flangeado => "FLANGEADO",
            EndType::ButtWeld => "BW",
            EndType::SocketWeld => "SW",
            EndType::Threaded => "NPT",
            EndType::Wafer => "WAFER",
            EndType::Lug => "LUG",
        }
    }

    pub fn is_flanged(&self) -> bool {
        matches!(self, EndType::Flangeado)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlangeFace {
    Rf,
    Rtj,
    Ff,
}

impl FlangeFace {
    pub fn code(&self) -> &'static str {
        match self {
            FlangeFace::Rf => "RF",
            FlangeFace::Rtj => "RTJ",
            FlangeFace::Ff => "FF",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActuationType {
    #[serde(rename = "MANUAL")]
    Manual,
    #[serde(rename = "PNEUMATICO")]
    Pneumatico,
    #[serde(rename = "ELETRICO")]
    Eletrico,
    #[serde(rename = "HIDRAULICO")]
    Hidraulico,
}

impl ActuationType {
    pub fn code(&self) -> &'static str {
        match self {
            ActuationType::Manual => "MANUAL",
            ActuationType::Pneumatico => "PNEUMATICO",
            ActuationType::Eletrico => "ELETRICO",
            ActuationType::Hidraulico => "HIDRAULICO",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FireTestOption {
    #[serde(rename = "USO_GERAL")]
    UsoGeral,
    #[serde(rename = "TESTADA_A_FOGO")]
    TestadaAFogo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum SilLevel {
    Na,
    Sil1,
    Sil2,
    Sil3,
}

impl SilLevel {
    pub fn code(&self) -> &'static str {
        match self {
            SilLevel::Na => "NA",
            SilLevel::Sil1 => "SIL1",
            SilLevel::Sil2 => "SIL2",
            SilLevel::Sil3 => "SIL3",
        }
    }

    /// Numeric tier for meets-required comparisons (NA = 0).
    pub fn tier(&self) -> u8 {
        match self {
            SilLevel::Na => 0,
            SilLevel::Sil1 => 1,
            SilLevel::Sil2 => 2,
            SilLevel::Sil3 => 3,
        }
    }
}

/// Persisted draft status. INCOMPLETO and DRAFT are derived from the
/// validator; the rest are set by the approval workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpecStatus {
    Incompleto,
    Draft,
    Submitted,
    Approved,
    Published,
    Rejected,
}

impl SpecStatus {
    fn rank(&self) -> u8 {
        match self {
            SpecStatus::Incompleto => 0,
            SpecStatus::Draft => 1,
            SpecStatus::Submitted => 2,
            SpecStatus::Approved => 3,
            SpecStatus::Published => 4,
            SpecStatus::Rejected => 2,
        }
    }

    /// Transitions only move forward, except REJECTED -> DRAFT (rework).
    pub fn can_transition_to(&self, next: SpecStatus) -> bool {
        if *self == SpecStatus::Rejected {
            return matches!(next, SpecStatus::Draft | SpecStatus::Rejected);
        }
        if next == SpecStatus::Rejected {
            return matches!(self, SpecStatus::Submitted);
        }
        next.rank() >= self.rank()
    }
}

/// Snapshot value of one configuration field as seen by the rule engine.
///
/// Conditions compare through [`FieldValue::matches`], which also implements
/// the legacy boolean <-> "Sim"/"Nao" equivalence from the rule tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Unset,
}

impl FieldValue {
    pub fn is_set(&self) -> bool {
        !matches!(self, FieldValue::Unset)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Polymorphic condition comparison.
    pub fn matches(&self, expected: &FieldValue) -> bool {
        match (self, expected) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Number(a), FieldValue::Number(b)) => a == b,
            // Legacy rule rows store booleans as "Sim"/"Nao".
            (FieldValue::Bool(a), FieldValue::Text(s))
            | (FieldValue::Text(s), FieldValue::Bool(a)) => match s.as_str() {
                "Sim" => *a,
                "Nao" | "Não" => !*a,
                _ => false,
            },
            _ => false,
        }
    }
}

/// The in-progress specification draft. Created empty, mutated field by
/// field by the editing session, persisted as a JSON blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValveConfiguration {
    pub valve_type: Option<ValveType>,
    pub service_type: Option<ServiceType>,
    /// Selected primary construction norm code.
    pub construction_standard: Option<String>,

    pub diameter_nps: Option<String>,
    pub pressure_class: Option<PressureClass>,
    pub end_type: Option<EndType>,
    pub flange_face: Option<FlangeFace>,

    pub actuation_type: Option<ActuationType>,
    pub torque: Option<f64>,
    pub thrust: Option<f64>,
    pub travel: Option<f64>,
    pub stem_diameter: Option<f64>,
    pub pitch: Option<f64>,
    pub top_flange: Option<String>,

    pub body_material: Option<String>,
    pub obturator_material: Option<String>,
    pub seat_material: Option<String>,
    pub stem_material: Option<String>,

    pub fire_test: Option<FireTestOption>,
    pub low_fugitive_emission: bool,
    pub sil_certification: Option<SilLevel>,
    pub nace_compliant: bool,

    pub fluid: Option<String>,
    pub operating_temperature_c: Option<f64>,
    pub sour_service: bool,

    pub observations: Option<String>,
}

impl ValveConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire_test_required(&self) -> bool {
        self.fire_test == Some(FireTestOption::TestadaAFogo)
    }

    pub fn sil_required(&self) -> Option<SilLevel> {
        match self.sil_certification {
            Some(SilLevel::Na) | None => None,
            other => other,
        }
    }

    /// Flange face is required exactly when the end connection is flanged.
    pub fn requires_flange_face(&self) -> bool {
        self.end_type.map(|e| e.is_flanged()).unwrap_or(false)
    }

    /// Rule-engine snapshot lookup. Unknown keys read as `Unset`.
    pub fn field(&self, key: &str) -> FieldValue {
        fn text(v: &Option<String>) -> FieldValue {
            match v {
                Some(s) if !s.trim().is_empty() => FieldValue::Text(s.clone()),
                _ => FieldValue::Unset,
            }
        }
        fn number(v: &Option<f64>) -> FieldValue {
            v.map(FieldValue::Number).unwrap_or(FieldValue::Unset)
        }
        fn code(v: Option<&'static str>) -> FieldValue {
            v.map(|c| FieldValue::Text(c.to_string()))
                .unwrap_or(FieldValue::Unset)
        }

        match key {
            "valve_type" => code(self.valve_type.map(|v| v.code())),
            "service_type" => code(self.service_type.map(|v| v.code())),
            "construction_standard" => text(&self.construction_standard),
            "diameter_nps" => text(&self.diameter_nps),
            "pressure_class" => code(self.pressure_class.map(|v| v.code())),
            "end_type" => code(self.end_type.map(|v| v.code())),
            "flange_face" => code(self.flange_face.map(|v| v.code())),
            "actuation_type" => code(self.actuation_type.map(|v| v.code())),
            "torque" => number(&self.torque),
            "thrust" => number(&self.thrust),
            "travel" => number(&self.travel),
            "stem_diameter" => number(&self.stem_diameter),
            "pitch" => number(&self.pitch),
            "top_flange" => text(&self.top_flange),
            "body_material" => text(&self.body_material),
            "obturator_material" => text(&self.obturator_material),
            "seat_material" => text(&self.seat_material),
            "stem_material" => text(&self.stem_material),
            "fire_safe" => FieldValue::Bool(self.fire_test_required()),
            "low_fugitive_emission" => FieldValue::Bool(self.low_fugitive_emission),
            "sil_certification" => code(self.sil_certification.map(|v| v.code())),
            "nace_compliant" => FieldValue::Bool(self.nace_compliant),
            "fluid" => text(&self.fluid),
            "operating_temperature" => number(&self.operating_temperature_c),
            "sour_service" => FieldValue::Bool(self.sour_service),
            "observations" => text(&self.observations),
            _ => FieldValue::Unset,
        }
    }

    /// True if any textual field carries the given value. Used by norm
    /// constraints that block a value wherever it appears.
    pub fn contains_value(&self, value: &str) -> bool {
        [
            &self.construction_standard,
            &self.body_material,
            &self.obturator_material,
            &self.seat_material,
            &self.stem_material,
            &self.top_flange,
            &self.fluid,
        ]
        .iter()
        .any(|f| f.as_deref() == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_coerces_sim_nao() {
        assert!(FieldValue::Bool(true).matches(&FieldValue::Text("Sim".into())));
        assert!(FieldValue::Bool(false).matches(&FieldValue::Text("Nao".into())));
        assert!(!FieldValue::Bool(false).matches(&FieldValue::Text("Sim".into())));
        assert!(!FieldValue::Bool(true).matches(&FieldValue::Text("qualquer".into())));
    }

    #[test]
    fn status_transitions_forward_only() {
        assert!(SpecStatus::Draft.can_transition_to(SpecStatus::Submitted));
        assert!(SpecStatus::Submitted.can_transition_to(SpecStatus::Approved));
        assert!(!SpecStatus::Published.can_transition_to(SpecStatus::Draft));
        // Rework path.
        assert!(SpecStatus::Rejected.can_transition_to(SpecStatus::Draft));
        assert!(SpecStatus::Submitted.can_transition_to(SpecStatus::Rejected));
        assert!(!SpecStatus::Draft.can_transition_to(SpecStatus::Rejected));
    }

    #[test]
    fn configuration_roundtrips_wire_values() {
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.pressure_class = Some(PressureClass::C600);
        config.end_type = Some(EndType::Flangeado);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["valveType"], "ESFERA");
        assert_eq!(json["pressureClass"], "600");
        assert_eq!(json["endType"], "FLANGEADO");

        let back: ValveConfiguration = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
