//! Material Compatibility Filter
//!
//! Narrows per-role candidate sets under the active special requirements.
//! An empty result blocks the role; the filter is never silently relaxed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MaterialRole {
    #[serde(rename = "CORPO")]
    Body,
    #[serde(rename = "OBTURADOR")]
    Obturator,
    #[serde(rename = "SEDE")]
    Seat,
    #[serde(rename = "HASTE")]
    Stem,
}

impl MaterialRole {
    pub fn field_name(&self) -> &'static str {
        match self {
            MaterialRole::Body => "body_material",
            MaterialRole::Obturator => "obturator_material",
            MaterialRole::Seat => "seat_material",
            MaterialRole::Stem => "stem_material",
        }
    }
}

/// One row of the norm's material compatibility table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct MaterialRecord {
    pub code: String,
    pub name: String,
    pub role: MaterialRole,
    pub nace_qualified: bool,
    pub nace_temperature_min: Option<f64>,
    pub nace_hardness_max: Option<f64>,
    pub fire_test_compatible: bool,
    pub low_emission_compatible: bool,
    pub compatible_with: Vec<String>,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            code: String::new(),
            name: String::new(),
            role: MaterialRole::Body,
            nace_qualified: false,
            nace_temperature_min: None,
            nace_hardness_max: None,
            fire_test_compatible: false,
            low_emission_compatible: false,
            compatible_with: Vec::new(),
        }
    }
}

impl MaterialRecord {
    pub fn new(code: &str, name: &str, role: MaterialRole) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            role,
            ..Self::default()
        }
    }

    pub fn nace(mut self, temperature_min: f64, hardness_max: f64) -> Self {
        self.nace_qualified = true;
        self.nace_temperature_min = Some(temperature_min);
        self.nace_hardness_max = Some(hardness_max);
        self
    }

    pub fn fire_test(mut self) -> Self {
        self.fire_test_compatible = true;
        self
    }

    pub fn low_emission(mut self) -> Self {
        self.low_emission_compatible = true;
        self
    }

    pub fn compatible(mut self, codes: &[&str]) -> Self {
        self.compatible_with = codes.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Role-partitioned material lists, as returned by the norm resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaterialsByRole {
    pub body: Vec<MaterialRecord>,
    pub obturator: Vec<MaterialRecord>,
    pub seat: Vec<MaterialRecord>,
    pub stem: Vec<MaterialRecord>,
}

impl MaterialsByRole {
    pub fn partition(records: impl IntoIterator<Item = MaterialRecord>) -> Self {
        let mut out = Self::default();
        for record in records {
            match record.role {
                MaterialRole::Body => out.body.push(record),
                MaterialRole::Obturator => out.obturator.push(record),
                MaterialRole::Seat => out.seat.push(record),
                MaterialRole::Stem => out.stem.push(record),
            }
        }
        out
    }

    pub fn for_role(&self, role: MaterialRole) -> &[MaterialRecord] {
        match role {
            MaterialRole::Body => &self.body,
            MaterialRole::Obturator => &self.obturator,
            MaterialRole::Seat => &self.seat,
            MaterialRole::Stem => &self.stem,
        }
    }

    pub fn find(&self, role: MaterialRole, code: &str) -> Option<&MaterialRecord> {
        self.for_role(role).iter().find(|m| m.code == code)
    }
}

/// Active special-requirement toggles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct Requirements {
    pub nace_required: bool,
    pub fire_test_required: bool,
    pub low_emission_required: bool,
}

/// Fire-test qualification envelope for one valve type: the material
/// combinations and pressure ceiling a certified design covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct FireTestCompatibility {
    pub valve_type: String,
    pub allowed_body_materials: Vec<String>,
    pub allowed_seat_materials: Vec<String>,
    pub max_pressure_rating: Option<u32>,
    pub norm_code: Option<String>,
}

impl Default for FireTestCompatibility {
    fn default() -> Self {
        Self {
            valve_type: String::new(),
            allowed_body_materials: Vec::new(),
            allowed_seat_materials: Vec::new(),
            max_pressure_rating: None,
            norm_code: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FireTestVerdict {
    pub is_valid: bool,
    pub message: String,
    pub applicable_norms: Vec<String>,
}

/// Check a body/seat/pressure combination against the fire-test envelopes
/// for a valve type. No envelope data for the type is a blocking condition.
pub fn check_fire_test_combination(
    entries: &[FireTestCompatibility],
    valve_type: &str,
    body_material: &str,
    seat_material: &str,
    pressure_class_rating: u32,
) -> FireTestVerdict {
    let for_type: Vec<&FireTestCompatibility> = entries
        .iter()
        .filter(|e| e.valve_type == valve_type)
        .collect();

    if for_type.is_empty() {
        return FireTestVerdict {
            is_valid: false,
            message: format!("No fire test compatibility data for valve type {valve_type}"),
            applicable_norms: Vec::new(),
        };
    }

    let matching: Vec<&&FireTestCompatibility> = for_type
        .iter()
        .filter(|e| {
            e.allowed_body_materials.iter().any(|m| m == body_material)
                && e.allowed_seat_materials.iter().any(|m| m == seat_material)
                && pressure_class_rating <= e.max_pressure_rating.unwrap_or(u32::MAX)
        })
        .collect();

    if matching.is_empty() {
        return FireTestVerdict {
            is_valid: false,
            message: format!(
                "Material combination not fire-test compatible: body={body_material}, seat={seat_material}"
            ),
            applicable_norms: Vec::new(),
        };
    }

    FireTestVerdict {
        is_valid: true,
        message: "Combination compatible with fire test".to_string(),
        applicable_norms: matching
            .iter()
            .filter_map(|e| e.norm_code.clone())
            .collect(),
    }
}

/// AND-composed requirement filter; for the seat role, additionally keeps
/// only seats compatible with the chosen obturator (either side declaring
/// compatibility is sufficient). An empty result means the role is blocked.
pub fn filter_candidates(
    role: MaterialRole,
    candidates: &[MaterialRecord],
    requirements: &Requirements,
    obturator: Option<&MaterialRecord>,
) -> Vec<MaterialRecord> {
    let mut filtered: Vec<MaterialRecord> = candidates
        .iter()
        .filter(|m| !requirements.nace_required || m.nace_qualified)
        .filter(|m| !requirements.fire_test_required || m.fire_test_compatible)
        .filter(|m| !requirements.low_emission_required || m.low_emission_compatible)
        .cloned()
        .collect();

    if role == MaterialRole::Seat {
        if let Some(obturator) = obturator {
            filtered.retain(|seat| {
                obturator.compatible_with.iter().any(|c| c == &seat.code)
                    || seat.compatible_with.iter().any(|c| c == &obturator.code)
            });
        }
    }

    filtered
}
