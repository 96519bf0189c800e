//! Field/Value Rule Engine
//!
//! Declarative if/then rules keyed by (trigger field, trigger value), applied
//! in descending priority over the configuration snapshot, plus a fixed set
//! of cross-field engineering checks that always run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{ActuationType, FieldValue, ValveConfiguration, ValveType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Show,
    Hide,
    Enable,
    Block,
    Require,
    Suggest,
    Validate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct FieldRule {
    pub id: String,
    /// None applies the rule to every valve type.
    pub valve_type: Option<ValveType>,
    pub trigger_field: String,
    pub trigger_value: FieldValue,
    pub target_field: String,
    pub action: RuleAction,
    pub allowed_values: Vec<String>,
    pub suggested_value: Option<String>,
    pub error_message: Option<String>,
    pub warning_message: Option<String>,
    pub priority: i32,
}

impl Default for FieldRule {
    fn default() -> Self {
        Self {
            id: String::new(),
            valve_type: None,
            trigger_field: String::new(),
            trigger_value: FieldValue::Unset,
            target_field: String::new(),
            action: RuleAction::Show,
            allowed_values: Vec::new(),
            suggested_value: None,
            error_message: None,
            warning_message: None,
            priority: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Production rule table.
    pub fn builtin() -> Self {
        Self::new(vec![
            FieldRule {
                id: "flange_face_show".to_string(),
                trigger_field: "end_type".to_string(),
                trigger_value: FieldValue::Text("FLANGEADO".to_string()),
                target_field: "flange_face".to_string(),
                action: RuleAction::Show,
                priority: 90,
                ..Default::default()
            },
            FieldRule {
                id: "flange_face_required".to_string(),
                trigger_field: "end_type".to_string(),
                trigger_value: FieldValue::Text("FLANGEADO".to_string()),
                target_field: "flange_face".to_string(),
                action: RuleAction::Require,
                error_message: Some("Flanged ends require a flange face".to_string()),
                priority: 80,
                ..Default::default()
            },
            FieldRule {
                id: "fire_safe_seat_block".to_string(),
                trigger_field: "fire_safe".to_string(),
                trigger_value: FieldValue::Text("Sim".to_string()),
                target_field: "seat_material".to_string(),
                action: RuleAction::Block,
                allowed_values: ["METAL", "STELLITE", "INCONEL", "GRAFITE", "ENP"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                error_message: Some(
                    "Fire-safe certification requires a fire-tested seat material".to_string(),
                ),
                priority: 70,
                ..Default::default()
            },
            FieldRule {
                id: "manual_hides_top_flange".to_string(),
                valve_type: Some(ValveType::Esfera),
                trigger_field: "actuation_type".to_string(),
                trigger_value: FieldValue::Text("MANUAL".to_string()),
                target_field: "top_flange".to_string(),
                action: RuleAction::Hide,
                priority: 50,
                ..Default::default()
            },
            FieldRule {
                id: "wellhead_suggests_super_duplex".to_string(),
                trigger_field: "service_type".to_string(),
                trigger_value: FieldValue::Text("WELLHEAD".to_string()),
                target_field: "body_material".to_string(),
                action: RuleAction::Suggest,
                suggested_value: Some("ASTM_A995_5A".to_string()),
                warning_message: Some(
                    "Wellhead service usually specifies super duplex bodies".to_string(),
                ),
                priority: 40,
                ..Default::default()
            },
            FieldRule {
                id: "sil3_actuation".to_string(),
                trigger_field: "sil_certification".to_string(),
                trigger_value: FieldValue::Text("SIL3".to_string()),
                target_field: "actuation_type".to_string(),
                action: RuleAction::Validate,
                allowed_values: ["PNEUMATICO", "HIDRAULICO"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                error_message: Some(
                    "SIL3 requires a spring-return pneumatic or hydraulic actuator".to_string(),
                ),
                priority: 60,
                ..Default::default()
            },
        ])
    }

    /// Rules applicable to a valve type, highest priority first.
    fn applicable(&self, valve_type: Option<ValveType>) -> Vec<&FieldRule> {
        let mut rules: Vec<&FieldRule> = self
            .rules
            .iter()
            .filter(|r| r.valve_type.is_none() || r.valve_type == valve_type)
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        rules
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedField {
    pub field: String,
    pub action: RuleAction,
    pub allowed_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldVisibility {
    Visible,
    Hidden,
    Blocked,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleEvaluation {
    pub errors: BTreeMap<String, String>,
    pub warnings: BTreeMap<String, String>,
    pub suggestions: BTreeMap<String, Suggestion>,
    pub affected_fields: Vec<AffectedField>,
}

impl RuleEvaluation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Hide wins over block; untouched fields are visible.
    pub fn visibility(&self, field: &str) -> FieldVisibility {
        let mut blocked = false;
        for affected in self.affected_fields.iter().filter(|a| a.field == field) {
            match affected.action {
                RuleAction::Hide => return FieldVisibility::Hidden,
                RuleAction::Block => blocked = true,
                _ => {}
            }
        }
        if blocked {
            FieldVisibility::Blocked
        } else {
            FieldVisibility::Visible
        }
    }

    pub fn allowed_values(&self, field: &str) -> Option<&[String]> {
        self.affected_fields
            .iter()
            .find(|a| a.field == field && a.allowed_values.is_some())
            .and_then(|a| a.allowed_values.as_deref())
    }
}

/// Evaluate the declarative rule table and the fixed engineering checks
/// against one configuration snapshot.
pub fn evaluate(rules: &RuleSet, config: &ValveConfiguration) -> RuleEvaluation {
    let mut out = RuleEvaluation::default();

    for rule in rules.applicable(config.valve_type) {
        let trigger = config.field(&rule.trigger_field);
        if !trigger.matches(&rule.trigger_value) {
            continue;
        }

        let target = config.field(&rule.target_field);
        match rule.action {
            RuleAction::Show | RuleAction::Hide | RuleAction::Enable => {
                out.affected_fields.push(AffectedField {
                    field: rule.target_field.clone(),
                    action: rule.action,
                    allowed_values: none_if_empty(&rule.allowed_values),
                });
            }
            RuleAction::Block => {
                if let Some(current) = target.as_text() {
                    if !rule.allowed_values.is_empty()
                        && !rule.allowed_values.iter().any(|v| v == current)
                    {
                        out.errors.insert(
                            rule.target_field.clone(),
                            rule.error_message.clone().unwrap_or_else(|| {
                                format!(
                                    "Value \"{current}\" not permitted. Options: {}",
                                    rule.allowed_values.join(", ")
                                )
                            }),
                        );
                    }
                }
                out.affected_fields.push(AffectedField {
                    field: rule.target_field.clone(),
                    action: RuleAction::Block,
                    allowed_values: none_if_empty(&rule.allowed_values),
                });
            }
            RuleAction::Require => {
                if !target.is_set() {
                    out.errors.insert(
                        rule.target_field.clone(),
                        rule.error_message.clone().unwrap_or_else(|| {
                            format!(
                                "Field required when {} = {:?}",
                                rule.trigger_field, rule.trigger_value
                            )
                        }),
                    );
                }
                out.affected_fields.push(AffectedField {
                    field: rule.target_field.clone(),
                    action: RuleAction::Require,
                    allowed_values: None,
                });
            }
            RuleAction::Suggest => {
                // Never overwrites a value the user already set.
                if let Some(value) = &rule.suggested_value {
                    if !target.is_set() {
                        out.suggestions.insert(
                            rule.target_field.clone(),
                            Suggestion {
                                value: value.clone(),
                                message: rule
                                    .warning_message
                                    .clone()
                                    .unwrap_or_else(|| format!("Suggestion: {value}")),
                            },
                        );
                    }
                }
            }
            RuleAction::Validate => {
                if let Some(current) = target.as_text() {
                    if !rule.allowed_values.is_empty()
                        && !rule.allowed_values.iter().any(|v| v == current)
                    {
                        out.errors.insert(
                            rule.target_field.clone(),
                            rule.error_message.clone().unwrap_or_else(|| {
                                format!("Invalid value for {}", rule.target_field)
                            }),
                        );
                    }
                }
            }
        }

        if let Some(warning) = &rule.warning_message {
            if rule.action != RuleAction::Suggest && !out.errors.contains_key(&rule.target_field) {
                out.warnings.insert(rule.target_field.clone(), warning.clone());
            }
        }
    }

    apply_engineering_checks(config, &mut out);
    out
}

fn none_if_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

const CARBON_STEEL_BODIES: [&str; 3] = ["ASTM_A216_WCB", "ASTM_A105", "ASTM_A106"];
const SEAWATER_BODIES: [&str; 4] = [
    "ASTM_A995_4A",
    "ASTM_A995_5A",
    "ASTM_A995_6A",
    "ASTM_A351_CF8M",
];

/// Fixed cross-field checks; engineering domain knowledge that is not
/// data-driven and always runs in addition to the rule table.
fn apply_engineering_checks(config: &ValveConfiguration, out: &mut RuleEvaluation) {
    let fluid = config.fluid.as_deref().unwrap_or("").to_lowercase();

    // Sour service needs a NACE-qualified body.
    if config.nace_compliant || config.sour_service {
        if let Some(body) = config.body_material.as_deref() {
            if CARBON_STEEL_BODIES.contains(&body) {
                out.errors.insert(
                    "body_material".to_string(),
                    "Material not qualified for NACE/sour service. Use stainless or duplex."
                        .to_string(),
                );
            }
        }
    }

    // PTFE seats survive API 607 fire tests poorly; warn, the publication
    // gate applies the hard block.
    if config.fire_test_required() && config.seat_material.as_deref() == Some("PTFE") {
        out.warnings.entry("seat_material".to_string()).or_insert_with(|| {
            "PTFE may not meet full fire-safe requirements. Consider RPTFE or metal seats."
                .to_string()
        });
    }

    if fluid.contains("seawater") || fluid.contains("agua do mar") {
        if let Some(body) = config.body_material.as_deref() {
            if !SEAWATER_BODIES.iter().any(|m| body.contains(m)) {
                out.warnings.insert(
                    "body_material".to_string(),
                    "Seawater service favors duplex or 316 stainless bodies.".to_string(),
                );
            }
        }
    }

    if config.operating_temperature_c.map_or(false, |t| t > 200.0) {
        if matches!(config.seat_material.as_deref(), Some("PTFE") | Some("RPTFE")) {
            out.errors.insert(
                "seat_material".to_string(),
                "PTFE seats are not rated above 200 C. Use PEEK or metal seats.".to_string(),
            );
        }
    }

    if (fluid.contains("h2s") || config.sour_service) && !config.nace_compliant {
        out.warnings.insert(
            "nace_compliant".to_string(),
            "Fluid carries H2S. NACE MR0175 compliance is recommended.".to_string(),
        );
    }

    apply_actuator_checks(config, out);
}

/// Linear valves are sized by stem/travel/thrust, quarter-turn valves by
/// torque and top flange; only checked once a powered actuator is chosen.
fn apply_actuator_checks(config: &ValveConfiguration, out: &mut RuleEvaluation) {
    let valve_type = match (config.valve_type, config.actuation_type) {
        (Some(v), Some(a)) if a != ActuationType::Manual => v,
        _ => return,
    };

    if valve_type.is_linear() {
        for (value, field) in [
            (config.stem_diameter, "stem_diameter"),
            (config.travel, "travel"),
            (config.thrust, "thrust"),
        ] {
            if value.is_none() {
                out.errors.insert(
                    field.to_string(),
                    "Required for actuated linear valves".to_string(),
                );
            }
        }
    } else if valve_type.is_quarter_turn() {
        if config.torque.is_none() {
            out.errors.insert(
                "torque".to_string(),
                "Required for actuated quarter-turn valves".to_string(),
            );
        }
        if config.top_flange.as_deref().map_or(true, |t| t.trim().is_empty()) {
            out.errors.insert(
                "top_flange".to_string(),
                "ISO 5211 top flange required for actuated quarter-turn valves".to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndType, FireTestOption};

    #[test]
    fn flanged_without_face_is_required_error() {
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.end_type = Some(EndType::Flangeado);

        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(!result.is_valid());
        assert!(result.errors.contains_key("flange_face"));
    }

    #[test]
    fn fire_safe_blocks_polymer_seat_via_sim_coercion() {
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.fire_test = Some(FireTestOption::TestadaAFogo);
        config.seat_material = Some("NYLON".to_string());

        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(result.errors.contains_key("seat_material"));
        assert_eq!(
            result.allowed_values("seat_material").map(|v| v.len()),
            Some(5)
        );
        assert_eq!(
            result.visibility("seat_material"),
            FieldVisibility::Blocked
        );
    }

    #[test]
    fn suggestion_never_overwrites_existing_value() {
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.service_type = Some(crate::config::ServiceType::Wellhead);
        config.body_material = Some("ASTM_A351_CF8M".to_string());

        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(!result.suggestions.contains_key("body_material"));

        config.body_material = None;
        let result = evaluate(&RuleSet::builtin(), &config);
        assert_eq!(
            result.suggestions["body_material"].value,
            "ASTM_A995_5A"
        );
    }

    #[test]
    fn high_temperature_ptfe_seat_is_hard_error() {
        let mut config = ValveConfiguration::new();
        config.operating_temperature_c = Some(250.0);
        config.seat_material = Some("RPTFE".to_string());

        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(result.errors.contains_key("seat_material"));
    }

    #[test]
    fn h2s_fluid_without_nace_warns() {
        let mut config = ValveConfiguration::new();
        config.fluid = Some("Gas with H2S traces".to_string());

        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(result.warnings.contains_key("nace_compliant"));
        assert!(result.is_valid());
    }

    #[test]
    fn actuated_quarter_turn_requires_torque_and_top_flange() {
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);
        config.actuation_type = Some(ActuationType::Pneumatico);

        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(result.errors.contains_key("torque"));
        assert!(result.errors.contains_key("top_flange"));

        config.actuation_type = Some(ActuationType::Manual);
        let result = evaluate(&RuleSet::builtin(), &config);
        assert!(!result.errors.contains_key("torque"));
    }

    #[test]
    fn hide_wins_over_block() {
        let rules = RuleSet::new(vec![
            FieldRule {
                id: "a".to_string(),
                trigger_field: "nace_compliant".to_string(),
                trigger_value: FieldValue::Bool(true),
                target_field: "fluid".to_string(),
                action: RuleAction::Block,
                allowed_values: vec!["GAS".to_string()],
                priority: 10,
                ..Default::default()
            },
            FieldRule {
                id: "b".to_string(),
                trigger_field: "nace_compliant".to_string(),
                trigger_value: FieldValue::Bool(true),
                target_field: "fluid".to_string(),
                action: RuleAction::Hide,
                priority: 5,
                ..Default::default()
            },
        ]);
        let mut config = ValveConfiguration::new();
        config.nace_compliant = true;

        let result = evaluate(&rules, &config);
        assert_eq!(result.visibility("fluid"), FieldVisibility::Hidden);
    }
}
