//! Configurator Pipeline - Single Entry Point
//!
//! CRITICAL: publish MUST run the full publication validator internally.
//! No bypass.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{Decision, DecisionLog, DecisionType};
use crate::calc::{self, SilAssessment, SilParameters, TorqueEstimate};
use crate::catalog::Catalog;
use crate::config::{ServiceType, SilLevel, SpecStatus, ValveConfiguration, ValveType};
use crate::health::{self, HealthReport};
use crate::imex::{self, BuildResult};
use crate::materials::{self, MaterialRecord, MaterialRole, Requirements};
use crate::norms::{self, ConstraintValidation, NormPack, NormResolution, PackRegistry};
use crate::publication::{self, PublicationResult};
use crate::rules::{self, RuleEvaluation, RuleSet};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
static PUBLICATION_VALIDATION_COUNT: AtomicU64 = AtomicU64::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_publication_validation_count() -> u64 {
    PUBLICATION_VALIDATION_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_publication_validation_count() {
    PUBLICATION_VALIDATION_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum ConfiguratorError {
    #[error("No single ACTIVE norm pack ({0} active versions)")]
    NoActivePack(usize),

    #[error("Norm pack {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version string: {0}")]
    InvalidVersion(String),

    #[error("Publication blocked: {0}")]
    PublicationBlocked(String),

    #[error("System health blocks the operation: {0}")]
    SystemBlocked(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Monotonic token for last-request-wins resolution. A caller takes a
/// token before resolving and discards the result if a newer request
/// superseded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionToken(u64);

/// Fields persisted alongside the configuration blob. INCOMPLETO/DRAFT are
/// derived here; workflow statuses are preserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SaveRecord {
    pub status: SpecStatus,
    pub missing_fields: Vec<String>,
    pub imex_code: String,
    pub is_complete: bool,
    pub completion_percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PublishOutcome {
    pub success: bool,
    pub spec_code: Option<String>,
    pub errors: Vec<String>,
}

/// The configurator engine. Owns the injected catalog, pack registry and
/// rule table; every operation is read-only over a configuration snapshot.
pub struct Configurator {
    catalog: Catalog,
    packs: PackRegistry,
    rules: RuleSet,
    decisions: DecisionLog,
    resolution_seq: AtomicU64,
}

impl Configurator {
    /// Fails when no single ACTIVE pack exists or the engine is older than
    /// the pack requires.
    pub fn new(
        catalog: Catalog,
        packs: PackRegistry,
        rules: RuleSet,
    ) -> Result<Self, ConfiguratorError> {
        let configurator = Self {
            catalog,
            packs,
            rules,
            decisions: DecisionLog::new(),
            resolution_seq: AtomicU64::new(0),
        };
        configurator.check_engine_version()?;
        Ok(configurator)
    }

    pub fn with_builtin_data() -> Result<Self, ConfiguratorError> {
        Self::new(Catalog::builtin(), PackRegistry::builtin(), RuleSet::builtin())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn decisions(&self) -> &DecisionLog {
        &self.decisions
    }

    pub fn active_pack(&self) -> Result<&NormPack, ConfiguratorError> {
        self.packs
            .active()
            .ok_or_else(|| ConfiguratorError::NoActivePack(self.packs.active_count()))
    }

    fn check_engine_version(&self) -> Result<(), ConfiguratorError> {
        let pack = self.active_pack()?;
        let engine = semver::Version::parse(ENGINE_VERSION)
            .map_err(|_| ConfiguratorError::InvalidVersion(ENGINE_VERSION.to_string()))?;
        let minimum = semver::Version::parse(&pack.min_engine_version)
            .map_err(|_| ConfiguratorError::InvalidVersion(pack.min_engine_version.clone()))?;
        if engine < minimum {
            return Err(ConfiguratorError::EngineVersionMismatch(
                pack.version.clone(),
                pack.min_engine_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }
        Ok(())
    }

    /// Take a token before an async resolution round trip; apply the result
    /// only if [`Configurator::is_current`] still holds.
    pub fn begin_resolution(&self) -> ResolutionToken {
        ResolutionToken(self.resolution_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: ResolutionToken) -> bool {
        self.resolution_seq.load(Ordering::SeqCst) == token.0
    }

    /// Norm applicability for a (valve type, service type) combination.
    pub fn resolve_norms(
        &self,
        valve_type: Option<ValveType>,
        service_type: Option<ServiceType>,
    ) -> Result<NormResolution, ConfiguratorError> {
        Ok(norms::resolve(self.active_pack()?, valve_type, service_type))
    }

    /// Requirement-filtered candidates for one material role.
    pub fn filter_materials(
        &self,
        role: MaterialRole,
        resolution: &NormResolution,
        requirements: &Requirements,
        obturator_code: Option<&str>,
    ) -> Vec<MaterialRecord> {
        let obturator = obturator_code
            .and_then(|code| resolution.materials.find(MaterialRole::Obturator, code));
        materials::filter_candidates(
            role,
            resolution.materials.for_role(role),
            requirements,
            obturator,
        )
    }

    /// Declarative rules plus fixed engineering checks over a snapshot.
    pub fn evaluate_rules(&self, config: &ValveConfiguration) -> RuleEvaluation {
        rules::evaluate(&self.rules, config)
    }

    /// The primary norm's constraint set over a snapshot.
    pub fn validate_constraints(
        &self,
        config: &ValveConfiguration,
    ) -> Result<ConstraintValidation, ConfiguratorError> {
        let primary = config.construction_standard.as_deref().unwrap_or("");
        Ok(norms::validate_constraints(self.active_pack()?, config, primary))
    }

    /// The publication gate. The returned `can_publish` is the sole
    /// authority for enabling the submit action.
    pub fn validate_for_publication(
        &self,
        config: &ValveConfiguration,
        sil: Option<&SilAssessment>,
    ) -> Result<PublicationResult, ConfiguratorError> {
        #[cfg(feature = "test-hooks")]
        PUBLICATION_VALIDATION_COUNT.fetch_add(1, Ordering::SeqCst);

        Ok(publication::validate_for_publication(
            self.active_pack()?,
            config,
            sil,
        ))
    }

    /// Live IMEX preview; pure over the snapshot, cheap per keystroke.
    pub fn build_imex_code(&self, config: &ValveConfiguration) -> BuildResult {
        imex::build_imex_code(&self.catalog, config)
    }

    pub fn calculate_torque(
        &self,
        valve_size_inches: f64,
        pressure_class_rating: u32,
        seat_material: &str,
    ) -> Result<TorqueEstimate, ConfiguratorError> {
        Ok(calc::calculate_torque(
            self.active_pack()?,
            valve_size_inches,
            pressure_class_rating,
            seat_material,
        ))
    }

    pub fn calculate_sil(
        &self,
        parameters: &SilParameters,
        required: Option<SilLevel>,
    ) -> SilAssessment {
        calc::calculate_sil(parameters, required)
    }

    /// Fire-test envelope check for a body/seat/pressure combination.
    pub fn validate_fire_test_combination(
        &self,
        valve_type: ValveType,
        body_material: &str,
        seat_material: &str,
        pressure_class_rating: u32,
    ) -> Result<materials::FireTestVerdict, ConfiguratorError> {
        Ok(materials::check_fire_test_combination(
            &self.active_pack()?.fire_test_compatibility,
            valve_type.code(),
            body_material,
            seat_material,
            pressure_class_rating,
        ))
    }

    /// Derive the persisted record. Workflow statuses survive; everything
    /// else is recomputed from the encoder result.
    pub fn prepare_for_save(
        &self,
        config: &ValveConfiguration,
        existing_status: Option<SpecStatus>,
    ) -> SaveRecord {
        let build = self.build_imex_code(config);
        let derived = if build.missing.is_empty() {
            SpecStatus::Draft
        } else {
            SpecStatus::Incompleto
        };
        let status = match existing_status {
            Some(
                status @ (SpecStatus::Submitted | SpecStatus::Approved | SpecStatus::Published),
            ) => status,
            _ => derived,
        };
        SaveRecord {
            status,
            completion_percent: build.completion_percent(),
            imex_code: build.value,
            is_complete: build.missing.is_empty(),
            missing_fields: build.missing,
        }
    }

    /// Final publication: system health gate, then the full check sequence.
    /// ALWAYS validates internally; there is no bypass.
    pub fn publish(
        &mut self,
        spec_id: Uuid,
        config: &ValveConfiguration,
        sil: Option<&SilAssessment>,
    ) -> Result<PublishOutcome, ConfiguratorError> {
        let report = self.health_check();
        if report.blocks_new_configurations() {
            return Err(ConfiguratorError::SystemBlocked(
                report.issues.join("; "),
            ));
        }

        let result = self.validate_for_publication(config, sil)?;
        let pack_version = self.active_pack()?.version.clone();

        if !result.can_publish {
            let mut errors = vec!["Specification failed publication checks".to_string()];
            errors.extend(result.blocked_by.iter().filter_map(|id| {
                result.check(id).map(|c| c.message.clone())
            }));
            self.decisions.append(
                DecisionType::Validation,
                Decision {
                    spec_id: Some(spec_id),
                    rejection_reason: Some(errors.join("; ")),
                    ..Decision::default()
                },
                config,
                &pack_version,
            )?;
            return Ok(PublishOutcome {
                success: false,
                spec_code: None,
                errors,
            });
        }

        let valve = config
            .valve_type
            .map(|v| v.code())
            .unwrap_or("UNKNOWN");
        let spec_code = format!(
            "IMEX-{valve}-{}",
            spec_id.simple().to_string()[..8].to_uppercase()
        );
        self.decisions.append(
            DecisionType::Validation,
            Decision::selection("spec_code", &spec_code).for_spec(spec_id),
            config,
            &pack_version,
        )?;

        Ok(PublishOutcome {
            success: true,
            spec_code: Some(spec_code),
            errors: Vec::new(),
        })
    }

    /// Record a decision against the active pack version.
    pub fn log_decision(
        &mut self,
        decision_type: DecisionType,
        decision: Decision,
        config: &ValveConfiguration,
    ) -> Result<Uuid, ConfiguratorError> {
        let pack_version = self.active_pack()?.version.clone();
        Ok(self
            .decisions
            .append(decision_type, decision, config, &pack_version)?)
    }

    pub fn health_check(&self) -> HealthReport {
        health::check_system_health(&self.packs)
    }

    /// Explicit invalidate/reload of the injected stores.
    pub fn reload(&mut self, catalog: Catalog, packs: PackRegistry) -> Result<(), ConfiguratorError> {
        self.catalog = catalog;
        self.packs = packs;
        self.check_engine_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norms::PackStatus;

    #[test]
    fn construction_requires_single_active_pack() {
        let mut pack = NormPack::builtin();
        pack.status = PackStatus::Deprecated;
        let result = Configurator::new(
            Catalog::builtin(),
            PackRegistry::new(vec![pack]),
            RuleSet::builtin(),
        );
        assert!(matches!(result, Err(ConfiguratorError::NoActivePack(0))));
    }

    #[test]
    fn construction_rejects_future_pack() {
        let mut pack = NormPack::builtin();
        pack.min_engine_version = "99.0.0".to_string();
        let result = Configurator::new(
            Catalog::builtin(),
            PackRegistry::new(vec![pack]),
            RuleSet::builtin(),
        );
        assert!(matches!(
            result,
            Err(ConfiguratorError::EngineVersionMismatch(..))
        ));
    }

    #[test]
    fn stale_resolution_tokens_are_detected() {
        let configurator = Configurator::with_builtin_data().unwrap();
        let first = configurator.begin_resolution();
        assert!(configurator.is_current(first));
        let second = configurator.begin_resolution();
        assert!(!configurator.is_current(first));
        assert!(configurator.is_current(second));
    }

    #[test]
    fn prepare_for_save_derives_status() {
        let configurator = Configurator::with_builtin_data().unwrap();
        let mut config = ValveConfiguration::new();

        let record = configurator.prepare_for_save(&config, None);
        assert_eq!(record.status, SpecStatus::Incompleto);
        assert!(!record.is_complete);
        assert!(record.imex_code.contains("???"));

        config.valve_type = Some(ValveType::Esfera);
        config.diameter_nps = Some("8".to_string());
        config.pressure_class = Some(crate::config::PressureClass::C600);
        config.end_type = Some(crate::config::EndType::Flangeado);
        config.flange_face = Some(crate::config::FlangeFace::Rf);
        config.body_material = Some("ASTM_A216_WCB".to_string());
        config.seat_material = Some("PTFE".to_string());
        config.actuation_type = Some(crate::config::ActuationType::Manual);

        let record = configurator.prepare_for_save(&config, None);
        assert_eq!(record.status, SpecStatus::Draft);
        assert!(record.is_complete);
        assert_eq!(record.completion_percent, 100);

        // Workflow statuses are never downgraded by a save.
        let record = configurator.prepare_for_save(&config, Some(SpecStatus::Approved));
        assert_eq!(record.status, SpecStatus::Approved);
    }

    #[test]
    fn publish_refuses_incomplete_draft_and_logs_decision() {
        let mut configurator = Configurator::with_builtin_data().unwrap();
        let outcome = configurator
            .publish(Uuid::new_v4(), &ValveConfiguration::new(), None)
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.spec_code.is_none());
        assert!(outcome.errors.len() > 1);
        assert_eq!(configurator.decisions().len(), 1);
    }
}
