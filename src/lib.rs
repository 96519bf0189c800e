//! ValveSpec Core - Fail-Closed Valve Specification Engine
//!
//! # The Five Laws (Non-Negotiable)
//! 1. The Norm Pack Is Truth
//! 2. Unknown Means Blocked
//! 3. Publication Is Gated, Never Bypassed
//! 4. The IMEX Code Is Deterministic
//! 5. Decisions Leave A Trail

pub mod audit;
pub mod calc;
pub mod catalog;
pub mod config;
pub mod hashing;
pub mod health;
pub mod imex;
pub mod materials;
pub mod norms;
pub mod pipeline;
pub mod publication;
pub mod rules;

pub use audit::{Decision, DecisionLog, DecisionRecord, DecisionType};
pub use calc::{calculate_sil, calculate_torque, SilAssessment, SilParameters, TorqueEstimate};
pub use catalog::{Catalog, CatalogCategory, CatalogItem};
pub use config::{
    ActuationType, EndType, FieldValue, FireTestOption, FlangeFace, PressureClass, ServiceType,
    SilLevel, SpecStatus, ValveConfiguration, ValveType,
};
pub use hashing::{canonical_json, decision_hash, snapshot_hash};
pub use health::{check_system_health, HealthReport, HealthStatus};
pub use imex::{
    build_imex_code, encode_size_class, parse_nps_to_inch, BuildResult, CodeConfidence,
    DescriptionSegment, MaterialCode,
};
pub use materials::{
    check_fire_test_combination, filter_candidates, FireTestCompatibility, FireTestVerdict,
    MaterialRecord, MaterialRole, MaterialsByRole, Requirements,
};
pub use norms::{
    resolve, validate_constraints, Norm, NormPack, NormResolution, NormType, PackRegistry,
};
pub use pipeline::{Configurator, ConfiguratorError, PublishOutcome, ResolutionToken, SaveRecord};
pub use publication::{
    validate_for_publication, CheckStatus, PublicationCheck, PublicationResult,
};
pub use rules::{evaluate, FieldRule, RuleAction, RuleEvaluation, RuleSet};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_PACK_VERSION: &str = "2.0.0";
