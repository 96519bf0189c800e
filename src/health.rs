//! System Health Check - the circuit breaker above the per-draft validator
//!
//! An unhealthy rule catalog blocks creation of new configurations
//! entirely. Absence of data is a blocking condition, never a pass-through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::norms::PackRegistry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub active_pack_count: usize,
    pub norm_coverage_percent: f64,
    pub domain_coverage_percent: f64,
    pub issues: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn blocks_new_configurations(&self) -> bool {
        self.status == HealthStatus::Blocked
    }
}

/// Inspect the pack registry: exactly one ACTIVE version, minimum norm
/// count, valve-type coverage on every standard, populated domains.
pub fn check_system_health(registry: &PackRegistry) -> HealthReport {
    let mut issues: Vec<String> = Vec::new();
    let mut blocking = false;

    let active_pack_count = registry.active_count();
    if active_pack_count == 0 {
        issues.push("No ACTIVE rule catalog version found".to_string());
        blocking = true;
    } else if active_pack_count > 1 {
        issues.push(format!(
            "{active_pack_count} ACTIVE rule catalog versions (exactly 1 expected)"
        ));
        blocking = true;
    }

    let mut norm_coverage_percent = 0.0;
    let mut domain_coverage_percent = 0.0;

    if let Some(pack) = registry.active() {
        let norm_count = pack.norm_count();
        let minimum = pack.system_requirements.min_norms_for_operation;
        if norm_count < minimum {
            issues.push(format!(
                "Insufficient norm base: requires {minimum} norms, found {norm_count}"
            ));
            blocking = true;
        }

        let without_types = pack
            .norms
            .values()
            .filter(|n| n.valve_types.is_empty())
            .count();
        if without_types > 0 {
            issues.push(format!("{without_types} norms without valve types defined"));
        }
        if norm_count > 0 {
            norm_coverage_percent =
                ((norm_count - without_types) as f64 / norm_count as f64) * 100.0;
        }

        let domains: Vec<&Vec<String>> = pack
            .norms
            .values()
            .flat_map(|n| n.domains.values())
            .collect();
        let empty_domains = domains.iter().filter(|d| d.is_empty()).count();
        if empty_domains > 0 {
            issues.push(format!("{empty_domains} domains without allowed values"));
        }
        if !domains.is_empty() {
            domain_coverage_percent =
                ((domains.len() - empty_domains) as f64 / domains.len() as f64) * 100.0;
            if domain_coverage_percent < pack.system_requirements.required_domain_completeness {
                issues.push(format!(
                    "Incomplete norm domains: {domain_coverage_percent:.1}% coverage"
                ));
                blocking = true;
            }
        }
    }

    let status = if blocking {
        HealthStatus::Blocked
    } else if issues.is_empty() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    HealthReport {
        status,
        active_pack_count,
        norm_coverage_percent,
        domain_coverage_percent,
        issues,
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::norms::{NormPack, PackStatus};

    #[test]
    fn builtin_registry_is_healthy() {
        let report = check_system_health(&PackRegistry::builtin());
        assert!(report.is_healthy(), "issues: {:?}", report.issues);
        assert_eq!(report.active_pack_count, 1);
        assert_eq!(report.norm_coverage_percent, 100.0);
    }

    #[test]
    fn zero_active_packs_blocks() {
        let mut pack = NormPack::builtin();
        pack.status = PackStatus::Deprecated;
        let report = check_system_health(&PackRegistry::new(vec![pack]));
        assert!(report.blocks_new_configurations());
    }

    #[test]
    fn duplicate_active_packs_block() {
        let report = check_system_health(&PackRegistry::new(vec![
            NormPack::builtin(),
            NormPack::builtin(),
        ]));
        assert!(report.blocks_new_configurations());
        assert_eq!(report.active_pack_count, 2);
    }

    #[test]
    fn sparse_pack_blocks_on_minimum_norms() {
        let mut pack = NormPack::builtin();
        let keep: Vec<String> = pack.norms.keys().take(2).cloned().collect();
        pack.norms.retain(|code, _| keep.contains(code));
        let report = check_system_health(&PackRegistry::new(vec![pack]));
        assert!(report.blocks_new_configurations());
    }
}
