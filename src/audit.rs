//! Norm Decision Log - audit trail for traceability
//!
//! Checks are ephemeral and recomputed on every change; what persists is
//! the log of decisions taken, each bound to its configuration snapshot by
//! a canonical hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ValveConfiguration;
use crate::hashing;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    NormSelection,
    MaterialChoice,
    TestRequirement,
    Calculation,
    Validation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub spec_id: Option<Uuid>,
    pub decision_type: DecisionType,
    pub parameter_name: Option<String>,
    pub selected_value: Option<String>,
    pub rejected_norms: Vec<String>,
    pub rejection_reason: Option<String>,
    pub snapshot_hash: String,
    pub created_at: DateTime<Utc>,
}

/// What the caller supplies; identity, hash and timestamp are stamped by
/// the log on append.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub spec_id: Option<Uuid>,
    pub parameter_name: Option<String>,
    pub selected_value: Option<String>,
    pub rejected_norms: Vec<String>,
    pub rejection_reason: Option<String>,
}

impl Decision {
    pub fn selection(parameter: &str, value: &str) -> Self {
        Self {
            parameter_name: Some(parameter.to_string()),
            selected_value: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn for_spec(mut self, spec_id: Uuid) -> Self {
        self.spec_id = Some(spec_id);
        self
    }

    pub fn rejecting(mut self, norms: &[String], reason: &str) -> Self {
        self.rejected_norms = norms.to_vec();
        self.rejection_reason = Some(reason.to_string());
        self
    }
}

/// Append-only in-memory log; the persistence layer drains it into the
/// relational store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionLog {
    records: Vec<DecisionRecord>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        decision_type: DecisionType,
        decision: Decision,
        snapshot: &ValveConfiguration,
        pack_version: &str,
    ) -> Result<Uuid, serde_json::Error> {
        let id = Uuid::new_v4();
        let snapshot_hash =
            hashing::decision_hash(pack_version, snapshot, crate::ENGINE_VERSION)?;
        self.records.push(DecisionRecord {
            id,
            spec_id: decision.spec_id,
            decision_type,
            parameter_name: decision.parameter_name,
            selected_value: decision.selected_value,
            rejected_norms: decision.rejected_norms,
            rejection_reason: decision.rejection_reason,
            snapshot_hash,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn for_spec(&self, spec_id: Uuid) -> Vec<&DecisionRecord> {
        self.records
            .iter()
            .filter(|r| r.spec_id == Some(spec_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValveType;

    #[test]
    fn append_stamps_identity_and_hash() {
        let mut log = DecisionLog::new();
        let mut config = ValveConfiguration::new();
        config.valve_type = Some(ValveType::Esfera);

        let spec_id = Uuid::new_v4();
        let id = log
            .append(
                DecisionType::NormSelection,
                Decision::selection("construction_standard", "API_6D").for_spec(spec_id),
                &config,
                "2.0.0",
            )
            .unwrap();

        assert_eq!(log.len(), 1);
        let record = &log.records()[0];
        assert_eq!(record.id, id);
        assert_eq!(record.snapshot_hash.len(), 64);
        assert_eq!(log.for_spec(spec_id).len(), 1);
        assert!(log.for_spec(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn same_snapshot_same_hash() {
        let mut log = DecisionLog::new();
        let config = ValveConfiguration::new();
        log.append(
            DecisionType::Validation,
            Decision::default(),
            &config,
            "2.0.0",
        )
        .unwrap();
        log.append(
            DecisionType::Validation,
            Decision::default(),
            &config,
            "2.0.0",
        )
        .unwrap();
        assert_eq!(
            log.records()[0].snapshot_hash,
            log.records()[1].snapshot_hash
        );
    }
}
