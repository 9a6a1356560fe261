//! Compliance evaluation: runs the same rule-condition engine used for
//! transaction monitoring against entity property maps, tagging matches
//! with their rule's compliance category and appending an audit event.
//!
//! spec.md's data-flow paragraph names this behavior ("compliance
//! evaluation consumes entities and rules through the same repository
//! contracts and emits audit events") without giving it its own
//! subsection; see `SPEC_FULL.md` §4.9.

use crate::conditions::rule_matches;
use crate::error::Result;
use aegis_repositories::AuditRepository;
use aegis_types::{AuditEvent, Entity, Rule, RuleType};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// A single compliance rule that matched against an entity.
#[derive(Debug, Clone)]
pub struct ComplianceFinding {
    /// Entity the finding concerns.
    pub entity_id: String,
    /// Rule that matched.
    pub rule_id: String,
    /// Rule name, for display.
    pub rule_name: String,
}

/// Evaluate every enabled [`RuleType::Compliance`] rule against `entity`'s
/// property map, returning the matches and recording one [`AuditEvent`]
/// per finding through `audit`.
pub async fn evaluate_compliance(
    entity: &Entity,
    rules: &[Rule],
    audit: &Arc<dyn AuditRepository>,
) -> Result<Vec<ComplianceFinding>> {
    let mut findings = Vec::new();
    for rule in rules.iter().filter(|r| r.rule_type == RuleType::Compliance) {
        if !rule_matches(rule, &entity.properties) {
            continue;
        }
        let finding = ComplianceFinding {
            entity_id: entity.id.clone(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
        };
        audit
            .record(AuditEvent {
                id: Uuid::new_v4().to_string(),
                actor: "compliance-evaluator".to_string(),
                action: "compliance_finding".to_string(),
                entity_id: entity.id.clone(),
                rule_id: Some(rule.id.clone()),
                timestamp: Utc::now(),
            })
            .await?;
        findings.push(finding);
    }
    Ok(findings)
}
