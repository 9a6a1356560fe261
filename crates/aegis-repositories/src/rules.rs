//! Rule repository contract and in-memory reference adapter.

use crate::store::InMemoryStore;
use aegis_types::{Error, Result, Rule, RuleType};
use async_trait::async_trait;

/// Persistence contract for [`Rule`] records.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Insert a new rule or overwrite an existing one by id.
    async fn save(&self, rule: Rule) -> Result<()>;
    /// Fetch a single rule by id.
    async fn get(&self, id: &str) -> Result<Rule>;
    /// List every enabled rule of the given type.
    async fn list_enabled(&self, rule_type: Option<RuleType>) -> Result<Vec<Rule>>;
    /// Delete a rule, idempotently.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory [`RuleRepository`] used by tests and local composition.
#[derive(Default)]
pub struct InMemoryRuleRepository {
    store: InMemoryStore<Rule>,
}

impl InMemoryRuleRepository {
    /// Construct an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn save(&self, rule: Rule) -> Result<()> {
        self.store.put(rule.id.clone(), rule).await;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Rule> {
        self.store.get(id).await.ok_or_else(|| Error::not_found("rule", id))
    }

    async fn list_enabled(&self, rule_type: Option<RuleType>) -> Result<Vec<Rule>> {
        let all = self.store.all().await;
        Ok(all
            .into_iter()
            .filter(|r| r.enabled)
            .filter(|r| rule_type.is_none_or(|t| r.rule_type == t))
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{AlertSeverity, ConditionOperator, JsonValue, RuleCondition};
    use chrono::Utc;

    fn rule(id: &str, rule_type: RuleType, enabled: bool) -> Rule {
        let now = Utc::now();
        Rule {
            id: id.to_string(),
            name: "rule".into(),
            rule_type,
            severity: AlertSeverity::Medium,
            enabled,
            schedule: None,
            conditions: vec![RuleCondition {
                field: "amount".into(),
                operator: ConditionOperator::GreaterThan,
                value: JsonValue::from(1000.0),
            }],
            actions: vec![],
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn list_enabled_excludes_disabled_rules() {
        let repo = InMemoryRuleRepository::new();
        repo.save(rule("r1", RuleType::TransactionMonitoring, true)).await.unwrap();
        repo.save(rule("r2", RuleType::TransactionMonitoring, false)).await.unwrap();
        let rules = repo.list_enabled(Some(RuleType::TransactionMonitoring)).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "r1");
    }
}
