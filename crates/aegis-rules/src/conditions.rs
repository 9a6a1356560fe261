//! Condition evaluation: applies a [`RuleCondition`]'s operator to a field
//! looked up by dotted path in an arbitrary property map, and folds a
//! [`Rule`]'s ordered conditions into a single match/no-match decision.

use aegis_types::{ConditionOperator, JsonValue, Rule, RuleCondition};
use std::collections::BTreeMap;

/// Anything a rule can be evaluated against: a transaction event, an
/// entity's property map, or a synthetic health-check payload.
pub trait FieldSource {
    /// Look up a dotted field path (`"amount"`, `"address.country"`), or
    /// `None` if any segment is missing.
    fn field(&self, path: &str) -> Option<&JsonValue>;
}

impl FieldSource for BTreeMap<String, JsonValue> {
    fn field(&self, path: &str) -> Option<&JsonValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

impl FieldSource for JsonValue {
    fn field(&self, path: &str) -> Option<&JsonValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }
}

/// Evaluate a single condition against `source`. A missing field never
/// matches, regardless of operator.
pub fn evaluate_condition(condition: &RuleCondition, source: &dyn FieldSource) -> bool {
    let Some(field_value) = source.field(&condition.field) else {
        return false;
    };
    match condition.operator {
        ConditionOperator::Equals => values_equal(field_value, &condition.value),
        ConditionOperator::NotEquals => !values_equal(field_value, &condition.value),
        ConditionOperator::GreaterThan => compare_numeric(field_value, &condition.value, |a, b| a > b),
        ConditionOperator::GreaterThanOrEqual => compare_numeric(field_value, &condition.value, |a, b| a >= b),
        ConditionOperator::LessThan => compare_numeric(field_value, &condition.value, |a, b| a < b),
        ConditionOperator::LessThanOrEqual => compare_numeric(field_value, &condition.value, |a, b| a <= b),
        ConditionOperator::Contains => match (field_value.as_str(), condition.value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        ConditionOperator::In => match condition.value.as_array() {
            Some(values) => values.iter().any(|v| values_equal(v, field_value)),
            None => false,
        },
    }
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    a == b
}

fn compare_numeric(field_value: &JsonValue, expected: &JsonValue, op: impl Fn(f64, f64) -> bool) -> bool {
    match (field_value.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

/// Whether every condition in `rule` matches `source` (conjunction). An
/// empty condition list matches vacuously.
pub fn rule_matches(rule: &Rule, source: &dyn FieldSource) -> bool {
    rule.enabled && rule.conditions.iter().all(|c| evaluate_condition(c, source))
}

/// Evaluate every enabled rule in `rules` against `source`, returning the
/// subset that matched, in the order they were given.
pub fn matching_rules<'a>(rules: &'a [Rule], source: &dyn FieldSource) -> Vec<&'a Rule> {
    rules.iter().filter(|r| rule_matches(r, source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{AlertSeverity, RuleAction, RuleType};
    use chrono::Utc;

    fn amount_rule(threshold: f64) -> Rule {
        Rule {
            id: "r1".into(),
            name: "large amount".into(),
            rule_type: RuleType::TransactionMonitoring,
            severity: AlertSeverity::High,
            enabled: true,
            schedule: None,
            conditions: vec![RuleCondition {
                field: "amount".into(),
                operator: ConditionOperator::GreaterThanOrEqual,
                value: JsonValue::from(threshold),
            }],
            actions: vec![RuleAction::CreateAlert {
                severity: AlertSeverity::High,
                title_template: "Large amount: {amount}".into(),
            }],
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn event(amount: f64) -> BTreeMap<String, JsonValue> {
        let mut map = BTreeMap::new();
        map.insert("amount".to_string(), JsonValue::from(amount));
        map
    }

    #[test]
    fn condition_matches_when_threshold_met() {
        let rule = amount_rule(10000.0);
        assert!(rule_matches(&rule, &event(15000.0)));
        assert!(!rule_matches(&rule, &event(500.0)));
    }

    #[test]
    fn disabled_rule_never_matches() {
        let mut rule = amount_rule(10000.0);
        rule.enabled = false;
        assert!(!rule_matches(&rule, &event(99999.0)));
    }

    #[test]
    fn missing_field_never_matches() {
        let rule = amount_rule(10000.0);
        assert!(!rule_matches(&rule, &BTreeMap::new()));
    }

    #[test]
    fn dotted_path_reads_nested_objects() {
        let mut nested = JsonValue::empty_object();
        nested.insert("country", JsonValue::from("NG"));
        let mut address_rule = amount_rule(0.0);
        address_rule.conditions = vec![RuleCondition {
            field: "address.country".into(),
            operator: ConditionOperator::Equals,
            value: JsonValue::from("NG"),
        }];
        let mut source = BTreeMap::new();
        source.insert("address".to_string(), nested);
        assert!(rule_matches(&address_rule, &source));
    }

    #[test]
    fn in_operator_checks_array_membership() {
        let mut rule = amount_rule(0.0);
        rule.conditions = vec![RuleCondition {
            field: "country".into(),
            operator: ConditionOperator::In,
            value: JsonValue::Array(vec![JsonValue::from("NG"), JsonValue::from("RU")]),
        }];
        let mut source = BTreeMap::new();
        source.insert("country".to_string(), JsonValue::from("RU"));
        assert!(rule_matches(&rule, &source));
    }
}
