//! Rule/pattern condition evaluator for AegisShield: applies rule
//! conditions to events and entities, and evaluates regulatory compliance
//! rules against entity property maps.

pub mod compliance;
pub mod conditions;
pub mod error;

pub use compliance::{evaluate_compliance, ComplianceFinding};
pub use conditions::{evaluate_condition, matching_rules, rule_matches, FieldSource};
pub use error::{Error, Result};
