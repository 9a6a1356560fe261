//! Pattern entity: an identified suspicious structure in the transaction
//! graph (e.g. smurfing, layering).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed catalogue of suspicious structures the pattern detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Many small transactions staying under a reporting threshold.
    Smurfing,
    /// Funds routed through several intermediaries to obscure origin.
    Layering,
    /// Transactions split to stay under a reporting threshold.
    Structuring,
    /// Funds returning to (near) their origin through a cycle.
    CircularFlow,
    /// Large amounts moved in an unusually short window.
    RapidMovement,
    /// Counterparties concentrated in high-risk jurisdictions.
    HighRiskGeography,
    /// Volume far outside the entity's historical baseline.
    UnusualVolume,
    /// Entity shows hallmarks of a shell company.
    ShellCompany,
    /// Entity shows hallmarks of a money-mule account.
    MuleAccount,
    /// Rapid deposit-then-withdraw cycling.
    KitingScheme,
}

impl PatternType {
    /// Fixed per-type risk multiplier used to derive `risk_score` from
    /// `confidence`.
    pub fn risk_multiplier(self) -> f64 {
        match self {
            PatternType::ShellCompany => 1.5,
            PatternType::HighRiskGeography => 1.4,
            PatternType::CircularFlow | PatternType::KitingScheme => 1.3,
            PatternType::Layering | PatternType::MuleAccount => 1.2,
            PatternType::Smurfing | PatternType::Structuring => 1.1,
            PatternType::RapidMovement | PatternType::UnusualVolume => 1.0,
        }
    }
}

/// A detected suspicious pattern with confidence and derived risk score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Unique id.
    pub id: String,
    /// Which pattern was detected.
    pub pattern_type: PatternType,
    /// Probability-like score in `[0, 1]` that the pattern is real.
    pub confidence: f64,
    /// Scaled severity in `[0, 100]`, derived from confidence and multiplier.
    pub risk_score: f64,
    /// Entities involved in the pattern.
    pub involved_entities: Vec<String>,
    /// Human-readable indicators that contributed to the confidence score.
    pub indicators: Vec<String>,
    /// When the pattern was detected.
    pub detected_at: DateTime<Utc>,
}

impl Pattern {
    /// Compute `risk_score = min(100, 100 * confidence * multiplier)`.
    pub fn risk_score_for(confidence: f64, pattern_type: PatternType) -> f64 {
        (100.0 * confidence * pattern_type.risk_multiplier()).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_score_is_capped_at_100() {
        let score = Pattern::risk_score_for(0.95, PatternType::ShellCompany);
        assert!(score <= 100.0);
        assert!((score - 100.0 * 0.95 * 1.5).abs() < 1e-9 || score == 100.0);
    }

    #[test]
    fn risk_score_never_exceeds_multiplier_bound() {
        for pt in [
            PatternType::Smurfing,
            PatternType::Layering,
            PatternType::Structuring,
            PatternType::CircularFlow,
            PatternType::RapidMovement,
            PatternType::HighRiskGeography,
            PatternType::UnusualVolume,
            PatternType::ShellCompany,
            PatternType::MuleAccount,
            PatternType::KitingScheme,
        ] {
            let confidence = 0.8;
            let score = Pattern::risk_score_for(confidence, pt);
            assert!(score <= 100.0 * confidence * pt.risk_multiplier() + 1e-9);
        }
    }
}
