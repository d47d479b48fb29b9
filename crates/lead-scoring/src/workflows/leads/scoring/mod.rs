mod catalogue;
mod condition;
mod priority;
mod rules;
pub(crate) mod values;

pub use catalogue::{
    CatalogueError, DestinationCatalogues, GROUP_CAMPAIGN_TAG, HIGH_INQUIRY_FIT_TAG,
};
pub use condition::{ConditionEvaluator, ConditionResult};
pub use priority::{
    classify, ThresholdError, Thresholds, DEFAULT_HOT_THRESHOLD, DEFAULT_WARM_THRESHOLD,
};
pub use rules::{order_by_points, score_lead, RuleEvaluation, RuleSet, ScoreBreakdown};
pub use values::ValueParseError;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Lead, ScoringOutcome, ScoringRule};

/// Stateless engine combining the destination catalogues and default thresholds.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    catalogues: DestinationCatalogues,
    default_thresholds: Thresholds,
}

impl ScoringEngine {
    pub fn new(catalogues: DestinationCatalogues, default_thresholds: Thresholds) -> Self {
        Self {
            catalogues,
            default_thresholds,
        }
    }

    pub fn catalogues(&self) -> &DestinationCatalogues {
        &self.catalogues
    }

    pub fn default_thresholds(&self) -> Thresholds {
        self.default_thresholds
    }

    /// Wraps already-ordered candidate rules, resolving the ruleset thresholds.
    pub fn ruleset(&self, rules: Vec<ScoringRule>) -> RuleSet {
        RuleSet::from_ordered(rules, self.default_thresholds)
    }

    pub fn score(&self, lead: &Lead, ruleset: &RuleSet, now: DateTime<Utc>) -> ScoringReport {
        let evaluator = ConditionEvaluator::new(&self.catalogues, now);
        let breakdown = score_lead(lead, ruleset.rules(), &evaluator);
        let thresholds = ruleset.thresholds();

        ScoringReport {
            outcome: ScoringOutcome {
                score: breakdown.total,
                priority: thresholds.classify(breakdown.total),
            },
            thresholds,
            breakdown,
        }
    }
}

/// Scoring output with the trail needed for audits and CLI output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringReport {
    pub outcome: ScoringOutcome,
    pub thresholds: Thresholds,
    pub breakdown: ScoreBreakdown,
}
