use serde::Serialize;
use tracing::{debug, warn};

use super::super::domain::{ConditionType, Lead, LeadField, RuleId, ScoringRule};
use super::condition::{ConditionEvaluator, ConditionResult};
use super::priority::Thresholds;

/// Audit trail entry for one rule considered during a scoring run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEvaluation {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub field_checked: String,
    pub condition_type: ConditionType,
    pub matched: bool,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Total score plus the per-rule trail that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub total: i64,
    pub evaluations: Vec<RuleEvaluation>,
}

impl ScoreBreakdown {
    pub fn matched(&self) -> impl Iterator<Item = &RuleEvaluation> {
        self.evaluations.iter().filter(|evaluation| evaluation.matched)
    }
}

/// Candidate rules for one lead type / trigger pair, with the thresholds they carry.
///
/// Thresholds belong to the ruleset: they are read from the first rule of the
/// points-descending ordering and fall back to the configured defaults per field.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<ScoringRule>,
    thresholds: Thresholds,
}

impl RuleSet {
    /// `rules` must already be ordered by points descending.
    pub fn from_ordered(rules: Vec<ScoringRule>, defaults: Thresholds) -> Self {
        let thresholds = match rules.first() {
            None => defaults,
            Some(first) => {
                let hot = first.priority_range_hot.unwrap_or(defaults.hot());
                let warm_min = first.priority_range_warm_min.unwrap_or(defaults.warm_min());
                match Thresholds::new(hot, warm_min) {
                    Ok(thresholds) => thresholds,
                    Err(error) => {
                        warn!(
                            rule_id = %first.id,
                            %error,
                            "ruleset thresholds are incoherent; using configured defaults"
                        );
                        defaults
                    }
                }
            }
        };

        Self { rules, thresholds }
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Stable sort by points descending; ties keep their fetch order.
pub fn order_by_points(rules: &mut [ScoringRule]) {
    rules.sort_by_key(|rule| std::cmp::Reverse(rule.score_value.sort_key()));
}

/// Sums the points of every matching rule. Never mutates the lead or the rules.
///
/// The total saturates at the `i64` bounds.
pub fn score_lead(
    lead: &Lead,
    rules: &[ScoringRule],
    evaluator: &ConditionEvaluator<'_>,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::default();

    for rule in rules {
        let evaluation = evaluate_rule(lead, rule, evaluator);
        breakdown.total = breakdown.total.saturating_add(evaluation.points);
        breakdown.evaluations.push(evaluation);
    }

    breakdown
}

fn evaluate_rule(
    lead: &Lead,
    rule: &ScoringRule,
    evaluator: &ConditionEvaluator<'_>,
) -> RuleEvaluation {
    let mut evaluation = RuleEvaluation {
        rule_id: rule.id,
        rule_name: rule.rule_name.clone(),
        field_checked: rule.field_checked.clone(),
        condition_type: rule.condition_type,
        matched: false,
        points: 0,
        note: None,
    };

    let Some(field) = LeadField::parse(&rule.field_checked) else {
        warn!(
            rule_id = %rule.id,
            field = %rule.field_checked,
            "scoring rule references an unknown lead field"
        );
        evaluation.note = Some(format!("unknown field '{}'", rule.field_checked));
        return evaluation;
    };

    let value = lead.field(field);
    let result = evaluator.evaluate(
        value.as_ref(),
        rule.condition_type,
        rule.condition_value.as_deref(),
    );

    match result {
        ConditionResult::Matched => {}
        ConditionResult::NotMatched => return evaluation,
        ConditionResult::ParseFailed(error) => {
            debug!(rule_id = %rule.id, lead_id = %lead.id, %error, "condition value parse failed");
            evaluation.note = Some(error.to_string());
            return evaluation;
        }
    }

    evaluation.matched = true;
    match rule.score_value.points() {
        Ok(points) => evaluation.points = points,
        Err(error) => {
            debug!(rule_id = %rule.id, %error, "rule points parse failed; contributing 0");
            evaluation.note = Some(error.to_string());
        }
    }

    evaluation
}
