use std::sync::Arc;

use tracing::info;

use super::domain::{ConditionType, LeadField, RuleDraft, RuleId, RuleStatus, ScoringRule};
use super::repository::{RepositoryError, RuleRepository};
use super::scoring::values::{parse_leading_float, parse_leading_integer, parse_range};
use super::scoring::{ThresholdError, Thresholds, ValueParseError};

/// Largest point delta, positive or negative, a single rule may carry.
pub const MAX_RULE_POINTS: i64 = 10_000;

/// Authoring-time checks for a scoring rule.
///
/// Evaluation tolerates every one of these problems by not matching; rejecting them here
/// keeps admins from saving rules that can never fire.
pub fn validate_rule(draft: &RuleDraft) -> Result<(), RuleValidationError> {
    if draft.rule_name.trim().is_empty() {
        return Err(RuleValidationError::MissingName);
    }

    if LeadField::parse(&draft.field_checked).is_none() {
        return Err(RuleValidationError::UnknownField(
            draft.field_checked.clone(),
        ));
    }

    let condition = draft.condition_type;
    if condition == ConditionType::Unknown {
        return Err(RuleValidationError::UnknownCondition);
    }

    let value = draft
        .condition_value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if condition.requires_value() && value.is_none() {
        return Err(RuleValidationError::MissingConditionValue(condition.name()));
    }

    if let Some(value) = value {
        let parsed = match condition {
            ConditionType::GreaterThan
            | ConditionType::GreaterThanOrEqual
            | ConditionType::LessThan
            | ConditionType::LessThanOrEqual => parse_leading_float(value).map(|_| ()),
            ConditionType::Between => parse_range(value).map(|_| ()),
            ConditionType::WithinDays => parse_leading_integer(value).map(|_| ()),
            _ => Ok(()),
        };
        parsed.map_err(|source| RuleValidationError::InvalidConditionValue {
            condition: condition.name(),
            source,
        })?;
    }

    let points = draft
        .score_value
        .points()
        .map_err(RuleValidationError::InvalidScoreValue)?;
    if points.unsigned_abs() > MAX_RULE_POINTS.unsigned_abs() {
        return Err(RuleValidationError::ScoreOutOfRange(points));
    }

    if let (Some(hot), Some(warm_min)) = (draft.priority_range_hot, draft.priority_range_warm_min) {
        Thresholds::new(hot, warm_min)?;
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule name is required")]
    MissingName,
    #[error("'{0}' is not a scoreable lead field")]
    UnknownField(String),
    #[error("condition type is not supported")]
    UnknownCondition,
    #[error("condition '{0}' requires a condition value")]
    MissingConditionValue(&'static str),
    #[error("invalid value for condition '{condition}': {source}")]
    InvalidConditionValue {
        condition: &'static str,
        source: ValueParseError,
    },
    #[error("invalid score value: {0}")]
    InvalidScoreValue(ValueParseError),
    #[error("score value {0} exceeds the per-rule limit of {} points", MAX_RULE_POINTS)]
    ScoreOutOfRange(i64),
    #[error(transparent)]
    IncoherentThresholds(#[from] ThresholdError),
}

/// Administrative operations over the scoring ruleset.
pub struct RuleAdminService<R> {
    rules: Arc<R>,
}

impl<R> RuleAdminService<R>
where
    R: RuleRepository + 'static,
{
    pub fn new(rules: Arc<R>) -> Self {
        Self { rules }
    }

    pub async fn create_rule(&self, draft: RuleDraft) -> Result<ScoringRule, RuleAdminError> {
        validate_rule(&draft)?;
        let rule = self.rules.insert_rule(draft).await?;
        info!(rule_id = %rule.id, field = %rule.field_checked, "scoring rule created");
        Ok(rule)
    }

    pub async fn list_rules(&self) -> Result<Vec<ScoringRule>, RuleAdminError> {
        Ok(self.rules.list_rules().await?)
    }

    /// Activates or deactivates a rule; rules are never physically deleted.
    pub async fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
    ) -> Result<ScoringRule, RuleAdminError> {
        let rule = self
            .rules
            .set_status(id, status)
            .await?
            .ok_or(RuleAdminError::NotFound(id))?;
        info!(rule_id = %id, status = status.label(), "scoring rule status changed");
        Ok(rule)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleAdminError {
    #[error(transparent)]
    Validation(#[from] RuleValidationError),
    #[error("scoring rule {0} not found")]
    NotFound(RuleId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
