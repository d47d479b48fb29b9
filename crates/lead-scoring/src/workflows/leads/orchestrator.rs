use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::domain::{LeadId, ScoringOutcome, TriggerType};
use super::repository::{LeadRepository, RepositoryError, RuleQuery, RuleRepository, ScoreUpdate};
use super::scoring::{ScoringEngine, ScoringReport};

/// Default upper bound for a whole scoring run.
pub const DEFAULT_SCORING_TIMEOUT: Duration = Duration::from_secs(5);

/// Steps of a single scoring run, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringStage {
    Fetching,
    Evaluating,
    Persisting,
    Done,
    Failed,
}

impl ScoringStage {
    pub const fn label(self) -> &'static str {
        match self {
            ScoringStage::Fetching => "fetching",
            ScoringStage::Evaluating => "evaluating",
            ScoringStage::Persisting => "persisting",
            ScoringStage::Done => "done",
            ScoringStage::Failed => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),
    #[error("failed to fetch lead: {0}")]
    LeadFetch(#[source] RepositoryError),
    #[error("failed to fetch scoring rules: {0}")]
    RuleFetch(#[source] RepositoryError),
    #[error("failed to persist lead score: {0}")]
    Persist(#[source] RepositoryError),
    #[error("scoring run exceeded {0:?}")]
    TimedOut(Duration),
}

impl ScoringError {
    /// Stage the run was in when it failed.
    pub fn stage(&self) -> ScoringStage {
        match self {
            ScoringError::LeadNotFound(_)
            | ScoringError::LeadFetch(_)
            | ScoringError::RuleFetch(_) => ScoringStage::Fetching,
            ScoringError::Persist(_) => ScoringStage::Persisting,
            ScoringError::TimedOut(_) => ScoringStage::Failed,
        }
    }
}

/// Loads a lead and its applicable rules, scores it, and persists the outcome.
///
/// Every failure is logged and surfaces as `None` from [`ScoringOrchestrator::run_scoring`];
/// callers treat that as "scoring unavailable".
pub struct ScoringOrchestrator<L, R> {
    leads: Arc<L>,
    rules: Arc<R>,
    engine: Arc<ScoringEngine>,
    timeout: Duration,
}

impl<L, R> Clone for ScoringOrchestrator<L, R> {
    fn clone(&self) -> Self {
        Self {
            leads: self.leads.clone(),
            rules: self.rules.clone(),
            engine: self.engine.clone(),
            timeout: self.timeout,
        }
    }
}

impl<L, R> ScoringOrchestrator<L, R>
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
{
    pub fn new(leads: Arc<L>, rules: Arc<R>, engine: Arc<ScoringEngine>) -> Self {
        Self {
            leads,
            rules,
            engine,
            timeout: DEFAULT_SCORING_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub async fn run_scoring(
        &self,
        lead_id: LeadId,
        trigger: TriggerType,
    ) -> Option<ScoringOutcome> {
        self.run_scoring_at(lead_id, trigger, Utc::now()).await
    }

    /// Same as [`Self::run_scoring`] with an explicit clock reading for `within_days`.
    pub async fn run_scoring_at(
        &self,
        lead_id: LeadId,
        trigger: TriggerType,
        now: DateTime<Utc>,
    ) -> Option<ScoringOutcome> {
        match self.try_run(lead_id, trigger, now).await {
            Ok(report) => Some(report.outcome),
            Err(error) => {
                warn!(
                    %lead_id,
                    trigger = trigger.label(),
                    stage = error.stage().label(),
                    %error,
                    "lead scoring unavailable"
                );
                None
            }
        }
    }

    /// Runs the scoring pipeline under the configured timeout, keeping the failure cause.
    pub async fn try_run(
        &self,
        lead_id: LeadId,
        trigger: TriggerType,
        now: DateTime<Utc>,
    ) -> Result<ScoringReport, ScoringError> {
        match tokio::time::timeout(self.timeout, self.execute(lead_id, trigger, now)).await {
            Ok(result) => result,
            Err(_) => Err(ScoringError::TimedOut(self.timeout)),
        }
    }

    async fn execute(
        &self,
        lead_id: LeadId,
        trigger: TriggerType,
        now: DateTime<Utc>,
    ) -> Result<ScoringReport, ScoringError> {
        debug!(%lead_id, stage = ScoringStage::Fetching.label(), "scoring run started");
        let lead = self
            .leads
            .get_lead(lead_id)
            .await
            .map_err(ScoringError::LeadFetch)?
            .ok_or(ScoringError::LeadNotFound(lead_id))?;

        let query = RuleQuery {
            lead_type: lead.effective_lead_type().to_string(),
            trigger,
        };
        let rules = self
            .rules
            .active_rules(&query)
            .await
            .map_err(ScoringError::RuleFetch)?;

        debug!(
            %lead_id,
            stage = ScoringStage::Evaluating.label(),
            candidate_rules = rules.len(),
            "evaluating scoring rules"
        );
        let ruleset = self.engine.ruleset(rules);
        let report = self.engine.score(&lead, &ruleset, now);

        debug!(%lead_id, stage = ScoringStage::Persisting.label(), "persisting lead score");
        self.leads
            .update_lead_score(
                lead_id,
                ScoreUpdate {
                    score: report.outcome.score,
                    priority: report.outcome.priority,
                    calculated_at: now,
                },
            )
            .await
            .map_err(ScoringError::Persist)?;

        info!(
            %lead_id,
            lead_type = %query.lead_type,
            trigger = trigger.label(),
            stage = ScoringStage::Done.label(),
            score = report.outcome.score,
            priority = report.outcome.priority.label(),
            matched_rules = report.breakdown.matched().count(),
            "lead scored"
        );

        Ok(report)
    }
}
