use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{
    AutomationAction, Lead, LeadEnvelope, LeadId, LeadPatch, LeadSubmission, Priority,
    ScoringOutcome, TriggerType, DEFAULT_LEAD_TYPE,
};
use super::orchestrator::ScoringOrchestrator;
use super::repository::{AutomationNotifier, LeadRepository, RepositoryError, RuleRepository};

/// Intake service: persists leads, then scores them and fires automation for Hot creates.
///
/// Lead writes never fail because of scoring; a failed or disabled run yields `scoring: null`.
pub struct LeadService<L, R, N> {
    leads: Arc<L>,
    scoring: Option<ScoringOrchestrator<L, R>>,
    notifier: Arc<N>,
}

impl<L, R, N> LeadService<L, R, N>
where
    L: LeadRepository + 'static,
    R: RuleRepository + 'static,
    N: AutomationNotifier + 'static,
{
    pub fn new(leads: Arc<L>, scoring: ScoringOrchestrator<L, R>, notifier: Arc<N>) -> Self {
        Self {
            leads,
            scoring: Some(scoring),
            notifier,
        }
    }

    /// Service with auto-scoring switched off; every envelope carries `scoring: null`.
    pub fn without_scoring(leads: Arc<L>, notifier: Arc<N>) -> Self {
        Self {
            leads,
            scoring: None,
            notifier,
        }
    }

    pub fn scoring_enabled(&self) -> bool {
        self.scoring.is_some()
    }

    pub async fn create(
        &self,
        mut submission: LeadSubmission,
    ) -> Result<LeadEnvelope, LeadServiceError> {
        validate_submission(&submission)?;
        if submission
            .lead_type
            .as_deref()
            .map_or(true, |value| value.trim().is_empty())
        {
            submission.lead_type = Some(DEFAULT_LEAD_TYPE.to_string());
        }

        let now = Utc::now();
        let mut lead = self.leads.insert_lead(submission, now).await?;
        info!(lead_id = %lead.id, lead_type = lead.effective_lead_type(), "lead created");

        let scoring = self.score(lead.id, TriggerType::OnLeadCreate, now).await;
        match &scoring {
            Some(outcome) => lead.apply_score(outcome, now),
            None => {
                lead.lead_score = 0;
                lead.lead_priority = Some(Priority::Cold);
            }
        }

        if let Some(outcome) = scoring.filter(|outcome| outcome.priority == Priority::Hot) {
            self.notify_hot_lead(lead.id, outcome).await;
        }

        Ok(LeadEnvelope { lead, scoring })
    }

    pub async fn update(
        &self,
        id: LeadId,
        patch: LeadPatch,
    ) -> Result<LeadEnvelope, LeadServiceError> {
        validate_travelers(patch.number_of_travelers)?;
        let mut lead = self
            .leads
            .get_lead(id)
            .await?
            .ok_or(LeadServiceError::NotFound(id))?;

        let now = Utc::now();
        let rescore = lead.apply_patch(patch, now);
        self.leads.update_lead(&lead).await?;

        let scoring = if rescore {
            self.score(id, TriggerType::OnLeadUpdate, now).await
        } else {
            None
        };
        if let Some(outcome) = &scoring {
            lead.apply_score(outcome, now);
        }

        Ok(LeadEnvelope { lead, scoring })
    }

    pub async fn get(&self, id: LeadId) -> Result<Lead, LeadServiceError> {
        self.leads
            .get_lead(id)
            .await?
            .ok_or(LeadServiceError::NotFound(id))
    }

    async fn score(
        &self,
        id: LeadId,
        trigger: TriggerType,
        now: DateTime<Utc>,
    ) -> Option<ScoringOutcome> {
        match &self.scoring {
            Some(orchestrator) => orchestrator.run_scoring_at(id, trigger, now).await,
            None => None,
        }
    }

    async fn notify_hot_lead(&self, lead_id: LeadId, outcome: ScoringOutcome) {
        let action = AutomationAction {
            lead_id,
            priority: outcome.priority,
            score: outcome.score,
        };

        match self.notifier.notify(&action).await {
            Ok(()) => info!(%lead_id, score = outcome.score, "hot lead automation triggered"),
            Err(error) => warn!(%lead_id, %error, "hot lead automation failed"),
        }
    }
}

/// Upper bound on `number_of_travelers` accepted at intake.
pub const MAX_TRAVELERS: u32 = 500;

fn validate_submission(submission: &LeadSubmission) -> Result<(), LeadValidationError> {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map_or(false, |value| !value.trim().is_empty())
    };

    if !present(&submission.name) {
        return Err(LeadValidationError::MissingName);
    }
    if !present(&submission.email) && !present(&submission.phone) {
        return Err(LeadValidationError::MissingContact);
    }
    validate_travelers(submission.number_of_travelers)
}

fn validate_travelers(count: Option<u32>) -> Result<(), LeadValidationError> {
    match count {
        Some(0) => Err(LeadValidationError::NoTravelers),
        Some(count) if count > MAX_TRAVELERS => Err(LeadValidationError::TooManyTravelers(count)),
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeadValidationError {
    #[error("lead name is required")]
    MissingName,
    #[error("an email address or phone number is required")]
    MissingContact,
    #[error("number of travelers must be at least 1")]
    NoTravelers,
    #[error("number of travelers {0} exceeds the limit of {}", MAX_TRAVELERS)]
    TooManyTravelers(u32),
}

#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    #[error(transparent)]
    Validation(#[from] LeadValidationError),
    #[error("lead {0} not found")]
    NotFound(LeadId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
