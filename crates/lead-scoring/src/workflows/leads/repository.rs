use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    AutomationAction, Lead, LeadId, LeadSubmission, Priority, RuleDraft, RuleId, RuleStatus,
    ScoringRule, TriggerType,
};

/// Filter for the rules applicable to one scoring run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleQuery {
    pub lead_type: String,
    pub trigger: TriggerType,
}

impl RuleQuery {
    pub fn admits(&self, rule: &ScoringRule) -> bool {
        rule.is_eligible(&self.lead_type, self.trigger)
    }
}

/// Scoring columns written back onto a lead after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub score: i64,
    pub priority: Priority,
    pub calculated_at: DateTime<Utc>,
}

/// Lead storage. `update_lead_score` must only touch the three scoring columns.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn insert_lead(
        &self,
        submission: LeadSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError>;
    async fn update_lead(&self, lead: &Lead) -> Result<(), RepositoryError>;
    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError>;
    async fn update_lead_score(
        &self,
        id: LeadId,
        update: ScoreUpdate,
    ) -> Result<(), RepositoryError>;
}

/// Rule storage. The scoring engine only ever reads through `active_rules`.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active rules admitted by `query`, ordered by points descending.
    async fn active_rules(&self, query: &RuleQuery) -> Result<Vec<ScoringRule>, RepositoryError>;
    async fn insert_rule(&self, draft: RuleDraft) -> Result<ScoringRule, RepositoryError>;
    async fn list_rules(&self) -> Result<Vec<ScoringRule>, RepositoryError>;
    async fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
    ) -> Result<Option<ScoringRule>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

/// Outbound hook fired for Hot leads.
#[async_trait]
pub trait AutomationNotifier: Send + Sync {
    async fn notify(&self, action: &AutomationAction) -> Result<(), NotifierError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("automation transport unavailable: {0}")]
    Transport(String),
    #[error("automation endpoint rejected the action with status {0}")]
    Rejected(u16),
}
