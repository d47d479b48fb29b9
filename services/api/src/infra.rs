use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lead_scoring::workflows::leads::scoring::order_by_points;
use lead_scoring::workflows::leads::{
    Lead, LeadId, LeadRepository, LeadSubmission, RepositoryError, RuleDraft, RuleId, RuleQuery,
    RuleRepository, RuleStatus, ScoreUpdate, ScoringRule,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) storage: StorageKind,
    pub(crate) scoring_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StorageKind {
    Memory,
    Postgres,
}

impl StorageKind {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::Postgres => "postgres",
        }
    }
}

/// Process-local lead store used when no database is configured.
#[derive(Default)]
pub(crate) struct InMemoryLeadRepository {
    leads: RwLock<BTreeMap<LeadId, Lead>>,
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn insert_lead(
        &self,
        submission: LeadSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        let mut leads = self.leads.write().await;
        let next = leads.keys().next_back().map_or(1, |id| id.0 + 1);
        let lead = Lead::from_submission(LeadId(next), submission, created_at);
        leads.insert(lead.id, lead.clone());
        Ok(lead)
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        let stored = leads.get_mut(&lead.id).ok_or(RepositoryError::NotFound)?;
        let mut next = lead.clone();
        next.lead_score = stored.lead_score;
        next.lead_priority = stored.lead_priority;
        next.last_score_calculated = stored.last_score_calculated;
        *stored = next;
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads.get(&id).cloned())
    }

    async fn update_lead_score(
        &self,
        id: LeadId,
        update: ScoreUpdate,
    ) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        let stored = leads.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.lead_score = update.score;
        stored.lead_priority = Some(update.priority);
        stored.last_score_calculated = Some(update.calculated_at);
        Ok(())
    }
}

/// Process-local rule store, optionally seeded from the admin CSV export.
#[derive(Default)]
pub(crate) struct InMemoryRuleRepository {
    rules: RwLock<Vec<ScoringRule>>,
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn active_rules(&self, query: &RuleQuery) -> Result<Vec<ScoringRule>, RepositoryError> {
        let rules = self.rules.read().await;
        let mut candidates: Vec<ScoringRule> = rules
            .iter()
            .filter(|rule| query.admits(rule))
            .cloned()
            .collect();
        order_by_points(&mut candidates);
        Ok(candidates)
    }

    async fn insert_rule(&self, draft: RuleDraft) -> Result<ScoringRule, RepositoryError> {
        let mut rules = self.rules.write().await;
        let next = rules.iter().map(|rule| rule.id.0).max().unwrap_or(0) + 1;
        let rule = ScoringRule::from_draft(RuleId(next), draft);
        rules.push(rule.clone());
        Ok(rule)
    }

    async fn list_rules(&self) -> Result<Vec<ScoringRule>, RepositoryError> {
        Ok(self.rules.read().await.clone())
    }

    async fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
    ) -> Result<Option<ScoringRule>, RepositoryError> {
        let mut rules = self.rules.write().await;
        Ok(rules.iter_mut().find(|rule| rule.id == id).map(|rule| {
            rule.status = status;
            rule.clone()
        }))
    }
}
