use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::leads::domain::{
    AutomationAction, AutomationTrigger, ConditionType, Lead, LeadId, LeadSubmission, RuleDraft,
    RuleId, RuleStatus, ScoreValue, ScoringRule,
};
use crate::workflows::leads::orchestrator::ScoringOrchestrator;
use crate::workflows::leads::repository::{
    AutomationNotifier, LeadRepository, NotifierError, RepositoryError, RuleQuery,
    RuleRepository, ScoreUpdate,
};
use crate::workflows::leads::scoring::{order_by_points, ScoringEngine};
use crate::workflows::leads::service::LeadService;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days_from(now: DateTime<Utc>, days: u64) -> NaiveDate {
    now.date_naive()
        .checked_add_days(Days::new(days))
        .expect("date in range")
}

pub(super) fn submission() -> LeadSubmission {
    LeadSubmission {
        name: Some("Asha Menon".to_string()),
        email: Some("asha@example.com".to_string()),
        phone: Some("+91 98450 12345".to_string()),
        destination: Some("Goa Trip".to_string()),
        departure_city: Some("Bengaluru".to_string()),
        number_of_travelers: Some(2),
        budget: Some("60000".to_string()),
        lead_source: Some("Website".to_string()),
        ..LeadSubmission::default()
    }
}

/// Lead that scores 45 against [`bali_rules`] when `now` is the scoring clock.
pub(super) fn bali_submission(now: DateTime<Utc>) -> LeadSubmission {
    LeadSubmission {
        lead_type: Some("FIT".to_string()),
        name: Some("Rohan Iyer".to_string()),
        email: Some("rohan@example.com".to_string()),
        destination: Some("Bali Honeymoon".to_string()),
        budget: Some("80000".to_string()),
        travel_date: Some(days_from(now, 10)),
        number_of_travelers: Some(2),
        ..LeadSubmission::default()
    }
}

pub(super) fn lead(submission: LeadSubmission) -> Lead {
    Lead::from_submission(LeadId(1), submission, fixed_now())
}

pub(super) fn draft(
    name: &str,
    field: &str,
    condition: ConditionType,
    value: Option<&str>,
    points: i64,
) -> RuleDraft {
    RuleDraft {
        rule_name: name.to_string(),
        field_checked: field.to_string(),
        condition_type: condition,
        condition_value: value.map(str::to_string),
        score_value: ScoreValue::Points(points),
        lead_type: Some("FIT".to_string()),
        automation_trigger: AutomationTrigger::Both,
        status: RuleStatus::Active,
        priority_range_hot: None,
        priority_range_warm_min: None,
    }
}

pub(super) fn rule(
    id: i64,
    field: &str,
    condition: ConditionType,
    value: Option<&str>,
    points: i64,
) -> ScoringRule {
    ScoringRule::from_draft(
        RuleId(id),
        draft(&format!("rule-{id}"), field, condition, value, points),
    )
}

pub(super) fn goa_budget_rules() -> Vec<ScoringRule> {
    vec![
        rule(1, "destination", ConditionType::Contains, Some("goa"), 20),
        rule(2, "budget", ConditionType::GreaterThan, Some("50000"), 15),
    ]
}

pub(super) fn bali_rules() -> Vec<RuleDraft> {
    let mut inquiry = draft(
        "High inquiry destination",
        "destination",
        ConditionType::HighInquiryFit,
        None,
        20,
    );
    inquiry.automation_trigger = AutomationTrigger::OnLeadCreate;
    let mut budget = draft(
        "Premium budget",
        "budget",
        ConditionType::GreaterThan,
        Some("50000"),
        15,
    );
    budget.automation_trigger = AutomationTrigger::OnLeadCreate;
    let mut soon = draft(
        "Travelling this month",
        "travel_date",
        ConditionType::WithinDays,
        Some("30"),
        10,
    );
    soon.automation_trigger = AutomationTrigger::OnLeadCreate;
    vec![inquiry, budget, soon]
}

pub(super) fn engine() -> Arc<ScoringEngine> {
    Arc::new(ScoringEngine::default())
}

pub(super) fn build_service() -> (
    LeadService<MemoryLeads, MemoryRules, MemoryNotifier>,
    Arc<MemoryLeads>,
    Arc<MemoryRules>,
    Arc<MemoryNotifier>,
) {
    let leads = Arc::new(MemoryLeads::default());
    let rules = Arc::new(MemoryRules::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = ScoringOrchestrator::new(leads.clone(), rules.clone(), engine());
    let service = LeadService::new(leads.clone(), orchestrator, notifier.clone());
    (service, leads, rules, notifier)
}

pub(super) async fn seed_rules(rules: &MemoryRules, drafts: Vec<RuleDraft>) {
    for draft in drafts {
        rules.insert_rule(draft).await.expect("rule stored");
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryLeads {
    records: Mutex<BTreeMap<LeadId, Lead>>,
    next_id: AtomicI64,
    score_writes: AtomicUsize,
}

impl MemoryLeads {
    pub(super) fn stored(&self, id: LeadId) -> Option<Lead> {
        self.records
            .lock()
            .expect("lead mutex poisoned")
            .get(&id)
            .cloned()
    }

    pub(super) fn score_writes(&self) -> usize {
        self.score_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeadRepository for MemoryLeads {
    async fn insert_lead(
        &self,
        submission: LeadSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        let id = LeadId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let lead = Lead::from_submission(id, submission, created_at);
        self.records
            .lock()
            .expect("lead mutex poisoned")
            .insert(id, lead.clone());
        Ok(lead)
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        let stored = guard.get_mut(&lead.id).ok_or(RepositoryError::NotFound)?;
        // Scoring columns are owned by `update_lead_score`.
        let (score, priority, calculated) = (
            stored.lead_score,
            stored.lead_priority,
            stored.last_score_calculated,
        );
        *stored = lead.clone();
        stored.lead_score = score;
        stored.lead_priority = priority;
        stored.last_score_calculated = calculated;
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.stored(id))
    }

    async fn update_lead_score(
        &self,
        id: LeadId,
        update: ScoreUpdate,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("lead mutex poisoned");
        let stored = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.lead_score = update.score;
        stored.lead_priority = Some(update.priority);
        stored.last_score_calculated = Some(update.calculated_at);
        self.score_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryRules {
    records: Mutex<Vec<ScoringRule>>,
    queries: Mutex<Vec<RuleQuery>>,
}

impl MemoryRules {
    pub(super) fn queries(&self) -> Vec<RuleQuery> {
        self.queries.lock().expect("query mutex poisoned").clone()
    }
}

#[async_trait]
impl RuleRepository for MemoryRules {
    async fn active_rules(&self, query: &RuleQuery) -> Result<Vec<ScoringRule>, RepositoryError> {
        self.queries
            .lock()
            .expect("query mutex poisoned")
            .push(query.clone());
        let mut rules: Vec<ScoringRule> = self
            .records
            .lock()
            .expect("rule mutex poisoned")
            .iter()
            .filter(|rule| query.admits(rule))
            .cloned()
            .collect();
        order_by_points(&mut rules);
        Ok(rules)
    }

    async fn insert_rule(&self, draft: RuleDraft) -> Result<ScoringRule, RepositoryError> {
        let mut guard = self.records.lock().expect("rule mutex poisoned");
        let rule = ScoringRule::from_draft(RuleId(guard.len() as i64 + 1), draft);
        guard.push(rule.clone());
        Ok(rule)
    }

    async fn list_rules(&self) -> Result<Vec<ScoringRule>, RepositoryError> {
        Ok(self.records.lock().expect("rule mutex poisoned").clone())
    }

    async fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
    ) -> Result<Option<ScoringRule>, RepositoryError> {
        let mut guard = self.records.lock().expect("rule mutex poisoned");
        Ok(guard.iter_mut().find(|rule| rule.id == id).map(|rule| {
            rule.status = status;
            rule.clone()
        }))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    actions: Mutex<Vec<AutomationAction>>,
}

impl MemoryNotifier {
    pub(super) fn actions(&self) -> Vec<AutomationAction> {
        self.actions.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl AutomationNotifier for MemoryNotifier {
    async fn notify(&self, action: &AutomationAction) -> Result<(), NotifierError> {
        self.actions
            .lock()
            .expect("notifier mutex poisoned")
            .push(action.clone());
        Ok(())
    }
}

pub(super) struct RejectingNotifier;

#[async_trait]
impl AutomationNotifier for RejectingNotifier {
    async fn notify(&self, _action: &AutomationAction) -> Result<(), NotifierError> {
        Err(NotifierError::Rejected(503))
    }
}

/// Rule store whose reads fail, as if the database connection dropped.
pub(super) struct UnavailableRules;

#[async_trait]
impl RuleRepository for UnavailableRules {
    async fn active_rules(&self, _query: &RuleQuery) -> Result<Vec<ScoringRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn insert_rule(&self, _draft: RuleDraft) -> Result<ScoringRule, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn list_rules(&self) -> Result<Vec<ScoringRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn set_status(
        &self,
        _id: RuleId,
        _status: RuleStatus,
    ) -> Result<Option<ScoringRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Rule store that answers only after `delay`.
pub(super) struct SlowRules {
    pub(super) inner: MemoryRules,
    pub(super) delay: Duration,
}

#[async_trait]
impl RuleRepository for SlowRules {
    async fn active_rules(&self, query: &RuleQuery) -> Result<Vec<ScoringRule>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.active_rules(query).await
    }

    async fn insert_rule(&self, draft: RuleDraft) -> Result<ScoringRule, RepositoryError> {
        self.inner.insert_rule(draft).await
    }

    async fn list_rules(&self) -> Result<Vec<ScoringRule>, RepositoryError> {
        self.inner.list_rules().await
    }

    async fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
    ) -> Result<Option<ScoringRule>, RepositoryError> {
        self.inner.set_status(id, status).await
    }
}

/// Lead store that accepts every write except score updates.
#[derive(Default)]
pub(super) struct ReadOnlyScores {
    pub(super) inner: MemoryLeads,
}

#[async_trait]
impl LeadRepository for ReadOnlyScores {
    async fn insert_lead(
        &self,
        submission: LeadSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        self.inner.insert_lead(submission, created_at).await
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), RepositoryError> {
        self.inner.update_lead(lead).await
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        self.inner.get_lead(id).await
    }

    async fn update_lead_score(
        &self,
        _id: LeadId,
        _update: ScoreUpdate,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("scores are read only".to_string()))
    }
}
