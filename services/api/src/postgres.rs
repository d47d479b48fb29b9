//! Postgres-backed lead and rule stores.
//!
//! Enumerations are stored as their display labels and the rule score as free text, matching
//! what admins type into the CRM.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lead_scoring::config::DatabaseConfig;
use lead_scoring::workflows::leads::scoring::order_by_points;
use lead_scoring::workflows::leads::{
    AutomationTrigger, ConditionType, Lead, LeadId, LeadRepository, LeadStatus, LeadSubmission,
    Priority, RepositoryError, RuleDraft, RuleId, RuleQuery, RuleRepository, RuleStatus,
    ScoreUpdate, ScoreValue, ScoringRule,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

pub(crate) async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub(crate) async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn storage_error(error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::Decode(error.to_string())
        }
        other => RepositoryError::Unavailable(other.to_string()),
    }
}

/// Column list for lead queries.
const LEAD_COLUMNS: &str = "id, lead_type, name, email, phone, destination, departure_city, \
    travel_date, number_of_travelers, budget, lead_source, utm_source, utm_medium, utm_campaign, \
    special_requirements, status, notes, lead_score, lead_priority, last_score_calculated, \
    created_at, updated_at";

#[derive(Debug, FromRow)]
struct LeadRow {
    id: i64,
    lead_type: Option<String>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    destination: Option<String>,
    departure_city: Option<String>,
    travel_date: Option<NaiveDate>,
    number_of_travelers: Option<i32>,
    budget: Option<String>,
    lead_source: Option<String>,
    utm_source: Option<String>,
    utm_medium: Option<String>,
    utm_campaign: Option<String>,
    special_requirements: Option<String>,
    status: String,
    notes: Option<String>,
    lead_score: i64,
    lead_priority: Option<String>,
    last_score_calculated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = RepositoryError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let status = LeadStatus::parse(&row.status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown lead status '{}'", row.status)))?;
        let lead_priority = row
            .lead_priority
            .as_deref()
            .map(|raw| {
                Priority::parse(raw)
                    .ok_or_else(|| RepositoryError::Decode(format!("unknown priority '{raw}'")))
            })
            .transpose()?;
        let number_of_travelers = row
            .number_of_travelers
            .map(|count| {
                u32::try_from(count).map_err(|_| {
                    RepositoryError::Decode(format!("negative traveler count {count}"))
                })
            })
            .transpose()?;

        Ok(Lead {
            id: LeadId(row.id),
            lead_type: row.lead_type,
            name: row.name,
            email: row.email,
            phone: row.phone,
            destination: row.destination,
            departure_city: row.departure_city,
            travel_date: row.travel_date,
            number_of_travelers,
            budget: row.budget,
            lead_source: row.lead_source,
            utm_source: row.utm_source,
            utm_medium: row.utm_medium,
            utm_campaign: row.utm_campaign,
            special_requirements: row.special_requirements,
            status,
            notes: row.notes,
            lead_score: row.lead_score,
            lead_priority,
            last_score_calculated: row.last_score_calculated,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Intake bounds the traveler count, so a value beyond `INTEGER` is refused rather than clamped.
fn travelers_column(count: Option<u32>) -> Result<Option<i32>, RepositoryError> {
    count
        .map(|count| {
            i32::try_from(count).map_err(|_| {
                RepositoryError::Unavailable(format!(
                    "traveler count {count} does not fit the travelers column"
                ))
            })
        })
        .transpose()
}

pub(crate) struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn insert_lead(
        &self,
        submission: LeadSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<Lead, RepositoryError> {
        let query = format!(
            "INSERT INTO leads
                (lead_type, name, email, phone, destination, departure_city, travel_date,
                 number_of_travelers, budget, lead_source, utm_source, utm_medium, utm_campaign,
                 special_requirements, status, notes, lead_score, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 0,
                     $17, $17)
             RETURNING {LEAD_COLUMNS}"
        );
        let status = submission.status.unwrap_or_default();
        let travelers = travelers_column(submission.number_of_travelers)?;
        let row = sqlx::query_as::<_, LeadRow>(&query)
            .bind(&submission.lead_type)
            .bind(&submission.name)
            .bind(&submission.email)
            .bind(&submission.phone)
            .bind(&submission.destination)
            .bind(&submission.departure_city)
            .bind(submission.travel_date)
            .bind(travelers)
            .bind(&submission.budget)
            .bind(&submission.lead_source)
            .bind(&submission.utm_source)
            .bind(&submission.utm_medium)
            .bind(&submission.utm_campaign)
            .bind(&submission.special_requirements)
            .bind(status.label())
            .bind(&submission.notes)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Lead::try_from(row)
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), RepositoryError> {
        let travelers = travelers_column(lead.number_of_travelers)?;
        let result = sqlx::query(
            "UPDATE leads SET
                lead_type = $2, name = $3, email = $4, phone = $5, destination = $6,
                departure_city = $7, travel_date = $8, number_of_travelers = $9, budget = $10,
                lead_source = $11, utm_source = $12, utm_medium = $13, utm_campaign = $14,
                special_requirements = $15, status = $16, notes = $17, updated_at = $18
             WHERE id = $1",
        )
        .bind(lead.id.0)
        .bind(&lead.lead_type)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.destination)
        .bind(&lead.departure_city)
        .bind(lead.travel_date)
        .bind(travelers)
        .bind(&lead.budget)
        .bind(&lead.lead_source)
        .bind(&lead.utm_source)
        .bind(&lead.utm_medium)
        .bind(&lead.utm_campaign)
        .bind(&lead.special_requirements)
        .bind(lead.status.label())
        .bind(&lead.notes)
        .bind(lead.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        let query = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1");
        sqlx::query_as::<_, LeadRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(Lead::try_from)
            .transpose()
    }

    async fn update_lead_score(
        &self,
        id: LeadId,
        update: ScoreUpdate,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE leads
             SET lead_score = $2, lead_priority = $3, last_score_calculated = $4
             WHERE id = $1",
        )
        .bind(id.0)
        .bind(update.score)
        .bind(update.priority.label())
        .bind(update.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Column list for scoring rule queries.
const RULE_COLUMNS: &str = "id, rule_name, field_checked, condition_type, condition_value, \
    score_value, lead_type, automation_trigger, status, priority_range_hot, \
    priority_range_warm_min";

#[derive(Debug, FromRow)]
struct RuleRow {
    id: i64,
    rule_name: String,
    field_checked: String,
    condition_type: String,
    condition_value: Option<String>,
    score_value: String,
    lead_type: Option<String>,
    automation_trigger: String,
    status: String,
    priority_range_hot: Option<i64>,
    priority_range_warm_min: Option<i64>,
}

impl TryFrom<RuleRow> for ScoringRule {
    type Error = RepositoryError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let automation_trigger = AutomationTrigger::parse(&row.automation_trigger).ok_or_else(|| {
            RepositoryError::Decode(format!(
                "unknown automation trigger '{}'",
                row.automation_trigger
            ))
        })?;
        let status = RuleStatus::parse(&row.status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown rule status '{}'", row.status)))?;
        let score_value = match row.score_value.trim().parse::<i64>() {
            Ok(points) => ScoreValue::Points(points),
            Err(_) => ScoreValue::Raw(row.score_value),
        };

        Ok(ScoringRule {
            id: RuleId(row.id),
            rule_name: row.rule_name,
            field_checked: row.field_checked,
            condition_type: ConditionType::parse(&row.condition_type),
            condition_value: row.condition_value,
            score_value,
            lead_type: row.lead_type,
            automation_trigger,
            status,
            priority_range_hot: row.priority_range_hot,
            priority_range_warm_min: row.priority_range_warm_min,
        })
    }
}

fn score_column(value: &ScoreValue) -> String {
    match value {
        ScoreValue::Points(points) => points.to_string(),
        ScoreValue::Raw(raw) => raw.clone(),
    }
}

/// Decodes fetched rows and applies the same eligibility check as the in-memory store.
fn candidate_rules(
    rows: Vec<RuleRow>,
    query: &RuleQuery,
) -> Result<Vec<ScoringRule>, RepositoryError> {
    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        let rule = ScoringRule::try_from(row)?;
        if query.admits(&rule) {
            rules.push(rule);
        }
    }
    order_by_points(&mut rules);
    Ok(rules)
}

pub(crate) struct PgRuleRepository {
    pool: PgPool,
}

impl PgRuleRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    async fn active_rules(&self, query: &RuleQuery) -> Result<Vec<ScoringRule>, RepositoryError> {
        // score_value is free text, so points ordering happens after decoding.
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM lead_scoring_rules
             WHERE status = 'Active'
               AND (lead_type IS NULL OR btrim(lead_type) IN ('', $1))
               AND (automation_trigger = $2 OR automation_trigger = 'Both')
             ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(&query.lead_type)
            .bind(query.trigger.label())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        candidate_rules(rows, query)
    }

    async fn insert_rule(&self, draft: RuleDraft) -> Result<ScoringRule, RepositoryError> {
        let sql = format!(
            "INSERT INTO lead_scoring_rules
                (rule_name, field_checked, condition_type, condition_value, score_value,
                 lead_type, automation_trigger, status, priority_range_hot,
                 priority_range_warm_min)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {RULE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(&draft.rule_name)
            .bind(&draft.field_checked)
            .bind(draft.condition_type.name())
            .bind(&draft.condition_value)
            .bind(score_column(&draft.score_value))
            .bind(&draft.lead_type)
            .bind(draft.automation_trigger.label())
            .bind(draft.status.label())
            .bind(draft.priority_range_hot)
            .bind(draft.priority_range_warm_min)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        ScoringRule::try_from(row)
    }

    async fn list_rules(&self) -> Result<Vec<ScoringRule>, RepositoryError> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM lead_scoring_rules ORDER BY id ASC");
        sqlx::query_as::<_, RuleRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(ScoringRule::try_from)
            .collect()
    }

    async fn set_status(
        &self,
        id: RuleId,
        status: RuleStatus,
    ) -> Result<Option<ScoringRule>, RepositoryError> {
        let sql = format!(
            "UPDATE lead_scoring_rules SET status = $2 WHERE id = $1 RETURNING {RULE_COLUMNS}"
        );
        sqlx::query_as::<_, RuleRow>(&sql)
            .bind(id.0)
            .bind(status.label())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(ScoringRule::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_scoring::workflows::leads::TriggerType;

    fn rule_row(score_value: &str, trigger: &str) -> RuleRow {
        RuleRow {
            id: 7,
            rule_name: "Premium budget".to_string(),
            field_checked: "budget".to_string(),
            condition_type: "greater_than".to_string(),
            condition_value: Some("50000".to_string()),
            score_value: score_value.to_string(),
            lead_type: Some("FIT".to_string()),
            automation_trigger: trigger.to_string(),
            status: "Active".to_string(),
            priority_range_hot: Some(45),
            priority_range_warm_min: None,
        }
    }

    #[test]
    fn decodes_rule_rows() {
        let rule = ScoringRule::try_from(rule_row(" 15 ", "On Lead Create")).expect("decodes");
        assert_eq!(rule.score_value, ScoreValue::Points(15));
        assert_eq!(rule.automation_trigger, AutomationTrigger::OnLeadCreate);
        assert_eq!(rule.condition_type, ConditionType::GreaterThan);
    }

    #[test]
    fn keeps_free_text_scores_raw() {
        let rule = ScoringRule::try_from(rule_row("15 points", "Both")).expect("decodes");
        assert_eq!(rule.score_value, ScoreValue::Raw("15 points".to_string()));
        assert_eq!(score_column(&rule.score_value), "15 points");
    }

    #[test]
    fn candidates_match_padded_lead_types_and_order_by_points() {
        let mut padded = rule_row("10", "Both");
        padded.id = 1;
        padded.lead_type = Some("FIT ".to_string());
        let mut shared = rule_row("25", "On Lead Create");
        shared.id = 2;
        shared.lead_type = Some("  ".to_string());
        let mut group = rule_row("40", "Both");
        group.id = 3;
        group.lead_type = Some("Group".to_string());
        let mut update_only = rule_row("30", "On Lead Update");
        update_only.id = 4;

        let rules = candidate_rules(
            vec![padded, shared, group, update_only],
            &RuleQuery {
                lead_type: "FIT".to_string(),
                trigger: TriggerType::OnLeadCreate,
            },
        )
        .expect("rows decode");

        let ids: Vec<i64> = rules.iter().map(|rule| rule.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn traveler_counts_beyond_the_column_are_refused() {
        assert_eq!(travelers_column(Some(12)).expect("fits"), Some(12));
        assert_eq!(travelers_column(None).expect("absent"), None);
        assert!(matches!(
            travelers_column(Some(u32::MAX)),
            Err(RepositoryError::Unavailable(message)) if message.contains("4294967295")
        ));
    }

    #[test]
    fn rejects_unknown_trigger_labels() {
        let error = ScoringRule::try_from(rule_row("15", "Weekly")).expect_err("rejects");
        assert!(matches!(error, RepositoryError::Decode(message) if message.contains("Weekly")));
    }
}
