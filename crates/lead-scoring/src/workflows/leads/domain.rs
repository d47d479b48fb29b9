use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::scoring::values::{parse_leading_integer, ValueParseError};

/// Lead type assumed when a submission or stored lead does not carry one.
pub const DEFAULT_LEAD_TYPE: &str = "FIT";

/// Identifier wrapper for stored leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub i64);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for admin-configured scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub i64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority tier derived from a lead's total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Hot,
    Warm,
    Cold,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Priority::Hot => "Hot",
            Priority::Warm => "Warm",
            Priority::Cold => "Cold",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Hot" => Some(Priority::Hot),
            "Warm" => Some(Priority::Warm),
            "Cold" => Some(Priority::Cold),
            _ => None,
        }
    }
}

/// Lifecycle event that starts a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerType {
    #[serde(rename = "On Lead Create")]
    OnLeadCreate,
    #[serde(rename = "On Lead Update")]
    OnLeadUpdate,
}

impl TriggerType {
    pub const fn label(self) -> &'static str {
        match self {
            TriggerType::OnLeadCreate => "On Lead Create",
            TriggerType::OnLeadUpdate => "On Lead Update",
        }
    }
}

/// Trigger events a rule is eligible to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AutomationTrigger {
    #[serde(rename = "On Lead Create")]
    OnLeadCreate,
    #[serde(rename = "On Lead Update")]
    OnLeadUpdate,
    #[default]
    Both,
}

impl AutomationTrigger {
    pub const fn label(self) -> &'static str {
        match self {
            AutomationTrigger::OnLeadCreate => "On Lead Create",
            AutomationTrigger::OnLeadUpdate => "On Lead Update",
            AutomationTrigger::Both => "Both",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "On Lead Create" => Some(AutomationTrigger::OnLeadCreate),
            "On Lead Update" => Some(AutomationTrigger::OnLeadUpdate),
            "Both" => Some(AutomationTrigger::Both),
            _ => None,
        }
    }

    pub fn applies_to(self, trigger: TriggerType) -> bool {
        matches!(
            (self, trigger),
            (AutomationTrigger::Both, _)
                | (AutomationTrigger::OnLeadCreate, TriggerType::OnLeadCreate)
                | (AutomationTrigger::OnLeadUpdate, TriggerType::OnLeadUpdate)
        )
    }
}

/// Rules are deactivated rather than deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuleStatus {
    #[default]
    Active,
    Inactive,
}

impl RuleStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RuleStatus::Active => "Active",
            RuleStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Active" => Some(RuleStatus::Active),
            "Inactive" => Some(RuleStatus::Inactive),
            _ => None,
        }
    }
}

/// Sales pipeline status; not consulted by scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Converted => "Converted",
            LeadStatus::Lost => "Lost",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "New" => Some(LeadStatus::New),
            "Contacted" => Some(LeadStatus::Contacted),
            "Qualified" => Some(LeadStatus::Qualified),
            "Converted" => Some(LeadStatus::Converted),
            "Lost" => Some(LeadStatus::Lost),
            _ => None,
        }
    }
}

/// Comparison operator a scoring rule applies to a lead field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    NotEmpty,
    IsEmpty,
    ContainsComma,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    WithinDays,
    MatchesCampaign,
    HighInquiryFit,
    #[serde(other)]
    Unknown,
}

impl ConditionType {
    pub const ALL: [ConditionType; 15] = [
        ConditionType::Equals,
        ConditionType::NotEquals,
        ConditionType::Contains,
        ConditionType::NotContains,
        ConditionType::NotEmpty,
        ConditionType::IsEmpty,
        ConditionType::ContainsComma,
        ConditionType::GreaterThan,
        ConditionType::GreaterThanOrEqual,
        ConditionType::LessThan,
        ConditionType::LessThanOrEqual,
        ConditionType::Between,
        ConditionType::WithinDays,
        ConditionType::MatchesCampaign,
        ConditionType::HighInquiryFit,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ConditionType::Equals => "equals",
            ConditionType::NotEquals => "not_equals",
            ConditionType::Contains => "contains",
            ConditionType::NotContains => "not_contains",
            ConditionType::NotEmpty => "not_empty",
            ConditionType::IsEmpty => "is_empty",
            ConditionType::ContainsComma => "contains_comma",
            ConditionType::GreaterThan => "greater_than",
            ConditionType::GreaterThanOrEqual => "greater_than_or_equal",
            ConditionType::LessThan => "less_than",
            ConditionType::LessThanOrEqual => "less_than_or_equal",
            ConditionType::Between => "between",
            ConditionType::WithinDays => "within_days",
            ConditionType::MatchesCampaign => "matches_campaign",
            ConditionType::HighInquiryFit => "high_inquiry_fit",
            ConditionType::Unknown => "unknown",
        }
    }

    /// Unrecognised names map to [`ConditionType::Unknown`], which never matches.
    pub fn parse(raw: &str) -> Self {
        let key = raw.trim();
        Self::ALL
            .into_iter()
            .find(|condition| condition.name() == key)
            .unwrap_or(ConditionType::Unknown)
    }

    /// Conditions whose `condition_value` must be present for the rule to be meaningful.
    pub const fn requires_value(self) -> bool {
        matches!(
            self,
            ConditionType::Equals
                | ConditionType::NotEquals
                | ConditionType::Contains
                | ConditionType::NotContains
                | ConditionType::GreaterThan
                | ConditionType::GreaterThanOrEqual
                | ConditionType::LessThan
                | ConditionType::LessThanOrEqual
                | ConditionType::Between
                | ConditionType::WithinDays
        )
    }
}

/// Lead attributes a scoring rule may reference by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    Name,
    Email,
    Phone,
    Destination,
    DepartureCity,
    TravelDate,
    NumberOfTravelers,
    Budget,
    LeadSource,
    LeadType,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    SpecialRequirements,
}

impl LeadField {
    pub const ALL: [LeadField; 14] = [
        LeadField::Name,
        LeadField::Email,
        LeadField::Phone,
        LeadField::Destination,
        LeadField::DepartureCity,
        LeadField::TravelDate,
        LeadField::NumberOfTravelers,
        LeadField::Budget,
        LeadField::LeadSource,
        LeadField::LeadType,
        LeadField::UtmSource,
        LeadField::UtmMedium,
        LeadField::UtmCampaign,
        LeadField::SpecialRequirements,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            LeadField::Name => "name",
            LeadField::Email => "email",
            LeadField::Phone => "phone",
            LeadField::Destination => "destination",
            LeadField::DepartureCity => "departure_city",
            LeadField::TravelDate => "travel_date",
            LeadField::NumberOfTravelers => "number_of_travelers",
            LeadField::Budget => "budget",
            LeadField::LeadSource => "lead_source",
            LeadField::LeadType => "lead_type",
            LeadField::UtmSource => "utm_source",
            LeadField::UtmMedium => "utm_medium",
            LeadField::UtmCampaign => "utm_campaign",
            LeadField::SpecialRequirements => "special_requirements",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        Self::ALL.into_iter().find(|field| field.name() == key)
    }
}

/// Typed value resolved from a lead for condition evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl FieldValue {
    /// Lower-cased string form used by the text conditions.
    pub fn to_lowercase_string(&self) -> String {
        match self {
            FieldValue::Text(value) => value.to_lowercase(),
            FieldValue::Number(value) => value.to_string(),
            FieldValue::Date(value) => value.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A prospective customer inquiry together with its computed scoring attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    #[serde(default)]
    pub lead_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub departure_city: Option<String>,
    #[serde(default)]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub number_of_travelers: Option<u32>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub lead_score: i64,
    #[serde(default)]
    pub lead_priority: Option<Priority>,
    #[serde(default)]
    pub last_score_calculated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn from_submission(id: LeadId, submission: LeadSubmission, now: DateTime<Utc>) -> Self {
        let LeadSubmission {
            lead_type,
            name,
            email,
            phone,
            destination,
            departure_city,
            travel_date,
            number_of_travelers,
            budget,
            lead_source,
            utm_source,
            utm_medium,
            utm_campaign,
            special_requirements,
            status,
            notes,
        } = submission;

        Self {
            id,
            lead_type,
            name,
            email,
            phone,
            destination,
            departure_city,
            travel_date,
            number_of_travelers,
            budget,
            lead_source,
            utm_source,
            utm_medium,
            utm_campaign,
            special_requirements,
            status: status.unwrap_or_default(),
            notes,
            lead_score: 0,
            lead_priority: None,
            last_score_calculated: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lead type used for rule selection; blank or missing types fall back to FIT.
    pub fn effective_lead_type(&self) -> &str {
        match self.lead_type.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => DEFAULT_LEAD_TYPE,
        }
    }

    /// Resolves a rule's field through the typed accessor for that attribute.
    pub fn field(&self, field: LeadField) -> Option<FieldValue> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);

        match field {
            LeadField::Name => text(&self.name),
            LeadField::Email => text(&self.email),
            LeadField::Phone => text(&self.phone),
            LeadField::Destination => text(&self.destination),
            LeadField::DepartureCity => text(&self.departure_city),
            LeadField::TravelDate => self.travel_date.map(FieldValue::Date),
            LeadField::NumberOfTravelers => self
                .number_of_travelers
                .map(|count| FieldValue::Number(f64::from(count))),
            LeadField::Budget => text(&self.budget),
            LeadField::LeadSource => text(&self.lead_source),
            LeadField::LeadType => Some(FieldValue::Text(self.effective_lead_type().to_string())),
            LeadField::UtmSource => text(&self.utm_source),
            LeadField::UtmMedium => text(&self.utm_medium),
            LeadField::UtmCampaign => text(&self.utm_campaign),
            LeadField::SpecialRequirements => text(&self.special_requirements),
        }
    }

    pub fn apply_score(&mut self, outcome: &ScoringOutcome, calculated_at: DateTime<Utc>) {
        self.lead_score = outcome.score;
        self.lead_priority = Some(outcome.priority);
        self.last_score_calculated = Some(calculated_at);
    }

    /// Applies a partial update, returning whether a scoring-relevant field changed.
    pub fn apply_patch(&mut self, patch: LeadPatch, now: DateTime<Utc>) -> bool {
        let touches_scoring = patch.touches_scoring_fields();
        let LeadPatch {
            lead_type,
            name,
            email,
            phone,
            destination,
            departure_city,
            travel_date,
            number_of_travelers,
            budget,
            lead_source,
            utm_source,
            utm_medium,
            utm_campaign,
            special_requirements,
            status,
            notes,
        } = patch;

        fn set<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut self.lead_type, lead_type);
        set(&mut self.name, name);
        set(&mut self.email, email);
        set(&mut self.phone, phone);
        set(&mut self.destination, destination);
        set(&mut self.departure_city, departure_city);
        set(&mut self.travel_date, travel_date);
        set(&mut self.number_of_travelers, number_of_travelers);
        set(&mut self.budget, budget);
        set(&mut self.lead_source, lead_source);
        set(&mut self.utm_source, utm_source);
        set(&mut self.utm_medium, utm_medium);
        set(&mut self.utm_campaign, utm_campaign);
        set(&mut self.special_requirements, special_requirements);
        set(&mut self.notes, notes);
        if let Some(status) = status {
            self.status = status;
        }
        self.updated_at = now;

        touches_scoring
    }
}

/// Inbound lead payload accepted by the intake endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadSubmission {
    #[serde(default)]
    pub lead_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub departure_city: Option<String>,
    #[serde(default)]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub number_of_travelers: Option<u32>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial lead update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default)]
    pub lead_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub departure_city: Option<String>,
    #[serde(default)]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub number_of_travelers: Option<u32>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub status: Option<LeadStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LeadPatch {
    pub fn touches_scoring_fields(&self) -> bool {
        self.lead_type.is_some()
            || self.name.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.destination.is_some()
            || self.departure_city.is_some()
            || self.travel_date.is_some()
            || self.number_of_travelers.is_some()
            || self.budget.is_some()
            || self.lead_source.is_some()
            || self.utm_source.is_some()
            || self.utm_medium.is_some()
            || self.utm_campaign.is_some()
            || self.special_requirements.is_some()
    }
}

/// Rule point delta, either typed or as the raw text an admin entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Points(i64),
    Raw(String),
}

impl ScoreValue {
    pub fn points(&self) -> Result<i64, ValueParseError> {
        match self {
            ScoreValue::Points(points) => Ok(*points),
            ScoreValue::Raw(raw) => parse_leading_integer(raw),
        }
    }

    /// Ordering key for rule fetches; unparseable values sort as zero.
    pub fn sort_key(&self) -> i64 {
        self.points().unwrap_or(0)
    }
}

impl From<i64> for ScoreValue {
    fn from(value: i64) -> Self {
        ScoreValue::Points(value)
    }
}

/// One admin-configured rule in the scoring ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub id: RuleId,
    pub rule_name: String,
    pub field_checked: String,
    pub condition_type: ConditionType,
    #[serde(default)]
    pub condition_value: Option<String>,
    pub score_value: ScoreValue,
    #[serde(default)]
    pub lead_type: Option<String>,
    #[serde(default)]
    pub automation_trigger: AutomationTrigger,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub priority_range_hot: Option<i64>,
    #[serde(default)]
    pub priority_range_warm_min: Option<i64>,
}

impl ScoringRule {
    pub fn from_draft(id: RuleId, draft: RuleDraft) -> Self {
        let RuleDraft {
            rule_name,
            field_checked,
            condition_type,
            condition_value,
            score_value,
            lead_type,
            automation_trigger,
            status,
            priority_range_hot,
            priority_range_warm_min,
        } = draft;

        Self {
            id,
            rule_name,
            field_checked,
            condition_type,
            condition_value,
            score_value,
            lead_type,
            automation_trigger,
            status,
            priority_range_hot,
            priority_range_warm_min,
        }
    }

    /// Rules with an empty or missing lead type apply to every lead type.
    pub fn applies_to_lead_type(&self, lead_type: &str) -> bool {
        match self.lead_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(value) => value == lead_type,
        }
    }

    /// Active, lead-type compatible and eligible for the trigger.
    pub fn is_eligible(&self, lead_type: &str, trigger: TriggerType) -> bool {
        self.status == RuleStatus::Active
            && self.applies_to_lead_type(lead_type)
            && self.automation_trigger.applies_to(trigger)
    }
}

/// Rule payload before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub rule_name: String,
    pub field_checked: String,
    pub condition_type: ConditionType,
    #[serde(default)]
    pub condition_value: Option<String>,
    pub score_value: ScoreValue,
    #[serde(default)]
    pub lead_type: Option<String>,
    #[serde(default)]
    pub automation_trigger: AutomationTrigger,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub priority_range_hot: Option<i64>,
    #[serde(default)]
    pub priority_range_warm_min: Option<i64>,
}

/// Result of one scoring run, folded back into the lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub score: i64,
    pub priority: Priority,
}

/// Payload posted to the automation endpoint when a lead is classified Hot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationAction {
    pub lead_id: LeadId,
    pub priority: Priority,
    pub score: i64,
}

/// API response for lead create/update; `scoring` is null when auto-calculation did not run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadEnvelope {
    pub lead: Lead,
    pub scoring: Option<ScoringOutcome>,
}
