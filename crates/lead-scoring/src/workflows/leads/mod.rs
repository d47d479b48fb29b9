//! Lead intake with rule-based auto-scoring.
//!
//! Inbound leads are persisted first and scored second. The scoring engine evaluates the
//! admin-configured rules that apply to the lead's type and the triggering event, classifies the
//! total into Hot / Warm / Cold, and writes the result back onto the lead. Hot leads created
//! through intake fire an automation notification. Scoring failures never fail the lead write.

pub mod admin;
pub mod domain;
pub mod import;
pub mod orchestrator;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use admin::{
    validate_rule, RuleAdminError, RuleAdminService, RuleValidationError, MAX_RULE_POINTS,
};
pub use domain::{
    AutomationAction, AutomationTrigger, ConditionType, FieldValue, Lead, LeadEnvelope,
    LeadField, LeadId, LeadPatch, LeadStatus, LeadSubmission, Priority, RuleDraft, RuleId,
    RuleStatus, ScoreValue, ScoringOutcome, ScoringRule, TriggerType, DEFAULT_LEAD_TYPE,
};
pub use import::{RuleCsvImporter, RuleImportError};
pub use orchestrator::{ScoringError, ScoringOrchestrator, ScoringStage, DEFAULT_SCORING_TIMEOUT};
pub use repository::{
    AutomationNotifier, LeadRepository, NotifierError, RepositoryError, RuleQuery,
    RuleRepository, ScoreUpdate,
};
pub use router::{lead_router, rule_router};
pub use scoring::{
    DestinationCatalogues, RuleSet, ScoreBreakdown, ScoringEngine, ScoringReport, Thresholds,
};
pub use service::{LeadService, LeadServiceError, LeadValidationError, MAX_TRAVELERS};
