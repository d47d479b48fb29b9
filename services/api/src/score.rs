use crate::server::load_catalogues;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use lead_scoring::config::{ConfigError, ScoringConfig};
use lead_scoring::error::AppError;
use lead_scoring::workflows::leads::scoring::order_by_points;
use lead_scoring::workflows::leads::{
    Lead, LeadId, LeadSubmission, RuleCsvImporter, RuleDraft, RuleId, RuleQuery, ScoringEngine,
    ScoringReport, ScoringRule, Thresholds, TriggerType, DEFAULT_LEAD_TYPE,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Admin CSV export containing the scoring rules
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// Lead submission as JSON
    #[arg(long)]
    pub(crate) lead: PathBuf,
    /// Lifecycle event to score for
    #[arg(long, value_enum, default_value_t = TriggerArg::Create)]
    pub(crate) trigger: TriggerArg,
    /// Destination catalogue JSON replacing the built-in campaign lists
    #[arg(long)]
    pub(crate) catalogue: Option<PathBuf>,
    /// Default hot threshold when the ruleset carries none
    #[arg(long)]
    pub(crate) hot: Option<i64>,
    /// Default warm threshold when the ruleset carries none
    #[arg(long)]
    pub(crate) warm: Option<i64>,
    /// Evaluation date for `within_days` rules (YYYY-MM-DD, defaults to now)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum TriggerArg {
    Create,
    Update,
}

impl From<TriggerArg> for TriggerType {
    fn from(value: TriggerArg) -> Self {
        match value {
            TriggerArg::Create => TriggerType::OnLeadCreate,
            TriggerArg::Update => TriggerType::OnLeadUpdate,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let defaults = Thresholds::default();
    let thresholds = Thresholds::new(
        args.hot.unwrap_or(defaults.hot()),
        args.warm.unwrap_or(defaults.warm_min()),
    )
    .map_err(ConfigError::Thresholds)?;

    let catalogues = load_catalogues(&ScoringConfig {
        enabled: true,
        thresholds,
        timeout: Duration::ZERO,
        catalogue_path: args.catalogue.clone(),
        seed_rules_path: None,
    })?;
    let engine = ScoringEngine::new(catalogues, thresholds);

    let drafts = RuleCsvImporter::from_path(&args.rules)?;
    let submission: LeadSubmission = serde_json::from_reader(std::fs::File::open(&args.lead)?)?;
    let now = args
        .today
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now);

    let lead = offline_lead(submission, now);
    let report = score_offline(&engine, &lead, drafts, args.trigger.into(), now);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&lead, &report, args.trigger.into());
    }
    Ok(())
}

fn offline_lead(mut submission: LeadSubmission, now: DateTime<Utc>) -> Lead {
    if submission
        .lead_type
        .as_deref()
        .map_or(true, |value| value.trim().is_empty())
    {
        submission.lead_type = Some(DEFAULT_LEAD_TYPE.to_string());
    }
    Lead::from_submission(LeadId(0), submission, now)
}

/// Applies the same candidate selection as the rule stores to an imported ruleset.
pub(crate) fn score_offline(
    engine: &ScoringEngine,
    lead: &Lead,
    drafts: Vec<RuleDraft>,
    trigger: TriggerType,
    now: DateTime<Utc>,
) -> ScoringReport {
    let query = RuleQuery {
        lead_type: lead.effective_lead_type().to_string(),
        trigger,
    };
    let mut rules: Vec<ScoringRule> = drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| ScoringRule::from_draft(RuleId(index as i64 + 1), draft))
        .filter(|rule| query.admits(rule))
        .collect();
    order_by_points(&mut rules);

    engine.score(lead, &engine.ruleset(rules), now)
}

fn render_report(lead: &Lead, report: &ScoringReport, trigger: TriggerType) {
    println!(
        "Lead score ({} / {})",
        lead.effective_lead_type(),
        trigger.label()
    );
    println!(
        "- Total: {} -> {}",
        report.outcome.score,
        report.outcome.priority.label()
    );
    println!(
        "- Thresholds: hot >= {}, warm >= {}",
        report.thresholds.hot(),
        report.thresholds.warm_min()
    );

    if report.breakdown.evaluations.is_empty() {
        println!("- No applicable rules");
        return;
    }

    println!("\nRules evaluated");
    for evaluation in &report.breakdown.evaluations {
        let marker = if evaluation.matched { "+" } else { " " };
        print!(
            "{marker} [{:>4}] {} ({} {})",
            evaluation.points,
            evaluation.rule_name,
            evaluation.field_checked,
            evaluation.condition_type.name()
        );
        match &evaluation.note {
            Some(note) => println!(" - {note}"),
            None => println!(),
        }
    }
}
