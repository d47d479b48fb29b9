use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{AutomationTrigger, ConditionType, RuleDraft, RuleStatus, ScoreValue};

#[derive(Debug)]
pub enum RuleImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, message: String },
}

impl std::fmt::Display for RuleImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleImportError::Io(err) => write!(f, "failed to read rule export: {}", err),
            RuleImportError::Csv(err) => write!(f, "invalid rule CSV data: {}", err),
            RuleImportError::InvalidRow { line, message } => {
                write!(f, "invalid rule on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for RuleImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleImportError::Io(err) => Some(err),
            RuleImportError::Csv(err) => Some(err),
            RuleImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for RuleImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RuleImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads scoring rules from the admin CSV export.
///
/// Score values are kept verbatim; a value that does not parse contributes 0 when scored.
/// Unknown condition types are kept too and simply never match.
pub struct RuleCsvImporter;

impl RuleCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RuleDraft>, RuleImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RuleDraft>, RuleImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut drafts = Vec::new();

        for (index, record) in csv_reader.deserialize::<RuleRow>().enumerate() {
            let row = record?;
            // Header occupies line 1.
            let line = index + 2;
            drafts.push(row.into_draft(line)?);
        }

        Ok(drafts)
    }
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    #[serde(rename = "Rule Name")]
    rule_name: String,
    #[serde(rename = "Field Checked")]
    field_checked: String,
    #[serde(rename = "Condition Type")]
    condition_type: String,
    #[serde(
        rename = "Condition Value",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    condition_value: Option<String>,
    #[serde(rename = "Score Value")]
    score_value: String,
    #[serde(rename = "Lead Type", default, deserialize_with = "empty_string_as_none")]
    lead_type: Option<String>,
    #[serde(
        rename = "Automation Trigger",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    automation_trigger: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(
        rename = "Priority Range Hot",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    priority_range_hot: Option<String>,
    #[serde(
        rename = "Priority Range Warm Min",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    priority_range_warm_min: Option<String>,
}

impl RuleRow {
    fn into_draft(self, line: usize) -> Result<RuleDraft, RuleImportError> {
        let invalid = |message: String| RuleImportError::InvalidRow { line, message };

        let automation_trigger = match self.automation_trigger.as_deref() {
            None => AutomationTrigger::default(),
            Some(raw) => AutomationTrigger::parse(raw)
                .ok_or_else(|| invalid(format!("unknown automation trigger '{raw}'")))?,
        };
        let status = match self.status.as_deref() {
            None => RuleStatus::default(),
            Some(raw) => {
                RuleStatus::parse(raw).ok_or_else(|| invalid(format!("unknown status '{raw}'")))?
            }
        };
        let priority_range_hot = parse_threshold(self.priority_range_hot.as_deref())
            .map_err(|raw| invalid(format!("hot threshold '{raw}' is not an integer")))?;
        let priority_range_warm_min = parse_threshold(self.priority_range_warm_min.as_deref())
            .map_err(|raw| invalid(format!("warm threshold '{raw}' is not an integer")))?;

        Ok(RuleDraft {
            rule_name: self.rule_name,
            field_checked: self.field_checked,
            condition_type: ConditionType::parse(&self.condition_type),
            condition_value: self.condition_value,
            score_value: ScoreValue::Raw(self.score_value),
            lead_type: self.lead_type,
            automation_trigger,
            status,
            priority_range_hot,
            priority_range_warm_min,
        })
    }
}

fn parse_threshold(raw: Option<&str>) -> Result<Option<i64>, String> {
    raw.map(|value| value.parse::<i64>().map_err(|_| value.to_string()))
        .transpose()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
