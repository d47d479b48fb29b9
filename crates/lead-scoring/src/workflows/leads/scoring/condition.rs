use chrono::{DateTime, Utc};

use super::super::domain::{ConditionType, FieldValue};
use super::catalogue::{DestinationCatalogues, GROUP_CAMPAIGN_TAG, HIGH_INQUIRY_FIT_TAG};
use super::values::{
    midnight_utc, parse_datetime, parse_leading_float, parse_leading_integer, parse_range,
    ValueParseError,
};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Result of evaluating one condition against one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionResult {
    Matched,
    NotMatched,
    /// A side of the comparison could not be interpreted; never counts as a match.
    ParseFailed(ValueParseError),
}

impl ConditionResult {
    pub fn is_match(&self) -> bool {
        matches!(self, ConditionResult::Matched)
    }

    fn from_bool(matched: bool) -> Self {
        if matched {
            ConditionResult::Matched
        } else {
            ConditionResult::NotMatched
        }
    }
}

impl From<Result<bool, ValueParseError>> for ConditionResult {
    fn from(value: Result<bool, ValueParseError>) -> Self {
        match value {
            Ok(matched) => ConditionResult::from_bool(matched),
            Err(error) => ConditionResult::ParseFailed(error),
        }
    }
}

/// Pure evaluator for a single typed condition.
///
/// `now` anchors `within_days`; everything else is independent of time.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator<'a> {
    catalogues: &'a DestinationCatalogues,
    now: DateTime<Utc>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(catalogues: &'a DestinationCatalogues, now: DateTime<Utc>) -> Self {
        Self { catalogues, now }
    }

    pub fn evaluate(
        &self,
        field: Option<&FieldValue>,
        condition: ConditionType,
        condition_value: Option<&str>,
    ) -> ConditionResult {
        // Missing data never matches, `is_empty` included.
        let Some(field) = field else {
            return ConditionResult::NotMatched;
        };

        let text = field.to_lowercase_string();
        let expected = condition_value.unwrap_or_default();
        let expected_lower = expected.to_lowercase();

        match condition {
            ConditionType::Equals => ConditionResult::from_bool(text == expected_lower),
            ConditionType::NotEquals => ConditionResult::from_bool(text != expected_lower),
            ConditionType::Contains => {
                ConditionResult::from_bool(text.contains(expected_lower.as_str()))
            }
            ConditionType::NotContains => {
                ConditionResult::from_bool(!text.contains(expected_lower.as_str()))
            }
            ConditionType::NotEmpty => ConditionResult::from_bool(!text.trim().is_empty()),
            ConditionType::IsEmpty => ConditionResult::from_bool(text.trim().is_empty()),
            ConditionType::ContainsComma => ConditionResult::from_bool(text.contains(',')),
            ConditionType::GreaterThan => compare(field, expected, |lhs, rhs| lhs > rhs).into(),
            ConditionType::GreaterThanOrEqual => {
                compare(field, expected, |lhs, rhs| lhs >= rhs).into()
            }
            ConditionType::LessThan => compare(field, expected, |lhs, rhs| lhs < rhs).into(),
            ConditionType::LessThanOrEqual => {
                compare(field, expected, |lhs, rhs| lhs <= rhs).into()
            }
            ConditionType::Between => between(field, expected).into(),
            ConditionType::WithinDays => self.within_days(field, expected).into(),
            ConditionType::MatchesCampaign => {
                ConditionResult::from_bool(self.catalogues.matches(GROUP_CAMPAIGN_TAG, &text))
            }
            ConditionType::HighInquiryFit => {
                ConditionResult::from_bool(self.catalogues.matches(HIGH_INQUIRY_FIT_TAG, &text))
            }
            ConditionType::Unknown => ConditionResult::NotMatched,
        }
    }

    fn within_days(&self, field: &FieldValue, expected: &str) -> Result<bool, ValueParseError> {
        let window = parse_leading_integer(expected)?;
        let target = match field {
            FieldValue::Date(date) => midnight_utc(*date),
            FieldValue::Text(raw) => parse_datetime(raw)?,
            FieldValue::Number(value) => {
                return Err(ValueParseError::NotADate(value.to_string()));
            }
        };

        let elapsed = (target - self.now).num_milliseconds() as f64;
        let days = (elapsed / MILLIS_PER_DAY).ceil();
        Ok(days >= 0.0 && days <= window as f64)
    }
}

fn numeric(field: &FieldValue) -> Result<f64, ValueParseError> {
    match field {
        FieldValue::Number(value) => Ok(*value),
        other => parse_leading_float(&other.to_lowercase_string()),
    }
}

fn compare(
    field: &FieldValue,
    expected: &str,
    op: impl Fn(f64, f64) -> bool,
) -> Result<bool, ValueParseError> {
    let actual = numeric(field)?;
    let threshold = parse_leading_float(expected)?;
    Ok(op(actual, threshold))
}

fn between(field: &FieldValue, expected: &str) -> Result<bool, ValueParseError> {
    let actual = numeric(field)?;
    let (min, max) = parse_range(expected)?;
    Ok(actual >= min && actual <= max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time")
            .and_utc()
    }

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    fn check(field: Option<&FieldValue>, condition: ConditionType, value: &str) -> bool {
        let catalogues = DestinationCatalogues::default();
        ConditionEvaluator::new(&catalogues, now())
            .evaluate(field, condition, Some(value))
            .is_match()
    }

    #[test]
    fn missing_field_never_matches() {
        for condition in ConditionType::ALL {
            assert!(
                !check(None, condition, "anything"),
                "{} matched a missing field",
                condition.name()
            );
        }
        assert!(!check(None, ConditionType::IsEmpty, ""));
    }

    #[test]
    fn blank_value_satisfies_is_empty() {
        assert!(check(Some(&text("  ")), ConditionType::IsEmpty, ""));
        assert!(!check(Some(&text("  ")), ConditionType::NotEmpty, ""));
        assert!(check(Some(&text("Goa")), ConditionType::NotEmpty, ""));
    }

    #[test]
    fn text_conditions_ignore_case() {
        assert!(check(Some(&text("Dubai")), ConditionType::Contains, "DUBAI"));
        assert!(check(Some(&text("Group")), ConditionType::Equals, "group"));
        assert!(check(Some(&text("FIT")), ConditionType::NotEquals, "group"));
        assert!(check(Some(&text("Kerala")), ConditionType::NotContains, "goa"));
    }

    #[test]
    fn contains_comma_flags_multi_destination_values() {
        assert!(check(Some(&text("Goa, Kerala")), ConditionType::ContainsComma, ""));
        assert!(!check(Some(&text("Goa")), ConditionType::ContainsComma, ""));
    }

    #[test]
    fn numeric_comparisons_parse_both_sides() {
        assert!(check(Some(&text("60000")), ConditionType::GreaterThan, "50000"));
        assert!(check(Some(&text("50000")), ConditionType::GreaterThanOrEqual, "50000"));
        assert!(check(Some(&FieldValue::Number(4.0)), ConditionType::LessThan, "5"));
        assert!(check(Some(&FieldValue::Number(5.0)), ConditionType::LessThanOrEqual, "5"));
        assert!(!check(Some(&text("40000")), ConditionType::GreaterThan, "50000"));
    }

    #[test]
    fn unparseable_numbers_are_tagged_and_do_not_match() {
        let catalogues = DestinationCatalogues::default();
        let evaluator = ConditionEvaluator::new(&catalogues, now());

        let result = evaluator.evaluate(
            Some(&text("flexible")),
            ConditionType::GreaterThan,
            Some("50000"),
        );
        assert!(matches!(
            result,
            ConditionResult::ParseFailed(ValueParseError::NotANumber(_))
        ));
        assert!(!result.is_match());

        let result = evaluator.evaluate(Some(&text("10")), ConditionType::LessThan, None);
        assert!(matches!(result, ConditionResult::ParseFailed(_)));
    }

    #[test]
    fn between_is_inclusive() {
        assert!(check(Some(&text("25")), ConditionType::Between, "20,30"));
        assert!(check(Some(&text("20")), ConditionType::Between, "20,30"));
        assert!(check(Some(&text("30")), ConditionType::Between, " 20 , 30 "));
        assert!(!check(Some(&text("19")), ConditionType::Between, "20,30"));
    }

    #[test]
    fn between_with_swapped_bounds_never_matches() {
        assert!(!check(Some(&text("25")), ConditionType::Between, "30,20"));
        assert!(!check(Some(&text("30")), ConditionType::Between, "30,20"));
    }

    #[test]
    fn between_with_malformed_range_reports_parse_failure() {
        let catalogues = DestinationCatalogues::default();
        let result = ConditionEvaluator::new(&catalogues, now()).evaluate(
            Some(&text("25")),
            ConditionType::Between,
            Some("20"),
        );
        assert_eq!(
            result,
            ConditionResult::ParseFailed(ValueParseError::MalformedRange("20".to_string()))
        );
    }

    #[test]
    fn within_days_includes_today_and_excludes_past() {
        assert!(check(Some(&text("2024-01-01")), ConditionType::WithinDays, "0"));
        assert!(!check(Some(&text("2023-12-31")), ConditionType::WithinDays, "5"));
        assert!(check(Some(&text("2024-01-06")), ConditionType::WithinDays, "5"));
        assert!(!check(Some(&text("2024-01-07")), ConditionType::WithinDays, "5"));
    }

    #[test]
    fn within_days_rounds_partial_days_up() {
        let catalogues = DestinationCatalogues::default();
        let afternoon = now() + Duration::hours(15);
        let evaluator = ConditionEvaluator::new(&catalogues, afternoon);

        let today = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid"));
        assert!(evaluator
            .evaluate(Some(&today), ConditionType::WithinDays, Some("0"))
            .is_match());

        let tomorrow = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid"));
        assert!(!evaluator
            .evaluate(Some(&tomorrow), ConditionType::WithinDays, Some("0"))
            .is_match());
        assert!(evaluator
            .evaluate(Some(&tomorrow), ConditionType::WithinDays, Some("1"))
            .is_match());
    }

    #[test]
    fn within_days_rejects_malformed_dates() {
        let catalogues = DestinationCatalogues::default();
        let result = ConditionEvaluator::new(&catalogues, now()).evaluate(
            Some(&text("sometime in spring")),
            ConditionType::WithinDays,
            Some("30"),
        );
        assert!(matches!(
            result,
            ConditionResult::ParseFailed(ValueParseError::NotADate(_))
        ));
    }

    #[test]
    fn catalogue_conditions_use_substring_matching() {
        assert!(check(
            Some(&text("Kashmir Group Tour")),
            ConditionType::MatchesCampaign,
            ""
        ));
        assert!(check(
            Some(&text("Maldives honeymoon")),
            ConditionType::HighInquiryFit,
            ""
        ));
        assert!(!check(Some(&text("Iceland")), ConditionType::HighInquiryFit, ""));
    }

    #[test]
    fn unknown_condition_never_matches() {
        assert!(!check(Some(&text("goa")), ConditionType::Unknown, "goa"));
    }
}
