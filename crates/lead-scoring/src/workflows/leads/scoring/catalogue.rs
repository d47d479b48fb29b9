use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Catalogue consulted by the `matches_campaign` condition.
pub const GROUP_CAMPAIGN_TAG: &str = "group_campaign";
/// Catalogue consulted by the `high_inquiry_fit` condition.
pub const HIGH_INQUIRY_FIT_TAG: &str = "high_inquiry_fit";

const GROUP_CAMPAIGN_DESTINATIONS: [&str; 6] =
    ["kashmir", "ladakh", "kerala", "rajasthan", "himachal", "goa"];

const HIGH_INQUIRY_FIT_DESTINATIONS: [&str; 8] = [
    "dubai",
    "bali",
    "maldives",
    "thailand",
    "singapore",
    "europe",
    "paris",
    "switzerland",
];

/// Destination substrings keyed by campaign tag.
///
/// Loaded once at start-up and shared read-only by every scoring run. Entries are stored
/// lower-cased so matching only lower-cases the lead value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct DestinationCatalogues {
    campaigns: BTreeMap<String, Vec<String>>,
}

impl DestinationCatalogues {
    pub fn new(campaigns: BTreeMap<String, Vec<String>>) -> Self {
        let campaigns = campaigns
            .into_iter()
            .map(|(tag, destinations)| {
                let destinations = destinations
                    .into_iter()
                    .map(|destination| destination.trim().to_lowercase())
                    .filter(|destination| !destination.is_empty())
                    .collect();
                (tag.trim().to_string(), destinations)
            })
            .collect();

        Self { campaigns }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogueError> {
        let campaigns: BTreeMap<String, Vec<String>> = serde_json::from_reader(reader)?;
        Ok(Self::new(campaigns))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogueError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn destinations(&self, tag: &str) -> &[String] {
        self.campaigns
            .get(tag)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True when the already lower-cased value contains any destination of `tag`.
    pub fn matches(&self, tag: &str, lowercase_value: &str) -> bool {
        self.destinations(tag)
            .iter()
            .any(|destination| lowercase_value.contains(destination.as_str()))
    }
}

impl Default for DestinationCatalogues {
    fn default() -> Self {
        let mut campaigns = BTreeMap::new();
        campaigns.insert(
            GROUP_CAMPAIGN_TAG.to_string(),
            GROUP_CAMPAIGN_DESTINATIONS
                .iter()
                .map(|destination| destination.to_string())
                .collect(),
        );
        campaigns.insert(
            HIGH_INQUIRY_FIT_TAG.to_string(),
            HIGH_INQUIRY_FIT_DESTINATIONS
                .iter()
                .map(|destination| destination.to_string())
                .collect(),
        );
        Self { campaigns }
    }
}

impl From<BTreeMap<String, Vec<String>>> for DestinationCatalogues {
    fn from(value: BTreeMap<String, Vec<String>>) -> Self {
        Self::new(value)
    }
}

impl From<DestinationCatalogues> for BTreeMap<String, Vec<String>> {
    fn from(value: DestinationCatalogues) -> Self {
        value.campaigns
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read destination catalogue: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid destination catalogue JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalogues_cover_both_condition_tags() {
        let catalogues = DestinationCatalogues::default();
        assert!(catalogues.matches(GROUP_CAMPAIGN_TAG, "goa beach trip"));
        assert!(catalogues.matches(HIGH_INQUIRY_FIT_TAG, "bali honeymoon"));
        assert!(!catalogues.matches(HIGH_INQUIRY_FIT_TAG, "goa beach trip"));
    }

    #[test]
    fn loaded_catalogues_are_normalised() {
        let json = r#"{ "group_campaign": ["  Sikkim ", ""], "festivals": ["Pushkar"] }"#;
        let catalogues =
            DestinationCatalogues::from_reader(json.as_bytes()).expect("catalogue parses");

        assert_eq!(catalogues.destinations(GROUP_CAMPAIGN_TAG), ["sikkim"]);
        assert!(catalogues.matches("festivals", "pushkar camel fair"));
        assert!(catalogues.destinations(HIGH_INQUIRY_FIT_TAG).is_empty());
    }

    #[test]
    fn malformed_catalogue_reports_json_error() {
        let result = DestinationCatalogues::from_reader("[1, 2]".as_bytes());
        assert!(matches!(result, Err(CatalogueError::Json(_))));
    }
}
