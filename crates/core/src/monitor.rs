//! Configuration handed to the scraping worker for one run.

use serde::{Deserialize, Serialize};

use crate::validation::StartInput;

/// Default polling interval of the scraper.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10_000;

/// Default selectors the scraper uses to pick job cards on the page.
pub const DEFAULT_PROFILE_SELECTORS: &[&str] = &[
    "[data-test-id='JobCard']",
    ".jobCardItem",
    "div[role='listitem']",
];

/// Server-side inputs that do not come from the start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDefaults {
    pub refresh_interval_ms: u64,
    pub profile_selectors: Vec<String>,
}

impl Default for MonitorDefaults {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            profile_selectors: DEFAULT_PROFILE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Everything the worker needs for one monitoring run.
///
/// Constructed once per start request, owned by the worker for the run,
/// discarded on stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    #[serde(rename = "targetURL")]
    pub target_url: String,
    pub target_positions: Vec<String>,
    pub refresh_interval_ms: u64,
    pub profile_selectors: Vec<String>,
}

impl MonitorConfig {
    /// Build a config from validated input.
    ///
    /// Only the first accepted link becomes the target; additional links are
    /// not monitored.
    pub fn from_start(input: &StartInput, defaults: &MonitorDefaults) -> Self {
        Self {
            target_url: input.primary_link().to_string(),
            target_positions: input.positions().to_vec(),
            refresh_interval_ms: defaults.refresh_interval_ms,
            profile_selectors: defaults.profile_selectors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate_start, DEFAULT_HIRING_SITE_PREFIX};

    #[test]
    fn config_uses_first_link_only() {
        let input = validate_start(
            &[
                "https://hiring.amazon/a".to_string(),
                "https://hiring.amazon/b".to_string(),
            ],
            &["Engineer".to_string(), "Picker".to_string()],
            DEFAULT_HIRING_SITE_PREFIX,
        )
        .unwrap();

        let config = MonitorConfig::from_start(&input, &MonitorDefaults::default());

        assert_eq!(config.target_url, "https://hiring.amazon/a");
        assert_eq!(config.target_positions, ["Engineer", "Picker"]);
        assert_eq!(config.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert_eq!(config.profile_selectors.len(), DEFAULT_PROFILE_SELECTORS.len());
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let config = MonitorConfig {
            target_url: "https://hiring.amazon/x".into(),
            target_positions: vec!["Engineer".into()],
            refresh_interval_ms: 500,
            profile_selectors: vec![".card".into()],
        };

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["targetURL"], "https://hiring.amazon/x");
        assert_eq!(json["targetPositions"][0], "Engineer");
        assert_eq!(json["refreshIntervalMs"], 500);
        assert_eq!(json["profileSelectors"][0], ".card");
    }
}
