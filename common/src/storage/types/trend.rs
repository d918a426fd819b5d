use serde::{Deserialize, Serialize};

/// A topic candidate that drives content generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trend {
    pub trend: String,
    pub volume: String,
    pub breakdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<String>,
}

impl Trend {
    pub const CUSTOM_VOLUME: &'static str = "Custom";

    pub fn new(
        trend: impl Into<String>,
        volume: impl Into<String>,
        breakdown: impl Into<String>,
    ) -> Self {
        Self {
            trend: trend.into(),
            volume: volume.into(),
            breakdown: breakdown.into(),
            started: None,
            ended: None,
        }
    }

    /// A user-authored topic, tagged so it can be told apart from discovered trends.
    pub fn custom(topic: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(topic, Self::CUSTOM_VOLUME, description)
    }

    pub fn is_custom(&self) -> bool {
        self.volume == Self::CUSTOM_VOLUME
    }
}

/// Filter criteria forwarded to trend discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    #[serde(default = "default_geo")]
    pub geo: String,
    #[serde(default = "default_hours")]
    pub hours: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_max_videos")]
    pub max_videos: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            geo: default_geo(),
            hours: default_hours(),
            category: default_category(),
            status: default_status(),
            sort: default_sort(),
            max_videos: default_max_videos(),
        }
    }
}

fn default_geo() -> String {
    "US".to_string()
}

fn default_hours() -> String {
    "24".to_string()
}

fn default_category() -> String {
    "all".to_string()
}

fn default_status() -> String {
    "active".to_string()
}

fn default_sort() -> String {
    "relevance".to_string()
}

fn default_max_videos() -> usize {
    5
}

/// A single topic written by the user instead of discovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomTopic {
    pub topic: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_topics_carry_the_custom_volume() {
        let trend = Trend::custom("Rust 2026", "what changed this year");
        assert!(trend.is_custom());
        assert_eq!(trend.breakdown, "what changed this year");
        assert!(!Trend::new("x", "200K+", "y").is_custom());
    }

    #[test]
    fn workflow_settings_fill_missing_fields() {
        let settings: WorkflowSettings =
            serde_json::from_str(r#"{"geo":"NO","maxVideos":2}"#).expect("parse settings");
        assert_eq!(settings.geo, "NO");
        assert_eq!(settings.max_videos, 2);
        assert_eq!(settings.hours, "24");
        assert_eq!(settings.sort, "relevance");
    }
}
