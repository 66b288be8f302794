//! The structured plan recovered from a model response.

use serde::{Deserialize, Serialize};

pub use muscleden_db::models::VideoLink;

/// A validated fitness plan: markdown text plus optional diet videos.
///
/// Only [`crate::plan::recovery::recover_plan`] builds these from model
/// output, so every value has a non-empty plan and well-formed links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub fitness_plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_links: Option<Vec<VideoLink>>,
}

impl PlanResponse {
    /// Links to persist; an absent list is stored as empty.
    pub fn links_or_empty(&self) -> Vec<VideoLink> {
        self.youtube_links.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_fields() {
        let plan = PlanResponse {
            fitness_plan: "# Plan".to_string(),
            youtube_links: Some(vec![VideoLink {
                title: "Meal Prep".to_string(),
                url: "https://youtube.com/watch?v=abc".to_string(),
            }]),
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["fitnessPlan"], "# Plan");
        assert_eq!(json["youtubeLinks"][0]["title"], "Meal Prep");
    }

    #[test]
    fn absent_links_are_omitted_and_persist_as_empty() {
        let plan = PlanResponse {
            fitness_plan: "# Plan".to_string(),
            youtube_links: None,
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json.get("youtubeLinks").is_none());
        assert!(plan.links_or_empty().is_empty());
    }
}
