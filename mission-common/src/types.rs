use serde::{Deserialize, Serialize};

/// Outcome of a launch, as far as the upstream record lets us tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MissionSuccess {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failure")]
    Failure,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl MissionSuccess {
    /// Resolve the outcome. An explicit flag always wins; otherwise the
    /// human-readable status text is searched for "success" / "fail".
    pub fn resolve(explicit: Option<bool>, status_text: &str) -> Self {
        match explicit {
            Some(true) => MissionSuccess::Success,
            Some(false) => MissionSuccess::Failure,
            None => {
                let text = status_text.to_lowercase();
                if text.contains("success") {
                    MissionSuccess::Success
                } else if text.contains("fail") {
                    MissionSuccess::Failure
                } else {
                    MissionSuccess::Unknown
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MissionSuccess::Success => "success",
            MissionSuccess::Failure => "failure",
            MissionSuccess::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MissionSuccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display category of a launch status (drives badge styling in the UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Scheduled,
    InProgress,
    Completed,
    Failed,
    OnHold,
    Tbd,
    Planned,
    #[default]
    Other,
}

impl StatusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCategory::Scheduled => "scheduled",
            StatusCategory::InProgress => "in_progress",
            StatusCategory::Completed => "completed",
            StatusCategory::Failed => "failed",
            StatusCategory::OnHold => "on_hold",
            StatusCategory::Tbd => "tbd",
            StatusCategory::Planned => "planned",
            StatusCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flattened projection of an upstream launch record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedLaunch {
    pub id: Option<String>,
    pub name: String,
    pub status: String,
    pub status_category: StatusCategory,
    pub description: String,
    pub launch_date: Option<String>,
    pub agency: String,
    pub image: Option<String>,
    pub mission_type: String,
    pub location: String,
    pub success: MissionSuccess,
}

/// A single launch with the extra fields only the by-id endpoint carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchDetail {
    #[serde(flatten)]
    pub launch: NormalizedLaunch,
    pub rocket: String,
    pub details: String,
}

/// Astronomy picture of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apod {
    pub title: String,
    pub date: Option<String>,
    pub explanation: Option<String>,
    pub url: Option<String>,
    pub hd_url: Option<String>,
    pub media_type: String,
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSearchResult {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub thumbnail: Option<String>,
    pub media_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_pages: u64,
    pub current_page: u32,
}

/// One page of image library search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSearchPage {
    pub items: Vec<ImageSearchResult>,
    pub pagination: Pagination,
}

/// One Earth-imaging snapshot (EPIC natural colour).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthImage {
    pub id: Option<String>,
    pub caption: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub centroid_coordinates: Option<serde_json::Value>,
}
