//! Launch status text -> [`StatusCategory`].
//!
//! Two categorisations exist for the same status strings and they disagree
//! on inputs such as "Go For Launch". Both are kept as data and the caller
//! picks one through [`StatusPolicy`].

use serde::{Deserialize, Serialize};

use crate::types::StatusCategory;

/// Ordered needle table: the first entry with a needle contained in the
/// lowercased status wins.
const SUBSTRING_RULES: &[(&[&str], StatusCategory)] = &[
    (&["go", "scheduled"], StatusCategory::Scheduled),
    (&["progress", "flight"], StatusCategory::InProgress),
    (&["success", "completed"], StatusCategory::Completed),
    (&["fail"], StatusCategory::Failed),
    (&["hold"], StatusCategory::OnHold),
    (&["tbd"], StatusCategory::Tbd),
    (&["planned"], StatusCategory::Planned),
];

/// Whole-string table, compared against the lowercased status.
const EXACT_RULES: &[(&str, StatusCategory)] = &[
    ("scheduled", StatusCategory::Scheduled),
    ("in progress", StatusCategory::InProgress),
    ("completed", StatusCategory::Completed),
    ("planned", StatusCategory::Planned),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Keyword heuristic over the status text.
    #[default]
    Substring,
    /// Exact match on a small set of known statuses.
    Exact,
}

impl StatusPolicy {
    pub fn categorize(&self, status: &str) -> StatusCategory {
        let status = status.trim().to_lowercase();
        if status.is_empty() {
            return StatusCategory::Other;
        }

        match self {
            StatusPolicy::Substring => SUBSTRING_RULES
                .iter()
                .find(|(needles, _)| needles.iter().any(|needle| status.contains(needle)))
                .map(|(_, category)| *category)
                .unwrap_or(StatusCategory::Other),
            StatusPolicy::Exact => EXACT_RULES
                .iter()
                .find(|(name, _)| *name == status)
                .map(|(_, category)| *category)
                .unwrap_or(StatusCategory::Other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusPolicy::Substring => "substring",
            StatusPolicy::Exact => "exact",
        }
    }
}

impl std::fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "substring" => Ok(StatusPolicy::Substring),
            "exact" => Ok(StatusPolicy::Exact),
            _ => Err(format!("Unknown status policy: {}", s)),
        }
    }
}
