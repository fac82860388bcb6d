//! Turning a best-effort guess at issue attributes into a complete [`Issue`].
//!
//! Classifier output is partial: any field may be missing, blank, or (for
//! the enumerations) spelled in a way we don't recognise. Every gap falls
//! back to a fixed default.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Issue;

pub const DEFAULT_TITLE: &str = "New Issue";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_ROOM: &str = "Unknown";

/// Partial issue fields as suggested by a classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueDraft {
    pub title: Option<String>,
    pub category: Option<String>,
    pub room: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub first_noticed_at: Option<String>,
    pub description: Option<String>,
    pub habitability_categories: Option<Vec<String>>,
}

impl IssueDraft {
    /// Fill every missing field and produce the issue to append.
    ///
    /// `original_description` is the user's own text; it is used when the
    /// draft has no description. `today` is the `YYYY-MM-DD` fallback for
    /// `first_noticed_at`.
    pub fn resolve(self, id: String, original_description: &str, today: &str) -> Issue {
        Issue {
            id,
            title: non_blank(self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            category: non_blank(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            room: non_blank(self.room).unwrap_or_else(|| DEFAULT_ROOM.to_string()),
            severity: lenient(self.severity.as_deref(), "severity"),
            status: lenient(self.status.as_deref(), "status"),
            first_noticed_at: non_blank(self.first_noticed_at)
                .unwrap_or_else(|| today.to_string()),
            description: non_blank(self.description)
                .unwrap_or_else(|| original_description.to_string()),
            habitability_categories: self
                .habitability_categories
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lenient<T>(value: Option<&str>, what: &str) -> T
where
    T: std::str::FromStr + Default,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => T::default(),
        Some(v) => v.parse().unwrap_or_else(|_| {
            debug!(value = v, field = what, "unrecognised value, using default");
            T::default()
        }),
    }
}
