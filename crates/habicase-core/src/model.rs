//! Case data model: one tenant's habitability dispute.
//!
//! The [`Case`] is the root aggregate and exclusively owns every nested
//! collection. Collections are ordered by creation; nothing is ever removed
//! from them except by replacing or resetting the whole case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Placeholder recorded as the promiser when none is given.
pub const DEFAULT_PROMISED_BY: &str = "Landlord";

/// Generate a fresh entity id (`<prefix>-<uuid v4>`).
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

// ── Enumerations ──

/// How bad an issue is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Emergency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Emergency => "emergency",
        }
    }
}

/// Where an issue stands. There is no transition path once an issue is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    #[default]
    Ongoing,
    Resolved,
    Partial,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 3] = [Self::Ongoing, Self::Resolved, Self::Partial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Resolved => "resolved",
            Self::Partial => "partial",
        }
    }
}

/// Channel a communication with the landlord went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactMethod {
    Text,
    #[default]
    Email,
    Phone,
    Portal,
    InPerson,
    Letter,
    Other,
}

impl ContactMethod {
    pub const ALL: [ContactMethod; 7] = [
        Self::Text,
        Self::Email,
        Self::Phone,
        Self::Portal,
        Self::InPerson,
        Self::Letter,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Portal => "portal",
            Self::InPerson => "in-person",
            Self::Letter => "letter",
            Self::Other => "other",
        }
    }
}

/// Whether a landlord promise was honoured. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromiseStatus {
    Kept,
    NotKept,
    Partial,
    #[default]
    Unknown,
}

impl PromiseStatus {
    pub const ALL: [PromiseStatus; 4] = [Self::Kept, Self::NotKept, Self::Partial, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::NotKept => "not_kept",
            Self::Partial => "partial",
            Self::Unknown => "unknown",
        }
    }
}

fn parse_variant<T: Copy>(
    kind: &'static str,
    all: &[T],
    as_str: fn(&T) -> &'static str,
    s: &str,
) -> Result<T, CoreError> {
    let needle = s.trim();
    all.iter()
        .copied()
        .find(|v| as_str(v).eq_ignore_ascii_case(needle))
        .ok_or_else(|| CoreError::UnknownVariant {
            kind,
            value: s.to_string(),
        })
}

impl FromStr for Severity {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("severity", &Self::ALL, Self::as_str, s)
    }
}

impl FromStr for IssueStatus {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("issue status", &Self::ALL, Self::as_str, s)
    }
}

impl FromStr for ContactMethod {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("contact method", &Self::ALL, Self::as_str, s)
    }
}

impl FromStr for PromiseStatus {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("promise status", &Self::ALL, Self::as_str, s)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PromiseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Metadata ──

/// Landlord contact details. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandlordContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub other: String,
}

/// Lease term. ISO 8601 date strings, or empty when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lease {
    pub start_date: String,
    pub end_date: String,
}

/// Property-level information. Exactly one per case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Empty until the case is first persisted.
    pub id: String,
    pub property_address: String,
    pub landlord_contact: LandlordContact,
    pub lease: Lease,
}

// ── Records ──

/// One reported defect or condition at the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub category: String,
    pub room: String,
    pub severity: Severity,
    pub status: IssueStatus,
    /// Date string, normally `YYYY-MM-DD`.
    pub first_noticed_at: String,
    pub description: String,
    /// Free-text tags. Display order is preserved.
    #[serde(default)]
    pub habitability_categories: Vec<String>,
}

/// A photo attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    pub issue_id: String,
    /// Opaque encoded image payload (data URI) or a URI.
    pub file_reference: String,
    pub captured_at: String,
    pub uploaded_at: String,
    #[serde(default)]
    pub ai_caption: String,
    #[serde(default)]
    pub user_caption: String,
}

impl EvidenceItem {
    /// Caption to show: the AI caption when present, else the user's.
    pub fn display_caption(&self) -> &str {
        if self.ai_caption.is_empty() {
            &self.user_caption
        } else {
            &self.ai_caption
        }
    }
}

/// A commitment the landlord made during a communication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandlordPromise {
    pub id: String,
    pub description: String,
    pub promised_completion_date: String,
    #[serde(default = "default_promised_by")]
    pub promised_by: String,
    #[serde(default)]
    pub status: PromiseStatus,
}

fn default_promised_by() -> String {
    DEFAULT_PROMISED_BY.to_string()
}

impl LandlordPromise {
    /// A promise with the placeholder promiser and `unknown` status.
    pub fn new(id: String, description: String, promised_completion_date: String) -> Self {
        Self {
            id,
            description,
            promised_completion_date,
            promised_by: default_promised_by(),
            status: PromiseStatus::Unknown,
        }
    }
}

/// One logged interaction with the landlord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    pub id: String,
    pub date: String,
    pub method: ContactMethod,
    pub tenant_message: String,
    /// Empty means no response was logged.
    #[serde(default)]
    pub landlord_response: String,
    /// Empty means a general communication not tied to any issue.
    #[serde(default)]
    pub linked_issue_ids: Vec<String>,
    #[serde(default)]
    pub promises: Vec<LandlordPromise>,
}

impl Communication {
    pub fn is_general(&self) -> bool {
        self.linked_issue_ids.is_empty()
    }

    pub fn has_response(&self) -> bool {
        !self.landlord_response.trim().is_empty()
    }
}

// ── Case ──

/// The complete record for one tenant's habitability dispute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Case {
    pub metadata: Metadata,
    pub issues: Vec<Issue>,
    pub evidence: Vec<EvidenceItem>,
    pub communications: Vec<Communication>,
}

impl Case {
    /// The fresh case: empty metadata and no records.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata == Metadata::default()
            && self.issues.is_empty()
            && self.evidence.is_empty()
            && self.communications.is_empty()
    }

    /// First issue with the given id.
    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    /// Evidence attached to an issue, in upload order.
    pub fn evidence_for<'a>(&'a self, issue_id: &'a str) -> impl Iterator<Item = &'a EvidenceItem> {
        self.evidence.iter().filter(move |e| e.issue_id == issue_id)
    }

    /// Communications that link to an issue, in logged order.
    pub fn communications_for<'a>(
        &'a self,
        issue_id: &'a str,
    ) -> impl Iterator<Item = &'a Communication> {
        self.communications
            .iter()
            .filter(move |c| c.linked_issue_ids.iter().any(|id| id == issue_id))
    }

    /// All promises across every communication, in logged order.
    pub fn promises(&self) -> impl Iterator<Item = (&Communication, &LandlordPromise)> {
        self.communications
            .iter()
            .flat_map(|c| c.promises.iter().map(move |p| (c, p)))
    }

    /// Serialize to the persisted snapshot format (plain nested JSON record).
    pub fn to_snapshot(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a persisted snapshot.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(snapshot)?)
    }
}
