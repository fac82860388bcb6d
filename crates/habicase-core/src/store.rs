//! In-memory authoritative state for the active case.
//!
//! Every mutation takes `&mut self` and completes before returning, so no
//! caller can observe a partially applied update.

use tracing::info;

use crate::CoreError;
use crate::model::{Case, Communication, EvidenceItem, Issue, LandlordContact, Lease, Metadata};

/// A field of [`LandlordContact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Phone,
    Email,
    Other,
}

/// A field of [`Lease`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseField {
    StartDate,
    EndDate,
}

/// One field-level change to [`Metadata`].
///
/// Nested variants touch exactly one field of the sub-object, leaving its
/// siblings as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataUpdate {
    Id(String),
    PropertyAddress(String),
    Contact { field: ContactField, value: String },
    Lease { field: LeaseField, value: String },
}

impl MetadataUpdate {
    fn apply(self, metadata: &mut Metadata) {
        match self {
            Self::Id(v) => metadata.id = v,
            Self::PropertyAddress(v) => metadata.property_address = v,
            Self::Contact { field, value } => {
                *contact_slot(&mut metadata.landlord_contact, field) = value
            }
            Self::Lease { field, value } => *lease_slot(&mut metadata.lease, field) = value,
        }
    }
}

fn contact_slot(contact: &mut LandlordContact, field: ContactField) -> &mut String {
    match field {
        ContactField::Name => &mut contact.name,
        ContactField::Phone => &mut contact.phone,
        ContactField::Email => &mut contact.email,
        ContactField::Other => &mut contact.other,
    }
}

fn lease_slot(lease: &mut Lease, field: LeaseField) -> &mut String {
    match field {
        LeaseField::StartDate => &mut lease.start_date,
        LeaseField::EndDate => &mut lease.end_date,
    }
}

/// Holder of the single active [`Case`].
#[derive(Debug, Clone, Default)]
pub struct CaseStore {
    case: Case,
}

impl CaseStore {
    /// A store holding the empty case.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the given case.
    pub fn with_case(case: Case) -> Self {
        Self { case }
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    /// Owned copy of the current case, for handing to collaborators.
    pub fn snapshot(&self) -> Case {
        self.case.clone()
    }

    pub fn into_case(self) -> Case {
        self.case
    }

    /// Apply one metadata change. No validation; empty strings are accepted.
    pub fn update_metadata(&mut self, update: MetadataUpdate) {
        update.apply(&mut self.case.metadata);
    }

    /// Apply several metadata changes as a single mutation, in order.
    pub fn update_metadata_all(&mut self, updates: impl IntoIterator<Item = MetadataUpdate>) {
        let mut metadata = self.case.metadata.clone();
        for update in updates {
            update.apply(&mut metadata);
        }
        self.case.metadata = metadata;
    }

    /// Append an issue. Id uniqueness is the caller's responsibility.
    pub fn add_issue(&mut self, issue: Issue) {
        info!(issue_id = %issue.id, severity = %issue.severity, "issue added");
        self.case.issues.push(issue);
    }

    /// Append an evidence item. The referenced issue is not checked.
    pub fn add_evidence(&mut self, item: EvidenceItem) {
        info!(evidence_id = %item.id, issue_id = %item.issue_id, "evidence added");
        self.case.evidence.push(item);
    }

    pub fn add_communication(&mut self, comm: Communication) {
        info!(
            communication_id = %comm.id,
            method = %comm.method,
            linked = comm.linked_issue_ids.len(),
            promises = comm.promises.len(),
            "communication logged"
        );
        self.case.communications.push(comm);
    }

    /// Replace the whole case, e.g. when restoring a snapshot.
    pub fn load_case(&mut self, case: Case) {
        info!(
            issues = case.issues.len(),
            evidence = case.evidence.len(),
            communications = case.communications.len(),
            "case loaded"
        );
        self.case = case;
    }

    /// Replace the case with the empty case.
    pub fn reset(&mut self) {
        info!("case reset");
        self.case = Case::empty();
    }

    pub fn to_snapshot(&self) -> Result<String, CoreError> {
        self.case.to_snapshot()
    }

    pub fn from_snapshot(snapshot: &str) -> Result<Self, CoreError> {
        Ok(Self::with_case(Case::from_snapshot(snapshot)?))
    }
}
