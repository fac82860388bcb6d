//! Core types for Habicase: the case data model, the case store, and the timeline layout engine.

mod error;
pub mod intake;
pub mod model;
pub mod store;
pub mod timeline;

pub use error::CoreError;
pub use intake::IssueDraft;
pub use model::{
    Case, Communication, ContactMethod, EvidenceItem, Issue, IssueStatus, LandlordContact,
    LandlordPromise, Lease, Metadata, PromiseStatus, Severity,
};
pub use store::{CaseStore, ContactField, LeaseField, MetadataUpdate};
pub use timeline::{LayoutConfig, TimelineLayout};
