//! Saving and restoring the active case.

use habicase_core::Case;
use tracing::{info, warn};

use crate::{SnapshotStore, StoreError};

/// The single fixed slot the active case is saved under.
pub const SNAPSHOT_KEY: &str = "habitability-case";

/// Serialize `case` and save it under [`SNAPSHOT_KEY`].
pub fn save_case<S: SnapshotStore + ?Sized>(store: &S, case: &Case) -> Result<(), StoreError> {
    let blob = case.to_snapshot()?;
    store.save(SNAPSHOT_KEY, &blob)
}

/// Load the saved case, if any.
///
/// An unreadable or undecodable snapshot is treated as absent: the caller
/// starts from the empty case instead of failing.
pub fn load_case<S: SnapshotStore + ?Sized>(store: &S) -> Option<Case> {
    let blob = match store.load(SNAPSHOT_KEY) {
        Ok(Some(blob)) => blob,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "could not read saved case, starting empty");
            return None;
        }
    };
    match Case::from_snapshot(&blob) {
        Ok(case) => {
            info!(
                issues = case.issues.len(),
                evidence = case.evidence.len(),
                communications = case.communications.len(),
                "saved case restored"
            );
            Some(case)
        }
        Err(e) => {
            warn!(error = %e, "saved case is corrupt, starting empty");
            None
        }
    }
}
