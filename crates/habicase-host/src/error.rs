use habicase_ai::AiError;
use habicase_core::CoreError;
use habicase_store::StoreError;
use thiserror::Error;

use crate::Intent;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} already in progress")]
    Busy(Intent),

    #[error("no issue with id {0}")]
    UnknownIssue(String),

    #[error("collaborator failed: {0}")]
    Collaborator(#[from] AiError),

    #[error("persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] CoreError),
}
