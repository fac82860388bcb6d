//! Case session host: owns the active case and coordinates the store,
//! snapshot persistence, and the AI collaborators.

mod error;
mod session;

pub use error::SessionError;
pub use session::{CaseSession, Intent, IssueIntake};
