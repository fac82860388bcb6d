//! AI collaborators for habitability cases.
//!
//! The session layer talks to two narrow traits: a [`Classifier`] that turns
//! a tenant's description (and optional photo) into a best-effort
//! [`Analysis`], and a [`ReportGenerator`] that writes a narrative
//! [`Report`] for a whole case. The `llm` feature provides [`LlmClient`],
//! which implements both against the Anthropic Messages API.

mod error;
pub mod extract;
pub mod prompts;
pub mod types;

#[cfg(feature = "llm")]
mod llm;

use async_trait::async_trait;
use habicase_core::Case;

pub use error::AiError;
pub use types::{Analysis, AnalysisRequest, EvidenceDraft, ImageInput, Report};

#[cfg(feature = "llm")]
pub use llm::{LlmClient, LlmConfig};

/// Suggests issue attributes and evidence captions from free text.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AiError>;
}

/// Writes a narrative report for a case.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, case: &Case) -> Result<Report, AiError>;
}
