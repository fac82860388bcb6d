use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
