use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[cfg(feature = "llm")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model returned no usable content")]
    EmptyResponse,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
