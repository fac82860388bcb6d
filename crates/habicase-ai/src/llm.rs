//! Anthropic Messages API client backing both collaborators.

use std::time::Duration;

use async_trait::async_trait;
use habicase_core::Case;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::extract::extract_json;
use crate::prompts::{
    CLASSIFIER_SYSTEM_PROMPT, REPORT_SYSTEM_PROMPT, build_analysis_prompt, build_report_prompt,
};
use crate::types::{Analysis, AnalysisRequest, Report};
use crate::{AiError, Classifier, ReportGenerator};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const API_VERSION: &str = "2023-06-01";

/// Connection settings for [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub api_version: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: API_VERSION.to_string(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// HTTP client for the Anthropic Messages API.
///
/// Transient failures (429, 500, 503, 529) are retried once after a
/// one-second pause.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_tokens: u32,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, AiError> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::Config("API key is empty".into()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| AiError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| AiError::Config(format!("invalid API version header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            model: config.model,
            base_url: config.base_url,
            max_tokens: config.max_tokens,
            max_retries: 1,
        })
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user turn and return the concatenated text of the reply.
    async fn complete(&self, system: &str, content: Vec<ContentBlock>) -> Result<String, AiError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(attempt, "retrying request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let resp = self.client.post(&self.base_url).json(&request).send().await?;
            let status = resp.status();
            debug!(status = %status, attempt, "response received");

            if status.is_success() {
                let body: MessageResponse = resp.json().await?;
                let text: String = body
                    .content
                    .into_iter()
                    .filter_map(|block| match block {
                        ResponseBlock::Text { text } => Some(text),
                        ResponseBlock::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                return Ok(text);
            }

            let body = resp.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                attempt += 1;
                continue;
            }

            let body = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api) => format!("{}: {}", api.error.kind, api.error.message),
                Err(_) => body,
            };
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }
    }
}

fn is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

#[async_trait]
impl Classifier for LlmClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Analysis, AiError> {
        let mut content = Vec::new();
        if let Some(image) = &request.image {
            content.push(ContentBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: image.media_type.clone(),
                    data: image.data.clone(),
                },
            });
        }
        content.push(ContentBlock::Text {
            text: build_analysis_prompt(&request.description, request.image.as_ref()),
        });

        info!(model = %self.model, with_image = request.image.is_some(), "analyzing issue");
        let text = self.complete(CLASSIFIER_SYSTEM_PROMPT, content).await?;
        let analysis: Analysis = extract_json(&text)?;
        info!(
            has_issue = analysis.issue.is_some(),
            captions = analysis.evidence_items.len(),
            "analysis complete"
        );
        Ok(analysis)
    }
}

#[async_trait]
impl ReportGenerator for LlmClient {
    async fn generate(&self, case: &Case) -> Result<Report, AiError> {
        let prompt = build_report_prompt(case)?;
        info!(model = %self.model, issues = case.issues.len(), "generating report");
        let text = self
            .complete(REPORT_SYSTEM_PROMPT, vec![ContentBlock::Text { text: prompt }])
            .await?;
        let report: Report = extract_json(&text)?;
        if !report.is_usable() {
            return Err(AiError::EmptyResponse);
        }
        info!(chars = report.report_body.len(), "report generated");
        Ok(report)
    }
}
