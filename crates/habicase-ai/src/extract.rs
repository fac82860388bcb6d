//! Pulling a JSON object out of free-form model text.
//!
//! Models are told to answer with raw JSON but sometimes wrap it in a
//! markdown fence or add a sentence around it.

use serde::de::DeserializeOwned;

use crate::AiError;

pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let text = strip_fence(text.trim());
    if text.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    match serde_json::from_str(text) {
        Ok(v) => Ok(v),
        Err(first) => {
            let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
                return Err(first.into());
            };
            if end <= start {
                return Err(first.into());
            }
            serde_json::from_str(&text[start..=end]).map_err(|_| first.into())
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
