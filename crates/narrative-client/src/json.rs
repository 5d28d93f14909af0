use serde::de::DeserializeOwned;

use crate::error::{NarrativeError, NarrativeResult};

/// Pull a JSON object out of model output: a fenced block, else first `{` to last `}`.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let mut inner = trimmed;
        if let Some(after_first) = inner.split_once('\n').map(|(_, rest)| rest) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_json<T: DeserializeOwned>(text: &str) -> NarrativeResult<T> {
    let json_str = extract_json(text).ok_or(NarrativeError::MissingJson)?;
    Ok(serde_json::from_str(&json_str)?)
}
