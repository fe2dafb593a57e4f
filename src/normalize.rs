use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::VoyaError;
use crate::fallback::fallback_value;
use crate::models::Category;

/// Why a category is showing its fallback set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Model output could not be parsed or did not match the category schema
    ParseError,
    /// The endpoint rejected the call or could not be reached
    NetworkError,
}

impl From<&VoyaError> for FallbackReason {
    fn from(err: &VoyaError) -> Self {
        match err {
            VoyaError::Parse(_) | VoyaError::Json(_) => Self::ParseError,
            _ => Self::NetworkError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    Live,
    Fallback { reason: FallbackReason },
}

impl Provenance {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: Value,
    pub provenance: Provenance,
}

impl Normalized {
    pub fn fallback(category: Category, reason: FallbackReason) -> Self {
        Self {
            value: fallback_value(category),
            provenance: Provenance::Fallback { reason },
        }
    }
}

/// Remove a surrounding ``` fence, with or without a language tag.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Language tag runs up to the first non-alphanumeric character
    let tag_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    let body = body.trim();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse raw model text for `category`. Never fails: unparsable text yields
/// the category's fallback set tagged with [`FallbackReason::ParseError`].
pub fn normalize(category: Category, raw: &str) -> Normalized {
    let payload = strip_code_fence(raw);
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Normalized {
            value,
            provenance: Provenance::Live,
        },
        Err(e) => {
            warn!(
                category = %category,
                error = %e,
                "Model output is not valid JSON - using fallback"
            );
            Normalized::fallback(category, FallbackReason::ParseError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_fence_variants() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
        assert_eq!(strip_code_fence("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```JSON [1]```"), "[1]");
        // Missing closing fence
        assert_eq!(strip_code_fence("```json\n[3]"), "[3]");
    }

    #[test]
    fn test_fenced_and_unfenced_parse_equal() {
        let body = r#"[{"day": "Mon", "temp": "30°C"}]"#;
        let expected: Value = serde_json::from_str(body).unwrap();
        let plain = normalize(Category::Weather, body);
        let fenced = normalize(Category::Weather, &format!("```json\n{body}\n```"));
        let bare_fence = normalize(Category::Weather, &format!("\n```\n{body}\n```  "));
        assert_eq!(plain.value, expected);
        assert_eq!(fenced.value, expected);
        assert_eq!(bare_fence.value, expected);
        assert_eq!(plain.provenance, Provenance::Live);
    }

    #[test]
    fn test_malformed_payload_yields_fallback() {
        for raw in ["", "not json", "```json\n[{\"name\": \n```", "{\"a\": 1,}"] {
            let out = normalize(Category::Hotels, raw);
            assert_eq!(out.value, fallback_value(Category::Hotels));
            assert_eq!(
                out.provenance,
                Provenance::Fallback {
                    reason: FallbackReason::ParseError
                }
            );
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["```json\n{\"title\": \"x\"}\n```", "garbage"] {
            assert_eq!(
                normalize(Category::Surprise, raw),
                normalize(Category::Surprise, raw)
            );
        }
    }

    #[test]
    fn test_fallback_reason_from_error() {
        assert_eq!(
            FallbackReason::from(&VoyaError::Parse("x".to_string())),
            FallbackReason::ParseError
        );
        assert_eq!(
            FallbackReason::from(&VoyaError::Upstream {
                status: 500,
                body: String::new()
            }),
            FallbackReason::NetworkError
        );
    }

    #[test]
    fn test_provenance_serializes_tagged() {
        let p = Provenance::Fallback {
            reason: FallbackReason::NetworkError,
        };
        assert_eq!(
            serde_json::to_value(p).unwrap(),
            json!({"source": "fallback", "reason": "network_error"})
        );
    }
}
