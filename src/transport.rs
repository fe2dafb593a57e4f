use async_trait::async_trait;
use reqwest::Client;

use crate::config::CompletionConfig;
use crate::error::{Result, VoyaError};
use crate::models::{GenerateRequest, GenerateResponse};

#[cfg(test)]
use mockall::automock;

/// Prompt in, free text out.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client. One attempt per call, no cache.
pub struct GeminiTransport {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(client: Client, cfg: &CompletionConfig) -> Self {
        Self {
            client,
            api_key: cfg.credential().map(str::to_string),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoyaError::MissingCredential("Gemini"))?;

        tracing::info!(model = %self.model, prompt_len = prompt.len(), "Calling completion endpoint");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| VoyaError::Network(format!("Failed to reach completion endpoint: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoyaError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            VoyaError::Parse(format!("Failed to parse completion response: {e}"))
        })?;

        let text = parsed.text().ok_or_else(|| {
            VoyaError::Parse("Completion endpoint returned no candidates".to_string())
        })?;
        tracing::debug!(raw = %text, "Completion text received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let cfg = CompletionConfig {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            // Unroutable on purpose; never contacted.
            base_url: "http://127.0.0.1:9".to_string(),
        };
        let transport = GeminiTransport::new(Client::new(), &cfg);
        let err = transport.complete("hello").await.unwrap_err();
        assert!(matches!(err, VoyaError::MissingCredential("Gemini")));
    }

    #[test]
    fn test_endpoint_path() {
        let cfg = CompletionConfig {
            api_key: "k".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/".to_string(),
        };
        let transport = GeminiTransport::new(Client::new(), &cfg);
        assert_eq!(
            transport.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
