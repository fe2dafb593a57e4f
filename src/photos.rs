use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::PhotoConfig;
use crate::error::{Result, VoyaError};

#[cfg(test)]
use mockall::automock;

const PLACEHOLDER_PATH: &str = "/placeholder.svg";

/// Query in, image URL out. `Ok(None)` means zero results.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Option<String>>;
}

/// Fixed-path placeholder carrying the intended caption.
pub fn placeholder_image(caption: &str) -> String {
    format!(
        "{PLACEHOLDER_PATH}?height=200&width=300&query={}",
        urlencoding::encode(caption)
    )
}

/// Look up one image, degrading to a placeholder on any failure.
pub async fn resolve_image(photos: &dyn PhotoSearch, query: &str) -> String {
    match photos.search(query).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            info!(query, "No photo found - using placeholder");
            placeholder_image(query)
        }
        Err(e) => {
            warn!(query, error = %e, "Photo search failed - using placeholder");
            placeholder_image(query)
        }
    }
}

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
}

#[derive(Debug, Deserialize, Default)]
struct PexelsSrc {
    large: Option<String>,
    medium: Option<String>,
    original: Option<String>,
}

impl PexelsSrc {
    fn best(self) -> Option<String> {
        self.large.or(self.medium).or(self.original)
    }
}

pub struct PexelsClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    per_page: u32,
}

impl PexelsClient {
    pub fn new(client: Client, cfg: &PhotoConfig) -> Self {
        Self {
            client,
            api_key: cfg.credential().map(str::to_string),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            per_page: cfg.per_page.max(1),
        }
    }
}

#[async_trait]
impl PhotoSearch for PexelsClient {
    async fn search(&self, query: &str) -> Result<Option<String>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoyaError::MissingCredential("Pexels"))?;

        let per_page = self.per_page.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header("Authorization", api_key)
            .query(&[("query", query), ("per_page", per_page.as_str())])
            .send()
            .await
            .map_err(|e| VoyaError::Network(format!("Failed to reach photo search: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoyaError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: PexelsResponse = response.json().await?;
        Ok(parsed.photos.into_iter().next().and_then(|p| p.src.best()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_encodes_caption() {
        assert_eq!(
            placeholder_image("Sunset Beach Goa"),
            "/placeholder.svg?height=200&width=300&query=Sunset%20Beach%20Goa"
        );
    }

    #[test]
    fn test_pexels_src_prefers_large() {
        let src: PexelsSrc = serde_json::from_str(
            r#"{"medium": "https://m.jpg", "original": "https://o.jpg"}"#,
        )
        .unwrap();
        assert_eq!(src.best().as_deref(), Some("https://m.jpg"));

        let resp: PexelsResponse = serde_json::from_str(
            r#"{"photos": [{"src": {"large": "https://l.jpg", "medium": "https://m.jpg"}}]}"#,
        )
        .unwrap();
        let first = resp.photos.into_iter().next().unwrap();
        assert_eq!(first.src.best().as_deref(), Some("https://l.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_image_degrades_to_placeholder() {
        let mut photos = MockPhotoSearch::new();
        photos
            .expect_search()
            .returning(|_| Err(VoyaError::MissingCredential("Pexels")));
        assert_eq!(
            resolve_image(&photos, "Fort Aguada Goa").await,
            placeholder_image("Fort Aguada Goa")
        );

        let mut photos = MockPhotoSearch::new();
        photos.expect_search().returning(|_| Ok(None));
        assert_eq!(
            resolve_image(&photos, "Nowhere").await,
            placeholder_image("Nowhere")
        );

        let mut photos = MockPhotoSearch::new();
        photos
            .expect_search()
            .returning(|_| Ok(Some("https://images.example/fort.jpg".to_string())));
        assert_eq!(
            resolve_image(&photos, "Fort").await,
            "https://images.example/fort.jpg"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_credential_error() {
        let client = PexelsClient::new(Client::new(), &PhotoConfig {
            api_key: String::new(),
            base_url: "http://127.0.0.1:9".to_string(),
            per_page: 1,
        });
        assert!(matches!(
            client.search("x").await,
            Err(VoyaError::MissingCredential("Pexels"))
        ));
    }
}
