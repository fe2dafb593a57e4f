use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::config::GeocodingConfig;
use crate::error::{Result, VoyaError};
use crate::models::GeoPoint;

#[cfg(test)]
use mockall::automock;

/// Place name in, first candidate coordinate out.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, place: &str) -> Result<Option<GeoPoint>>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    lat: Option<f64>,
    lon: Option<f64>,
}

impl GeocodeResponse {
    /// No disambiguation: the first candidate with coordinates wins.
    fn first_point(self) -> Option<GeoPoint> {
        self.features.into_iter().find_map(|f| match f.properties {
            FeatureProperties {
                lat: Some(lat),
                lon: Some(lon),
            } => Some(GeoPoint { lat, lon }),
            _ => None,
        })
    }
}

pub struct GeoapifyGeocoder {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeoapifyGeocoder {
    pub fn new(client: Client, cfg: &GeocodingConfig) -> Self {
        Self {
            client,
            api_key: cfg.credential().map(str::to_string),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for GeoapifyGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<GeoPoint>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoyaError::MissingCredential("Geoapify"))?;
        info!(place, "Geocoding destination");

        let response = self
            .client
            .get(format!("{}/geocode/search", self.base_url))
            .query(&[("text", place), ("limit", "1"), ("apiKey", api_key)])
            .send()
            .await
            .map_err(|e| VoyaError::Network(format!("Failed to reach geocoder: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoyaError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: GeocodeResponse = response.json().await?;
        Ok(parsed.first_point())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_candidate_wins() {
        let resp: GeocodeResponse = serde_json::from_str(
            r#"{"features": [
                {"properties": {"name": "no coords"}},
                {"properties": {"lat": 15.49, "lon": 73.82}},
                {"properties": {"lat": 1.0, "lon": 2.0}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.first_point(), Some(GeoPoint { lat: 15.49, lon: 73.82 }));
    }

    #[test]
    fn test_no_candidates() {
        let resp: GeocodeResponse = serde_json::from_str(r#"{"features": []}"#).unwrap();
        assert!(resp.first_point().is_none());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let geocoder = GeoapifyGeocoder::new(
            Client::new(),
            &GeocodingConfig {
                api_key: "PLACEHOLDER_GEOAPIFY_API_KEY".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
            },
        );
        assert!(matches!(
            geocoder.locate("Goa").await,
            Err(VoyaError::MissingCredential("Geoapify"))
        ));
    }
}
