use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

const PLACEHOLDER_PREFIX: &str = "PLACEHOLDER_";

/// Main configuration structure for VoyaGenie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub completion: CompletionConfig,
    pub photos: PhotoConfig,
    pub geocoding: GeocodingConfig,
    pub exchange: ExchangeConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub per_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on simultaneous photo-search calls within one category
    pub image_concurrency: usize,
    pub hotel_cap: usize,
    pub forecast_days: usize,
    /// Departure city used by the full itinerary when the query has no origin
    pub default_origin: String,
}

/// Treats empty and placeholder keys as "not configured".
fn credential(key: &str) -> Option<&str> {
    let key = key.trim();
    if key.is_empty() || key.starts_with(PLACEHOLDER_PREFIX) {
        None
    } else {
        Some(key)
    }
}

impl CompletionConfig {
    pub fn credential(&self) -> Option<&str> {
        credential(&self.api_key)
    }
}

impl PhotoConfig {
    pub fn credential(&self) -> Option<&str> {
        credential(&self.api_key)
    }
}

impl GeocodingConfig {
    pub fn credential(&self) -> Option<&str> {
        credential(&self.api_key)
    }
}

impl ExchangeConfig {
    pub fn credential(&self) -> Option<&str> {
        credential(&self.api_key)
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!(
                "No .env file found in any expected location - continuing with env vars only"
            );
        }

        let config_path =
            env::var("VOYAGENIE_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::from_yaml(&contents).unwrap_or_else(|e| {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }),
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        let config = serde_yaml::from_str::<Config>(contents)?;
        tracing::info!("Loaded configuration from YAML");
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Credentials
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.completion.api_key = key;
        }
        if let Some(key) = lookup("PEXELS_API_KEY") {
            self.photos.api_key = key;
        }
        if let Some(key) = lookup("GEOAPIFY_API_KEY") {
            self.geocoding.api_key = key;
        }
        if let Some(key) = lookup("EXCHANGE_RATE_API_KEY") {
            self.exchange.api_key = key;
        }

        if let Some(model) = lookup("GEMINI_MODEL") {
            self.completion.model = model;
        }

        // Pipeline overrides
        if let Some(value) = lookup("VOYAGENIE_IMAGE_CONCURRENCY") {
            if let Ok(n) = value.parse() {
                self.pipeline.image_concurrency = n;
            }
        }
        if let Some(origin) = lookup("VOYAGENIE_DEFAULT_ORIGIN") {
            self.pipeline.default_origin = origin;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.pipeline.image_concurrency == 0 {
            return Err("pipeline.image_concurrency cannot be 0".into());
        }
        if self.pipeline.hotel_cap == 0 {
            return Err("pipeline.hotel_cap cannot be 0".into());
        }
        if self.pipeline.forecast_days == 0 {
            return Err("pipeline.forecast_days cannot be 0".into());
        }

        // Missing keys degrade features rather than failing startup
        let missing: Vec<&str> = [
            ("GEMINI_API_KEY", self.completion.credential().is_none()),
            ("PEXELS_API_KEY", self.photos.credential().is_none()),
            ("GEOAPIFY_API_KEY", self.geocoding.credential().is_none()),
            ("EXCHANGE_RATE_API_KEY", self.exchange.credential().is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if !missing.is_empty() {
            return Err(format!("credentials not set: {}", missing.join(", ")).into());
        }

        Ok(())
    }

    /// Concurrency ceiling actually used by the photo fan-out (never 0).
    pub fn image_concurrency(&self) -> usize {
        self.pipeline.image_concurrency.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            completion: CompletionConfig {
                api_key: String::new(),
                model: "gemini-2.0-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            },
            photos: PhotoConfig {
                api_key: String::new(),
                base_url: "https://api.pexels.com/v1".to_string(),
                per_page: 1,
            },
            geocoding: GeocodingConfig {
                api_key: String::new(),
                base_url: "https://api.geoapify.com/v1".to_string(),
            },
            exchange: ExchangeConfig {
                api_key: String::new(),
                base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            },
            pipeline: PipelineConfig {
                image_concurrency: 4,
                hotel_cap: 12,
                forecast_days: 5,
                default_origin: "Mumbai".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_placeholder_and_empty_keys_are_not_credentials() {
        let mut cfg = Config::default();
        assert!(cfg.completion.credential().is_none());
        cfg.completion.api_key = "PLACEHOLDER_GEMINI_API_KEY".to_string();
        assert!(cfg.completion.credential().is_none());
        cfg.completion.api_key = "  real-key ".to_string();
        assert_eq!(cfg.completion.credential(), Some("real-key"));
    }

    #[test]
    fn test_overrides_apply_credentials_and_pipeline() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GEMINI_API_KEY", "g-key"),
            ("PEXELS_API_KEY", "p-key"),
            ("VOYAGENIE_IMAGE_CONCURRENCY", "8"),
            ("VOYAGENIE_DEFAULT_ORIGIN", "Delhi"),
            ("GEMINI_MODEL", "gemini-pro"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.completion.credential(), Some("g-key"));
        assert_eq!(cfg.photos.credential(), Some("p-key"));
        assert!(cfg.geocoding.credential().is_none());
        assert_eq!(cfg.pipeline.image_concurrency, 8);
        assert_eq!(cfg.pipeline.default_origin, "Delhi");
        assert_eq!(cfg.completion.model, "gemini-pro");
    }

    #[test]
    fn test_unparsable_concurrency_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|name| {
            (name == "VOYAGENIE_IMAGE_CONCURRENCY").then(|| "many".to_string())
        });
        assert_eq!(cfg.pipeline.image_concurrency, 4);
    }

    #[test]
    fn test_validate_reports_missing_credentials_without_failing_load() {
        let cfg = Config::default();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("GEMINI_API_KEY"));
        assert!(err.contains("EXCHANGE_RATE_API_KEY"));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
completion:
  api_key: abc
  model: gemini-2.0-flash
  base_url: http://localhost:9000
photos:
  base_url: http://localhost:9001
  per_page: 1
geocoding:
  base_url: http://localhost:9002
exchange:
  base_url: http://localhost:9003
pipeline:
  image_concurrency: 2
  hotel_cap: 12
  forecast_days: 5
  default_origin: Mumbai
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.completion.credential(), Some("abc"));
        assert!(cfg.photos.credential().is_none());
        assert_eq!(cfg.image_concurrency(), 2);
    }
}
