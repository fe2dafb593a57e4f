use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::ExchangeConfig;
use crate::error::{Result, VoyaError};

#[cfg(test)]
use mockall::automock;

/// Rates relative to a single base; `rates[base] == 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateTable {
    pub base: String,
    pub rates: HashMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn new(base: &str, rates: HashMap<String, f64>) -> Self {
        let base = base.trim().to_uppercase();
        let mut rates: HashMap<String, f64> = rates
            .into_iter()
            .map(|(code, rate)| (code.trim().to_uppercase(), rate))
            .collect();
        rates.insert(base.clone(), 1.0);
        Self { base, rates }
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(&code.trim().to_uppercase())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Sorted currency codes, for pickers.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert `amount` between two codes via the table base, rounded to 2 places.
/// `None` when the table is absent, the amount is not a number, or a code is unknown.
pub fn convert(
    amount: &str,
    from: &str,
    to: &str,
    table: Option<&ExchangeRateTable>,
) -> Option<f64> {
    let table = table?;
    let amount: f64 = amount.trim().parse().ok().filter(|a: &f64| a.is_finite())?;
    let from = from.trim().to_uppercase();
    let to = to.trim().to_uppercase();

    let result = if from == to {
        amount
    } else if from == table.base {
        amount * table.rate(&to)?
    } else if to == table.base {
        amount / table.rate(&from)?
    } else {
        (amount / table.rate(&from)?) * table.rate(&to)?
    };
    Some(round2(result))
}

/// Converter panel state. A failed conversion leaves `output` unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConverterState {
    pub table: Option<ExchangeRateTable>,
    pub amount: String,
    pub from: String,
    pub to: String,
    pub output: String,
}

impl ConverterState {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            amount: "1".to_string(),
            from: from.to_uppercase(),
            to: to.to_uppercase(),
            ..Default::default()
        }
    }

    /// Whether the loaded table must be replaced after a base-currency change.
    pub fn needs_table(&self) -> bool {
        self.table
            .as_ref()
            .is_none_or(|t| !t.base.eq_ignore_ascii_case(&self.from))
    }

    pub fn set_table(&mut self, table: ExchangeRateTable) {
        self.table = Some(table);
        self.recalculate();
    }

    pub fn recalculate(&mut self) -> bool {
        match convert(&self.amount, &self.from, &self.to, self.table.as_ref()) {
            Some(value) => {
                self.output = format!("{value:.2}");
                true
            }
            None => false,
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }
}

/// Base currency in, rate table out.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn latest(&self, base: &str) -> Result<ExchangeRateTable>;
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default, alias = "conversion_rates")]
    rates: HashMap<String, f64>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
}

impl RateResponse {
    fn into_table(self, requested: &str) -> Result<ExchangeRateTable> {
        if self.result != "success" {
            return Err(VoyaError::Upstream {
                status: 200,
                body: self.error_type.unwrap_or(self.result),
            });
        }
        let base = self.base_code.unwrap_or_else(|| requested.to_string());
        Ok(ExchangeRateTable::new(&base, self.rates))
    }
}

pub struct ExchangeRateClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl ExchangeRateClient {
    pub fn new(client: Client, cfg: &ExchangeConfig) -> Self {
        Self {
            client,
            api_key: cfg.credential().map(str::to_string),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn latest(&self, base: &str) -> Result<ExchangeRateTable> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(VoyaError::MissingCredential("ExchangeRate"))?;
        let base = base.trim().to_uppercase();
        info!(base = %base, "Fetching exchange rates");

        let response = self
            .client
            .get(format!("{}/{}/latest/{}", self.base_url, api_key, base))
            .send()
            .await
            .map_err(|e| VoyaError::Network(format!("Failed to reach exchange rates: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoyaError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: RateResponse = response.json().await?;
        parsed.into_table(&base).inspect_err(|e| {
            warn!(base = %base, error = %e, "Exchange rate endpoint reported failure");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd_table() -> ExchangeRateTable {
        ExchangeRateTable::new(
            "USD",
            HashMap::from([
                ("USD".to_string(), 1.0),
                ("INR".to_string(), 83.0),
                ("EUR".to_string(), 0.92),
            ]),
        )
    }

    fn fmt(value: Option<f64>) -> Option<String> {
        value.map(|v| format!("{v:.2}"))
    }

    #[test]
    fn test_conversion_paths() {
        let table = usd_table();
        assert_eq!(fmt(convert("100", "USD", "INR", Some(&table))).as_deref(), Some("8300.00"));
        assert_eq!(fmt(convert("100", "INR", "USD", Some(&table))).as_deref(), Some("1.20"));
        assert_eq!(fmt(convert("100", "EUR", "INR", Some(&table))).as_deref(), Some("9021.74"));
        assert_eq!(fmt(convert("42.5", "inr", "inr", Some(&table))).as_deref(), Some("42.50"));
    }

    #[test]
    fn test_conversion_skips_bad_input() {
        let table = usd_table();
        assert!(convert("100", "USD", "INR", None).is_none());
        assert!(convert("abc", "USD", "INR", Some(&table)).is_none());
        assert!(convert("", "USD", "INR", Some(&table)).is_none());
        assert!(convert("100", "USD", "XYZ", Some(&table)).is_none());
        assert!(convert("NaN", "USD", "INR", Some(&table)).is_none());
    }

    #[test]
    fn test_state_keeps_previous_output_on_failure() {
        let mut state = ConverterState::new("USD", "INR");
        state.amount = "100".to_string();
        assert!(!state.recalculate());
        assert_eq!(state.output, "");

        state.set_table(usd_table());
        assert_eq!(state.output, "8300.00");

        state.amount = "lots".to_string();
        assert!(!state.recalculate());
        assert_eq!(state.output, "8300.00");
    }

    #[test]
    fn test_needs_table_after_base_change() {
        let mut state = ConverterState::new("USD", "INR");
        assert!(state.needs_table());
        state.set_table(usd_table());
        assert!(!state.needs_table());
        state.swap();
        assert_eq!(state.from, "INR");
        assert!(state.needs_table());
    }

    #[test]
    fn test_table_normalizes_codes_and_pins_base() {
        let table = ExchangeRateTable::new("eur", HashMap::from([("usd".to_string(), 1.09)]));
        assert_eq!(table.base, "EUR");
        assert_eq!(table.rate("EUR"), Some(1.0));
        assert_eq!(table.rate("Usd"), Some(1.09));
        assert_eq!(table.codes(), vec!["EUR", "USD"]);
    }

    #[test]
    fn test_rate_response_decoding() {
        let ok: RateResponse = serde_json::from_str(
            r#"{"result": "success", "base_code": "USD", "conversion_rates": {"USD": 1, "INR": 83.1}}"#,
        )
        .unwrap();
        let table = ok.into_table("USD").unwrap();
        assert_eq!(table.rate("INR"), Some(83.1));

        let failed: RateResponse =
            serde_json::from_str(r#"{"result": "error", "error-type": "invalid-key"}"#).unwrap();
        let err = failed.into_table("USD").unwrap_err();
        assert!(err.to_string().contains("invalid-key"));
    }

    #[tokio::test]
    async fn test_state_refreshes_from_rate_source() {
        let mut source = MockRateSource::new();
        source
            .expect_latest()
            .withf(|base| base == "USD")
            .times(1)
            .returning(|_| Ok(usd_table()));

        let mut state = ConverterState::new("USD", "EUR");
        state.amount = "50".to_string();
        if state.needs_table() {
            let table = source.latest(&state.from).await.unwrap();
            state.set_table(table);
        }
        assert_eq!(state.output, "46.00");
    }
}
