use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::currency::{ConverterState, ExchangeRateClient, RateSource};
use crate::destinations::destination_defaults;
use crate::error::{Result, VoyaError};
use crate::fill::{FillContext, RecordFiller};
use crate::geocode::{GeoapifyGeocoder, Geocoder};
use crate::models::{Category, CategoryData, TripQuery};
use crate::normalize::{FallbackReason, Provenance, normalize};
use crate::photos::{PexelsClient, PhotoSearch};
use crate::prompts::{PromptContext, TranslationRequest, build_prompt};
use crate::state::ViewState;
use crate::transport::{CompletionTransport, GeminiTransport};

/// Result of one category fetch before it is written into the container.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Live data, or fallback data after a silent parse degrade
    Loaded {
        data: CategoryData,
        provenance: Provenance,
    },
    /// Upstream failure: user-visible message plus the fallback set
    Degraded {
        data: CategoryData,
        reason: FallbackReason,
        message: String,
    },
    /// Missing credential: message only, slot data left untouched
    Unconfigured { message: String },
}

fn failure_message(category: Category) -> String {
    match category {
        Category::Itinerary => "Unable to generate itinerary. Please try again.".to_string(),
        Category::Translation => "Unable to translate right now. Please try again.".to_string(),
        other => format!("Unable to load {other} for this destination. Showing suggestions instead."),
    }
}

fn configuration_message(err: &VoyaError) -> String {
    match err {
        VoyaError::MissingCredential(name) => format!(
            "{name} API key is missing. Please set it in your environment or .env file."
        ),
        other => other.to_string(),
    }
}

pub struct TripPlanner {
    transport: Arc<dyn CompletionTransport>,
    filler: RecordFiller,
    geocoder: Arc<dyn Geocoder>,
    rates: Arc<dyn RateSource>,
    default_origin: String,
}

impl TripPlanner {
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        photos: Arc<dyn PhotoSearch>,
        geocoder: Arc<dyn Geocoder>,
        rates: Arc<dyn RateSource>,
        cfg: &Config,
    ) -> Self {
        Self {
            transport,
            filler: RecordFiller::new(photos, cfg),
            geocoder,
            rates,
            default_origin: cfg.pipeline.default_origin.clone(),
        }
    }

    /// Wire the live HTTP clients from configuration.
    pub fn from_config(cfg: &Config) -> Self {
        let client = Client::new();
        Self::new(
            Arc::new(GeminiTransport::new(client.clone(), &cfg.completion)),
            Arc::new(PexelsClient::new(client.clone(), &cfg.photos)),
            Arc::new(GeoapifyGeocoder::new(client.clone(), &cfg.geocoding)),
            Arc::new(ExchangeRateClient::new(client, &cfg.exchange)),
            cfg,
        )
    }

    fn contexts(&self, query: &TripQuery) -> (PromptContext, FillContext) {
        let prompt = PromptContext::from_query(query, &self.default_origin);
        let fill = FillContext {
            destination: query.destination.clone(),
            language: "en".to_string(),
        };
        (prompt, fill)
    }

    /// Prompt -> completion -> normalize -> fill for one category. Never errors.
    pub async fn fetch(
        &self,
        category: Category,
        prompt_ctx: &PromptContext,
        fill_ctx: &FillContext,
    ) -> Outcome {
        let prompt = build_prompt(category, prompt_ctx);

        let raw = match self.transport.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) if e.is_configuration() => {
                warn!(category = %category, error = %e, "Completion endpoint not configured");
                return Outcome::Unconfigured {
                    message: configuration_message(&e),
                };
            }
            Err(e) => {
                warn!(category = %category, error = %e, "Completion call failed");
                let reason = FallbackReason::from(&e);
                return self.degraded(category, fill_ctx, reason, failure_message(category));
            }
        };

        let normalized = normalize(category, &raw);
        if let Provenance::Fallback { reason } = normalized.provenance {
            return self.silent_fallback(category, fill_ctx, reason);
        }

        match self.filler.fill(category, normalized.value, fill_ctx).await {
            Ok(data) => Outcome::Loaded {
                data,
                provenance: Provenance::Live,
            },
            Err(e) => {
                warn!(category = %category, error = %e, "Model output failed schema decode");
                self.silent_fallback(category, fill_ctx, FallbackReason::ParseError)
            }
        }
    }

    fn silent_fallback(
        &self,
        category: Category,
        fill_ctx: &FillContext,
        reason: FallbackReason,
    ) -> Outcome {
        match self.filler.fallback(category, fill_ctx) {
            Ok(data) => Outcome::Loaded {
                data,
                provenance: Provenance::Fallback { reason },
            },
            Err(e) => Outcome::Unconfigured {
                message: format!("Fallback content for {category} is invalid: {e}"),
            },
        }
    }

    fn degraded(
        &self,
        category: Category,
        fill_ctx: &FillContext,
        reason: FallbackReason,
        message: String,
    ) -> Outcome {
        match self.filler.fallback(category, fill_ctx) {
            Ok(data) => Outcome::Degraded {
                data,
                reason,
                message,
            },
            Err(e) => Outcome::Unconfigured {
                message: format!("{message} ({e})"),
            },
        }
    }

    async fn run(
        &self,
        state: &Mutex<ViewState>,
        category: Category,
        prompt_ctx: &PromptContext,
        fill_ctx: &FillContext,
    ) {
        let ticket = state.lock().await.begin(category);
        let outcome = self.fetch(category, prompt_ctx, fill_ctx).await;

        let mut state = state.lock().await;
        match outcome {
            Outcome::Loaded { data, provenance } => {
                state.resolve(ticket, data, provenance);
            }
            Outcome::Degraded {
                data,
                reason,
                message,
            } => {
                state.fail(ticket, message, Some((data, reason)));
            }
            Outcome::Unconfigured { message } => {
                state.fail(ticket, message, None);
            }
        }
    }

    /// Load (or refresh) a single category into the container.
    pub async fn load_category(
        &self,
        state: &Mutex<ViewState>,
        query: &TripQuery,
        category: Category,
    ) {
        let (prompt_ctx, fill_ctx) = self.contexts(query);
        self.run(state, category, &prompt_ctx, &fill_ctx).await;
    }

    /// Enter the destination view: every destination category plus the map
    /// location, all started together with no ordering between them.
    pub async fn load_destination(&self, state: &Mutex<ViewState>, query: &TripQuery) -> Result<()> {
        query.validate()?;
        info!(destination = %query.destination, "Loading destination view");

        let (prompt_ctx, fill_ctx) = self.contexts(query);
        let categories = Category::DESTINATION
            .into_iter()
            .map(|category| self.run(state, category, &prompt_ctx, &fill_ctx));

        tokio::join!(join_all(categories), self.locate(state, query));
        Ok(())
    }

    /// Explicit "generate itinerary" action.
    pub async fn generate_itinerary(&self, state: &Mutex<ViewState>, query: &TripQuery) -> Result<()> {
        query.validate()?;
        self.load_category(state, query, Category::Itinerary).await;
        Ok(())
    }

    /// Translate `text`; languages default to English -> the destination's language.
    pub async fn translate(
        &self,
        state: &Mutex<ViewState>,
        query: &TripQuery,
        text: &str,
        source_language: Option<&str>,
        target_language: Option<&str>,
    ) {
        let defaults = destination_defaults(&query.destination);
        let source = source_language.unwrap_or("en").to_string();
        let target = target_language.unwrap_or(defaults.language).to_string();

        let (prompt_ctx, mut fill_ctx) = self.contexts(query);
        fill_ctx.language = source.clone();
        let prompt_ctx = prompt_ctx.with_translation(TranslationRequest {
            text: text.to_string(),
            source_language: source,
            target_language: target,
        });
        self.run(state, Category::Translation, &prompt_ctx, &fill_ctx)
            .await;
    }

    /// Geocode the destination into the container; failures mean "no map".
    pub async fn locate(&self, state: &Mutex<ViewState>, query: &TripQuery) {
        let session_id = state.lock().await.session_id;
        let location = match self.geocoder.locate(&query.destination).await {
            Ok(point) => point,
            Err(e) => {
                warn!(destination = %query.destination, error = %e, "Geocoding failed - no map");
                None
            }
        };
        state.lock().await.set_location(session_id, location);
    }

    /// Fetch a rate table when the converter has none for its base currency.
    pub async fn refresh_rates(&self, converter: &mut ConverterState) -> Result<()> {
        if !converter.needs_table() {
            converter.recalculate();
            return Ok(());
        }
        let table = self.rates.latest(&converter.from).await?;
        converter.set_table(table);
        Ok(())
    }

    /// Converter preset for a destination: USD -> the local currency.
    pub fn converter_for(&self, query: &TripQuery) -> ConverterState {
        let defaults = destination_defaults(&query.destination);
        ConverterState::new("USD", defaults.currency)
    }
}
