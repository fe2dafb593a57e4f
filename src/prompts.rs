//! Instruction strings for the completion endpoint, one per category.
//!
//! Context values are spliced in verbatim; nothing is escaped.

use crate::models::{Category, DateMode, Travelers, TripQuery};

const JSON_ONLY: &str =
    "Respond with ONLY the JSON above, filled in with real data. No markdown, no explanation.";

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

/// Everything a prompt may interpolate.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    pub destination: String,
    pub origin: String,
    pub travelers: Travelers,
    pub date_mode: DateMode,
    pub date_value: String,
    pub budget: String,
    pub translation: Option<TranslationRequest>,
}

impl PromptContext {
    /// An empty origin is replaced by `default_origin`.
    pub fn from_query(query: &TripQuery, default_origin: &str) -> Self {
        let origin = if query.origin.trim().is_empty() {
            default_origin.to_string()
        } else {
            query.origin.clone()
        };
        Self {
            destination: query.destination.clone(),
            origin,
            travelers: query.travelers,
            date_mode: query.date_mode,
            date_value: query.date_value.clone(),
            budget: query.budget.clone(),
            translation: None,
        }
    }

    pub fn with_translation(mut self, request: TranslationRequest) -> Self {
        self.translation = Some(request);
        self
    }

    fn trip_details(&self) -> String {
        format!(
            "- Destination: {}\n- Travelers: {}\n- {}: {}\n- Budget: {}",
            self.destination,
            self.travelers.describe(),
            self.date_mode.label(),
            self.date_value,
            self.budget
        )
    }
}

/// Build the instruction string for `category`.
pub fn build_prompt(category: Category, ctx: &PromptContext) -> String {
    let d = &ctx.destination;
    match category {
        Category::Weather => format!(
            r#"Give a 5-day weather forecast for {d} for these travel plans:
{details}

Return a JSON array of exactly 5 objects:
[
  {{"day": "Today", "temp": "28°C", "condition": "sunny", "desc": "Sunny and humid"}}
]
"condition" must be one of: sunny, cloudy, rainy, stormy, snowy, windy.
{JSON_ONLY}"#,
            details = ctx.trip_details()
        ),
        Category::Hotels => format!(
            r#"List up to 12 real hotels in {d} that suit this trip:
{details}

Return a JSON array:
[
  {{"id": "hotel_1", "name": "Hotel name", "price": "₹4,500/night", "rating": 4.5, "amenities": ["Pool", "WiFi"], "address": "Street, {d}", "phone": "+91 ..."}}
]
{JSON_ONLY}"#,
            details = ctx.trip_details()
        ),
        Category::Places => format!(
            r#"List the top places to visit in {d}.
{details}

Return a JSON array:
[
  {{"id": "place_1", "name": "Place name", "category": "Beach", "address": "Area, {d}", "rating": 4.7}}
]
{JSON_ONLY}"#,
            details = ctx.trip_details()
        ),
        Category::Cuisine => format!(
            r#"List must-try local dishes in {d} and where to eat them, within a budget of {budget}.

Return a JSON array:
[
  {{"name": "Dish name", "rating": 4.8, "tags": ["Spicy", "Local"], "description": "What it is", "restaurant": "Where to try it", "price": "₹300"}}
]
{JSON_ONLY}"#,
            budget = ctx.budget
        ),
        Category::Adventures => format!(
            r#"Suggest adventure activities in {d} for {travelers}.

Return a JSON array:
[
  {{"name": "Activity", "difficulty": "Moderate", "duration": "4 hours", "description": "What you do", "price": "₹2,000", "bestTime": "Early morning"}}
]
{JSON_ONLY}"#,
            travelers = ctx.travelers.describe()
        ),
        Category::History => format!(
            r#"Describe key moments and landmarks in the history of {d}.

Return a JSON array:
[
  {{"title": "Event or landmark", "content": "Two or three sentences", "period": "16th century", "significance": "Why it matters"}}
]
{JSON_ONLY}"#
        ),
        Category::Surprise => format!(
            r#"Reveal one hidden gem in {d} that most tourists miss.
{details}

Return a single JSON object:
{{"title": "Hidden Gem Discovered!", "place": "Spot name", "description": "Why it is special", "tip": "Insider tip", "category": "Viewpoint", "bestTime": "Sunset"}}
{JSON_ONLY}"#,
            details = ctx.trip_details()
        ),
        Category::Itinerary => format!(
            r#"Plan a comprehensive travel itinerary for:

TRIP DETAILS:
{details}
- Departure City: {origin}

Create a detailed JSON response with these exact sections:
{{
  "flightOptions": [{{"airline": "", "route": "{origin} - {d}", "departure": "", "arrival": "", "duration": "", "price": "", "stops": ""}}],
  "hotelRecommendations": [{{"name": "", "rating": 4.5, "location": "", "priceRange": "", "amenities": [], "description": ""}}],
  "dailyItinerary": [{{"day": 1, "title": "", "theme": "", "activities": [{{"time": "", "activity": "", "location": "", "duration": "", "cost": "", "tips": ""}}], "meals": [], "transportation": "", "budget": ""}}],
  "foodRecommendations": [{{"name": "", "cuisine": "", "location": "", "priceRange": "", "mustTry": [], "description": "", "rating": 4.5}}],
  "experiences": [{{"name": "", "type": "", "duration": "", "difficulty": "", "price": "", "description": "", "bestTime": ""}}],
  "weatherTips": "Weather advice for the travel period",
  "localInsights": {{"currency": "", "language": "", "transportation": "", "culture": "", "safety": "", "shopping": ""}},
  "budgetBreakdown": {{"flights": "", "accommodation": "", "food": "", "activities": "", "transportation": "", "miscellaneous": "", "total": ""}},
  "packingList": [],
  "emergencyContacts": []
}}

Make it detailed, practical, and specific to {d}. Include real places, restaurants, and activities.
{JSON_ONLY}"#,
            details = ctx.trip_details(),
            origin = ctx.origin
        ),
        Category::Translation => {
            let (text, from, to) = match &ctx.translation {
                Some(t) => (
                    t.text.as_str(),
                    t.source_language.as_str(),
                    t.target_language.as_str(),
                ),
                None => ("", "en", "en"),
            };
            format!(
                r#"Translate the following text from language code "{from}" to language code "{to}" for a traveler visiting {d}:
{text}

Return a JSON object:
{{"translated": "translated text", "pronunciation": "how to say it in Latin letters", "sourceLanguage": "{from}"}}
{JSON_ONLY}"#
            )
        }
    }
}
