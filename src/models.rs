use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, VoyaError};

/// One independently fetched content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Weather,
    Hotels,
    Places,
    Cuisine,
    Adventures,
    History,
    Surprise,
    Itinerary,
    Translation,
}

impl Category {
    /// Categories loaded together when the destination view opens.
    pub const DESTINATION: [Category; 7] = [
        Category::Weather,
        Category::Hotels,
        Category::Places,
        Category::Cuisine,
        Category::Adventures,
        Category::History,
        Category::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Hotels => "hotels",
            Self::Places => "places",
            Self::Cuisine => "cuisine",
            Self::Adventures => "adventures",
            Self::History => "history",
            Self::Surprise => "surprise",
            Self::Itinerary => "itinerary",
            Self::Translation => "translation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preset budget bands offered next to the free-text budget field.
pub const BUDGET_PRESETS: [&str; 4] = ["Under ₹20k", "₹20k - ₹50k", "₹50k - ₹1L", "Above ₹1L"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DateMode {
    #[default]
    ExactDates,
    Duration,
}

impl DateMode {
    /// Heading for the date value in prompts and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExactDates => "Dates",
            Self::Duration => "Duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelerKind {
    Adults,
    Children,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travelers {
    pub adults: u32,
    pub children: u32,
}

impl Default for Travelers {
    fn default() -> Self {
        Self {
            adults: 2,
            children: 0,
        }
    }
}

impl Travelers {
    /// Step one counter up or down; adults never drop below 1, children below 0.
    pub fn adjust(&mut self, kind: TravelerKind, increment: bool) {
        let (count, floor) = match kind {
            TravelerKind::Adults => (&mut self.adults, 1),
            TravelerKind::Children => (&mut self.children, 0),
        };
        *count = if increment {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1).max(floor)
        };
    }

    pub fn total(&self) -> u32 {
        self.adults + self.children
    }

    /// "3 travelers", "1 traveler"
    pub fn summary(&self) -> String {
        let total = self.total();
        format!("{} traveler{}", total, if total == 1 { "" } else { "s" })
    }

    /// "2 adults" or "2 adults, 1 children" as embedded in prompts
    pub fn describe(&self) -> String {
        if self.children > 0 {
            format!("{} adults, {} children", self.adults, self.children)
        } else {
            format!("{} adults", self.adults)
        }
    }
}

/// User-supplied trip parameters. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TripQuery {
    #[serde(default)]
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub date_mode: DateMode,
    pub date_value: String,
    #[serde(default)]
    pub travelers: Travelers,
    pub budget: String,
}

impl TripQuery {
    /// Checked before a session is allowed to start.
    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(VoyaError::Validation("destination is required".to_string()));
        }
        if self.date_value.trim().is_empty() {
            return Err(VoyaError::Validation(match self.date_mode {
                DateMode::ExactDates => "travel dates are required".to_string(),
                DateMode::Duration => "trip duration is required".to_string(),
            }));
        }
        if self.budget.trim().is_empty() {
            return Err(VoyaError::Validation("budget is required".to_string()));
        }
        if self.travelers.adults < 1 {
            return Err(VoyaError::Validation(
                "at least one adult must travel".to_string(),
            ));
        }
        Ok(())
    }

    pub fn date_label(&self) -> &'static str {
        self.date_mode.label()
    }
}

/// Icon selector for a forecast entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    Sunny,
    #[default]
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
    Windy,
}

impl WeatherCondition {
    /// Loose match against whatever tag the model produced; unknown tags map to cloudy.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        if tag.contains("storm") || tag.contains("thunder") {
            Self::Stormy
        } else if tag.contains("rain") || tag.contains("shower") || tag.contains("drizzle") {
            Self::Rainy
        } else if tag.contains("snow") || tag.contains("sleet") {
            Self::Snowy
        } else if tag.contains("wind") {
            Self::Windy
        } else if tag.contains("sun") || tag.contains("clear") || tag.contains("hot") {
            Self::Sunny
        } else {
            Self::Cloudy
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Stormy => "stormy",
            Self::Snowy => "snowy",
            Self::Windy => "windy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    pub day: String,
    pub temp: String,
    pub condition: WeatherCondition,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub price: String,
    pub rating: f64,
    pub image: String,
    pub amenities: Vec<String>,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub category: String,
    pub address: String,
    pub rating: f64,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cuisine {
    pub name: String,
    pub rating: f64,
    pub image: String,
    pub tags: Vec<String>,
    pub description: String,
    pub restaurant: String,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adventure {
    pub name: String,
    pub difficulty: String,
    pub duration: String,
    pub image: String,
    pub description: String,
    pub price: String,
    pub best_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub content: String,
    pub period: String,
    pub significance: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurpriseRecord {
    pub title: String,
    pub place: String,
    pub description: String,
    pub tip: String,
    pub image: String,
    pub category: String,
    pub best_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FlightOption {
    pub airline: String,
    pub route: String,
    pub departure: String,
    pub arrival: String,
    pub duration: String,
    pub price: String,
    pub stops: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HotelRecommendation {
    pub name: String,
    pub rating: f64,
    pub location: String,
    pub price_range: String,
    pub amenities: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DayActivity {
    pub time: String,
    pub activity: String,
    pub location: String,
    pub duration: String,
    pub cost: String,
    pub tips: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyItinerary {
    pub day: u32,
    pub title: String,
    pub theme: String,
    pub activities: Vec<DayActivity>,
    pub meals: Vec<String>,
    pub transportation: String,
    pub budget: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FoodRecommendation {
    pub name: String,
    pub cuisine: String,
    pub location: String,
    pub price_range: String,
    pub must_try: Vec<String>,
    pub description: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: String,
    pub difficulty: String,
    pub price: String,
    pub description: String,
    pub best_time: String,
}

/// Complete generated plan. Money amounts are free-form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FullItinerary {
    pub flight_options: Vec<FlightOption>,
    pub hotel_recommendations: Vec<HotelRecommendation>,
    pub daily_itinerary: Vec<DailyItinerary>,
    pub food_recommendations: Vec<FoodRecommendation>,
    pub experiences: Vec<Experience>,
    pub weather_tips: String,
    pub local_insights: BTreeMap<String, String>,
    pub budget_breakdown: BTreeMap<String, String>,
    pub packing_list: Vec<String>,
    pub emergency_contacts: Vec<String>,
}

impl FullItinerary {
    /// Plain-text export of the whole plan.
    pub fn export_text(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated: String,
    pub pronunciation: String,
    pub source_language: String,
}

/// Fully-typed record set for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "records", rename_all = "snake_case")]
pub enum CategoryData {
    Weather(Vec<WeatherDay>),
    Hotels(Vec<Hotel>),
    Places(Vec<Place>),
    Cuisine(Vec<Cuisine>),
    Adventures(Vec<Adventure>),
    History(Vec<HistoryEntry>),
    Surprise(SurpriseRecord),
    Itinerary(FullItinerary),
    Translation(Translation),
}

impl CategoryData {
    pub fn category(&self) -> Category {
        match self {
            Self::Weather(_) => Category::Weather,
            Self::Hotels(_) => Category::Hotels,
            Self::Places(_) => Category::Places,
            Self::Cuisine(_) => Category::Cuisine,
            Self::Adventures(_) => Category::Adventures,
            Self::History(_) => Category::History,
            Self::Surprise(_) => Category::Surprise,
            Self::Itinerary(_) => Category::Itinerary,
            Self::Translation(_) => Category::Translation,
        }
    }

    /// Number of records; singleton categories count as one.
    pub fn len(&self) -> usize {
        match self {
            Self::Weather(v) => v.len(),
            Self::Hotels(v) => v.len(),
            Self::Places(v) => v.len(),
            Self::Cuisine(v) => v.len(),
            Self::Adventures(v) => v.len(),
            Self::History(v) => v.len(),
            Self::Surprise(_) | Self::Itinerary(_) | Self::Translation(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

// Gemini generateContent request format
#[derive(Debug, Serialize, Clone)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

// Gemini generateContent response format
#[derive(Debug, Deserialize, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        Some(text)
    }
}
