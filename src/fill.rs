//! Schema decode and defaulting of normalized model output.
//!
//! Each category has a lenient raw schema: every field optional, scalars
//! accepted as strings or numbers, lists as arrays or comma-separated text.
//! Missing fields are defaulted independently and image-bearing records get
//! one photo lookup each, bounded by `image_concurrency`.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Deserializer, de::DeserializeOwned, de::IgnoredAny};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, VoyaError};
use crate::models::{
    Adventure, Category, CategoryData, Cuisine, DailyItinerary, DayActivity, Experience,
    FlightOption, FoodRecommendation, FullItinerary, HistoryEntry, Hotel, HotelRecommendation,
    Place, SurpriseRecord, Translation, WeatherCondition, WeatherDay,
};
use crate::fallback::fallback_value;
use crate::photos::{PhotoSearch, placeholder_image, resolve_image};

const DEFAULT_HOTEL_RATING: f64 = 4.0;
const DEFAULT_RATING: f64 = 4.5;

/// Accepts a string, number or bool; anything else reads as absent.
fn flexible_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleString {
        String(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        Other(IgnoredAny),
    }

    Ok(match FlexibleString::deserialize(deserializer)? {
        FlexibleString::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        FlexibleString::Int(i) => Some(i.to_string()),
        FlexibleString::Float(f) => Some(f.to_string()),
        FlexibleString::Bool(b) => Some(b.to_string()),
        FlexibleString::Other(_) => None,
    })
}

/// Accepts a number or numeric string; non-finite or unparsable reads as absent.
fn flexible_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFloat {
        Float(f64),
        String(String),
        Other(IgnoredAny),
    }

    let value = match FlexibleFloat::deserialize(deserializer)? {
        FlexibleFloat::Float(f) => Some(f),
        FlexibleFloat::String(s) => s.trim().parse::<f64>().ok(),
        FlexibleFloat::Other(_) => None,
    };
    Ok(value.filter(|f| f.is_finite()))
}

/// Accepts an array of scalars or a single comma-separated string.
fn flexible_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleList {
        List(Vec<Value>),
        Joined(String),
        Other(IgnoredAny),
    }

    Ok(match FlexibleList::deserialize(deserializer)? {
        FlexibleList::List(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        FlexibleList::Joined(s) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        FlexibleList::Other(_) => Vec::new(),
    })
}

/// Nested record lists: anything but an array reads as empty.
fn flexible_values<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleValues {
        List(Vec<Value>),
        Other(IgnoredAny),
    }

    Ok(match FlexibleValues::deserialize(deserializer)? {
        FlexibleValues::List(items) => items,
        FlexibleValues::Other(_) => Vec::new(),
    })
}

/// String-valued map. Scalars are stringified, scalar arrays joined, and
/// null or nested values dropped.
fn flexible_map<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleMap {
        Map(serde_json::Map<String, Value>),
        Other(IgnoredAny),
    }

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    let FlexibleMap::Map(map) = FlexibleMap::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match &value {
                Value::Array(items) => {
                    let parts: Vec<String> = items.iter().filter_map(scalar).collect();
                    Some(parts.join(", ")).filter(|s| !s.is_empty())
                }
                other => scalar(other),
            };
            text.map(|text| (key, text))
        })
        .collect())
}

/// Day number from `3`, `3.0` or `"Day 3"`; otherwise absent.
fn flexible_day<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleDay {
        Int(u64),
        Float(f64),
        String(String),
        Other(IgnoredAny),
    }

    Ok(match FlexibleDay::deserialize(deserializer)? {
        FlexibleDay::Int(n) => u32::try_from(n).ok(),
        FlexibleDay::Float(f) if f.is_finite() && f >= 0.0 && f <= u32::MAX as f64 => {
            Some(f as u32)
        }
        FlexibleDay::String(s) => s
            .split(|c: char| !c.is_ascii_digit())
            .find(|digits| !digits.is_empty())
            .and_then(|digits| digits.parse().ok()),
        FlexibleDay::Float(_) | FlexibleDay::Other(_) => None,
    })
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawWeather {
    #[serde(deserialize_with = "flexible_string", alias = "label", alias = "date")]
    day: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "temperature")]
    temp: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "icon", alias = "tag")]
    condition: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "desc")]
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawHotel {
    #[serde(deserialize_with = "flexible_string")]
    id: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "priceRange")]
    price: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    rating: Option<f64>,
    #[serde(deserialize_with = "flexible_list")]
    amenities: Vec<String>,
    #[serde(deserialize_with = "flexible_string", alias = "location")]
    address: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    phone: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawPlace {
    #[serde(deserialize_with = "flexible_string")]
    id: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "type")]
    category: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "location")]
    address: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    rating: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawCuisine {
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    rating: Option<f64>,
    #[serde(deserialize_with = "flexible_list")]
    tags: Vec<String>,
    #[serde(deserialize_with = "flexible_string")]
    description: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    restaurant: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    price: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawAdventure {
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    difficulty: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    duration: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    description: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    price: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "bestTime")]
    best_time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawHistory {
    #[serde(deserialize_with = "flexible_string")]
    title: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "description")]
    content: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "era")]
    period: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    significance: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawSurprise {
    #[serde(deserialize_with = "flexible_string")]
    title: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    place: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    description: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    tip: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    category: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "bestTime")]
    best_time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawTranslation {
    #[serde(
        deserialize_with = "flexible_string",
        alias = "translation",
        alias = "translatedText"
    )]
    translated: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    pronunciation: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "sourceLanguage")]
    source_language: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawFlight {
    #[serde(deserialize_with = "flexible_string")]
    airline: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    route: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    departure: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    arrival: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    duration: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    price: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    stops: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawHotelRecommendation {
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    rating: Option<f64>,
    #[serde(deserialize_with = "flexible_string", alias = "address")]
    location: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "price")]
    price_range: Option<String>,
    #[serde(deserialize_with = "flexible_list")]
    amenities: Vec<String>,
    #[serde(deserialize_with = "flexible_string")]
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawActivity {
    #[serde(deserialize_with = "flexible_string")]
    time: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "name")]
    activity: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    location: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    duration: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "price")]
    cost: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "tip")]
    tips: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawDay {
    #[serde(deserialize_with = "flexible_day")]
    day: Option<u32>,
    #[serde(deserialize_with = "flexible_string")]
    title: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    theme: Option<String>,
    #[serde(deserialize_with = "flexible_values")]
    activities: Vec<Value>,
    #[serde(deserialize_with = "flexible_list")]
    meals: Vec<String>,
    #[serde(deserialize_with = "flexible_string")]
    transportation: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    budget: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawFood {
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    cuisine: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    location: Option<String>,
    #[serde(deserialize_with = "flexible_string", alias = "price")]
    price_range: Option<String>,
    #[serde(deserialize_with = "flexible_list")]
    must_try: Vec<String>,
    #[serde(deserialize_with = "flexible_string")]
    description: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    rating: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawExperience {
    #[serde(deserialize_with = "flexible_string")]
    name: Option<String>,
    #[serde(deserialize_with = "flexible_string", rename = "type")]
    kind: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    duration: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    difficulty: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    price: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    description: Option<String>,
    #[serde(deserialize_with = "flexible_string")]
    best_time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawItinerary {
    #[serde(deserialize_with = "flexible_values")]
    flight_options: Vec<Value>,
    #[serde(deserialize_with = "flexible_values", alias = "hotels")]
    hotel_recommendations: Vec<Value>,
    #[serde(deserialize_with = "flexible_values")]
    daily_itinerary: Vec<Value>,
    #[serde(deserialize_with = "flexible_values")]
    food_recommendations: Vec<Value>,
    #[serde(deserialize_with = "flexible_values")]
    experiences: Vec<Value>,
    #[serde(deserialize_with = "flexible_string")]
    weather_tips: Option<String>,
    #[serde(deserialize_with = "flexible_map")]
    local_insights: BTreeMap<String, String>,
    #[serde(deserialize_with = "flexible_map")]
    budget_breakdown: BTreeMap<String, String>,
    #[serde(deserialize_with = "flexible_list")]
    packing_list: Vec<String>,
    #[serde(deserialize_with = "flexible_list")]
    emergency_contacts: Vec<String>,
}

/// Per-call values the defaults depend on.
#[derive(Debug, Clone)]
pub struct FillContext {
    pub destination: String,
    /// Language assumed for translation input when the model omits it
    pub language: String,
}

/// Array categories may arrive wrapped, e.g. `{"hotels": [...]}`.
fn record_items(category: Category, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if let Some(items) = map.remove(category.as_str()).and_then(|v| match v {
                Value::Array(items) => Some(items),
                _ => None,
            }) {
                return Ok(items);
            }
            map.into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| {
                    VoyaError::Parse(format!("expected a list of {category} records"))
                })
        }
        other => Err(VoyaError::Parse(format!(
            "expected a list of {category} records, got {}",
            type_name(&other)
        ))),
    }
}

/// Singleton categories may arrive as a one-element array.
fn record_object(category: Category, value: Value) -> Result<Value> {
    match value {
        Value::Object(_) => Ok(value),
        Value::Array(items) => items
            .into_iter()
            .find(Value::is_object)
            .ok_or_else(|| VoyaError::Parse(format!("expected a {category} object"))),
        other => Err(VoyaError::Parse(format!(
            "expected a {category} object, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode each item independently; items that are not objects are dropped.
fn decode_items<T: DeserializeOwned>(category: Category, items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(category = %category, index, error = %e, "Dropping undecodable record");
                None
            }
        })
        .collect()
}

fn non_empty<T>(category: Category, records: Vec<T>) -> Result<Vec<T>> {
    if records.is_empty() {
        Err(VoyaError::Parse(format!("no usable {category} records")))
    } else {
        Ok(records)
    }
}

fn clamp_rating(rating: Option<f64>, default: f64) -> f64 {
    rating.map(|r| r.clamp(0.0, 5.0)).unwrap_or(default)
}

fn slug(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Make ids unique within one result set by suffixing repeats with their index.
fn dedupe_ids<'a, I>(ids: I)
where
    I: Iterator<Item = (usize, &'a mut String)>,
{
    let mut seen = HashSet::new();
    for (index, id) in ids {
        if !seen.insert(id.clone()) {
            *id = format!("{id}_{index}");
            seen.insert(id.clone());
        }
    }
}

fn filler_day(number: usize) -> WeatherDay {
    WeatherDay {
        day: format!("Day {number}"),
        temp: "--".to_string(),
        condition: WeatherCondition::default(),
        description: "Forecast unavailable".to_string(),
    }
}

/// Exactly `days` entries: extra input is dropped, short input is padded.
pub fn fill_weather(value: Value, days: usize) -> Result<Vec<WeatherDay>> {
    let items = record_items(Category::Weather, value)?;
    let mut forecast: Vec<WeatherDay> = decode_items::<RawWeather>(Category::Weather, items)
        .into_iter()
        .take(days)
        .enumerate()
        .map(|(index, raw)| {
            let tag = raw
                .condition
                .as_deref()
                .or(raw.description.as_deref())
                .unwrap_or_default();
            WeatherDay {
                day: raw.day.unwrap_or_else(|| format!("Day {}", index + 1)),
                temp: raw.temp.unwrap_or_else(|| "--".to_string()),
                condition: WeatherCondition::from_tag(tag),
                description: raw
                    .description
                    .unwrap_or_else(|| "Forecast unavailable".to_string()),
            }
        })
        .collect();

    while forecast.len() < days {
        forecast.push(filler_day(forecast.len() + 1));
    }
    Ok(forecast)
}

/// Capped at `cap` records, input order preserved. Images left empty.
pub fn fill_hotels(value: Value, ctx: &FillContext, cap: usize) -> Result<Vec<Hotel>> {
    let items = record_items(Category::Hotels, value)?;
    let mut hotels: Vec<Hotel> = decode_items::<RawHotel>(Category::Hotels, items)
        .into_iter()
        .take(cap)
        .enumerate()
        .map(|(index, raw)| Hotel {
            id: raw.id.unwrap_or_else(|| format!("hotel_{index}")),
            name: raw.name.unwrap_or_else(|| format!("Hotel {}", index + 1)),
            price: raw.price.unwrap_or_else(|| "Price on request".to_string()),
            rating: clamp_rating(raw.rating, DEFAULT_HOTEL_RATING),
            image: String::new(),
            amenities: raw.amenities,
            address: raw.address.unwrap_or_else(|| ctx.destination.clone()),
            phone: raw.phone.unwrap_or_else(|| "Not available".to_string()),
        })
        .collect();
    dedupe_ids(hotels.iter_mut().map(|h| &mut h.id).enumerate());
    non_empty(Category::Hotels, hotels)
}

pub fn fill_places(value: Value, ctx: &FillContext) -> Result<Vec<Place>> {
    let items = record_items(Category::Places, value)?;
    let mut places: Vec<Place> = decode_items::<RawPlace>(Category::Places, items)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let name = raw.name.unwrap_or_else(|| format!("Place {}", index + 1));
            Place {
                id: raw
                    .id
                    .unwrap_or_else(|| format!("{}-{}", slug(&name), slug(&ctx.destination))),
                name,
                category: raw.category.unwrap_or_else(|| "Attraction".to_string()),
                address: raw.address.unwrap_or_else(|| ctx.destination.clone()),
                rating: clamp_rating(raw.rating, DEFAULT_RATING),
                image: String::new(),
            }
        })
        .collect();
    dedupe_ids(places.iter_mut().map(|p| &mut p.id).enumerate());
    non_empty(Category::Places, places)
}

pub fn fill_cuisine(value: Value) -> Result<Vec<Cuisine>> {
    let items = record_items(Category::Cuisine, value)?;
    let dishes = decode_items::<RawCuisine>(Category::Cuisine, items)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Cuisine {
            name: raw.name.unwrap_or_else(|| format!("Local Dish {}", index + 1)),
            rating: clamp_rating(raw.rating, DEFAULT_RATING),
            image: String::new(),
            tags: raw.tags,
            description: raw.description.unwrap_or_default(),
            restaurant: raw
                .restaurant
                .unwrap_or_else(|| "Local restaurants".to_string()),
            price: raw.price.unwrap_or_else(|| "Varies".to_string()),
        })
        .collect();
    non_empty(Category::Cuisine, dishes)
}

pub fn fill_adventures(value: Value) -> Result<Vec<Adventure>> {
    let items = record_items(Category::Adventures, value)?;
    let adventures = decode_items::<RawAdventure>(Category::Adventures, items)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| Adventure {
            name: raw.name.unwrap_or_else(|| format!("Adventure {}", index + 1)),
            difficulty: raw.difficulty.unwrap_or_else(|| "Moderate".to_string()),
            duration: raw.duration.unwrap_or_else(|| "Half day".to_string()),
            image: String::new(),
            description: raw.description.unwrap_or_default(),
            price: raw.price.unwrap_or_else(|| "Varies".to_string()),
            best_time: raw.best_time.unwrap_or_else(|| "Anytime".to_string()),
        })
        .collect();
    non_empty(Category::Adventures, adventures)
}

pub fn fill_history(value: Value) -> Result<Vec<HistoryEntry>> {
    let items = record_items(Category::History, value)?;
    let entries = decode_items::<RawHistory>(Category::History, items)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| HistoryEntry {
            title: raw.title.unwrap_or_else(|| format!("Chapter {}", index + 1)),
            content: raw.content.unwrap_or_default(),
            period: raw.period.unwrap_or_else(|| "Unknown".to_string()),
            significance: raw.significance.unwrap_or_default(),
            image: String::new(),
        })
        .collect();
    non_empty(Category::History, entries)
}

pub fn fill_surprise(value: Value, ctx: &FillContext) -> Result<SurpriseRecord> {
    let object = record_object(Category::Surprise, value)?;
    let raw: RawSurprise = serde_json::from_value(object)
        .map_err(|e| VoyaError::Parse(format!("surprise record: {e}")))?;
    Ok(SurpriseRecord {
        title: raw
            .title
            .unwrap_or_else(|| "Hidden Gem Discovered!".to_string()),
        place: raw.place.unwrap_or_else(|| ctx.destination.clone()),
        description: raw.description.unwrap_or_default(),
        tip: raw.tip.unwrap_or_default(),
        image: String::new(),
        category: raw.category.unwrap_or_else(|| "Hidden Gem".to_string()),
        best_time: raw.best_time.unwrap_or_else(|| "Anytime".to_string()),
    })
}

fn fill_day(index: usize, raw: RawDay) -> DailyItinerary {
    let activities = decode_items::<RawActivity>(Category::Itinerary, raw.activities)
        .into_iter()
        .map(|a| DayActivity {
            time: a.time.unwrap_or_default(),
            activity: a.activity.unwrap_or_default(),
            location: a.location.unwrap_or_default(),
            duration: a.duration.unwrap_or_default(),
            cost: a.cost.unwrap_or_default(),
            tips: a.tips.unwrap_or_default(),
        })
        .collect();
    let day = raw
        .day
        .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX));
    DailyItinerary {
        day,
        title: raw.title.unwrap_or_else(|| format!("Day {day}")),
        theme: raw.theme.unwrap_or_default(),
        activities,
        meals: raw.meals,
        transportation: raw.transportation.unwrap_or_default(),
        budget: raw.budget.unwrap_or_default(),
    }
}

/// Every section and field defaults on its own; one malformed entry never
/// discards the rest of the plan.
pub fn fill_itinerary(value: Value) -> Result<FullItinerary> {
    let object = record_object(Category::Itinerary, value)?;
    let raw: RawItinerary = serde_json::from_value(object)
        .map_err(|e| VoyaError::Parse(format!("itinerary: {e}")))?;
    let section = Category::Itinerary;

    Ok(FullItinerary {
        flight_options: decode_items::<RawFlight>(section, raw.flight_options)
            .into_iter()
            .map(|f| FlightOption {
                airline: f.airline.unwrap_or_default(),
                route: f.route.unwrap_or_default(),
                departure: f.departure.unwrap_or_default(),
                arrival: f.arrival.unwrap_or_default(),
                duration: f.duration.unwrap_or_default(),
                price: f.price.unwrap_or_default(),
                stops: f.stops.unwrap_or_default(),
            })
            .collect(),
        hotel_recommendations: decode_items::<RawHotelRecommendation>(
            section,
            raw.hotel_recommendations,
        )
        .into_iter()
        .map(|h| HotelRecommendation {
            name: h.name.unwrap_or_default(),
            rating: clamp_rating(h.rating, DEFAULT_HOTEL_RATING),
            location: h.location.unwrap_or_default(),
            price_range: h.price_range.unwrap_or_default(),
            amenities: h.amenities,
            description: h.description.unwrap_or_default(),
        })
        .collect(),
        daily_itinerary: decode_items::<RawDay>(section, raw.daily_itinerary)
            .into_iter()
            .enumerate()
            .map(|(index, day)| fill_day(index, day))
            .collect(),
        food_recommendations: decode_items::<RawFood>(section, raw.food_recommendations)
            .into_iter()
            .map(|f| FoodRecommendation {
                name: f.name.unwrap_or_default(),
                cuisine: f.cuisine.unwrap_or_default(),
                location: f.location.unwrap_or_default(),
                price_range: f.price_range.unwrap_or_default(),
                must_try: f.must_try,
                description: f.description.unwrap_or_default(),
                rating: clamp_rating(f.rating, DEFAULT_RATING),
            })
            .collect(),
        experiences: decode_items::<RawExperience>(section, raw.experiences)
            .into_iter()
            .map(|e| Experience {
                name: e.name.unwrap_or_default(),
                kind: e.kind.unwrap_or_default(),
                duration: e.duration.unwrap_or_default(),
                difficulty: e.difficulty.unwrap_or_default(),
                price: e.price.unwrap_or_default(),
                description: e.description.unwrap_or_default(),
                best_time: e.best_time.unwrap_or_default(),
            })
            .collect(),
        weather_tips: raw.weather_tips.unwrap_or_default(),
        local_insights: raw.local_insights,
        budget_breakdown: raw.budget_breakdown,
        packing_list: raw.packing_list,
        emergency_contacts: raw.emergency_contacts,
    })
}

pub fn fill_translation(value: Value, ctx: &FillContext) -> Result<Translation> {
    let raw: RawTranslation = match value {
        Value::String(text) => RawTranslation {
            translated: Some(text),
            ..Default::default()
        },
        other => serde_json::from_value(record_object(Category::Translation, other)?)
            .map_err(|e| VoyaError::Parse(format!("translation: {e}")))?,
    };
    let translated = raw
        .translated
        .ok_or_else(|| VoyaError::Parse("translation has no translated text".to_string()))?;
    Ok(Translation {
        translated,
        pronunciation: raw.pronunciation.unwrap_or_default(),
        source_language: raw.source_language.unwrap_or_else(|| ctx.language.clone()),
    })
}

/// Photo captions in record order, or `None` for categories without images.
fn image_captions(data: &CategoryData) -> Option<Vec<String>> {
    Some(match data {
        CategoryData::Hotels(v) => v.iter().map(|r| r.name.clone()).collect(),
        CategoryData::Places(v) => v.iter().map(|r| r.name.clone()).collect(),
        CategoryData::Cuisine(v) => v.iter().map(|r| r.name.clone()).collect(),
        CategoryData::Adventures(v) => v.iter().map(|r| r.name.clone()).collect(),
        CategoryData::History(v) => v.iter().map(|r| r.title.clone()).collect(),
        CategoryData::Surprise(r) => vec![r.place.clone()],
        CategoryData::Weather(_) | CategoryData::Itinerary(_) | CategoryData::Translation(_) => {
            return None;
        }
    })
}

fn assign_images(data: &mut CategoryData, images: Vec<String>) {
    let mut images = images.into_iter();
    let mut next = || images.next().unwrap_or_default();
    match data {
        CategoryData::Hotels(v) => v.iter_mut().for_each(|r| r.image = next()),
        CategoryData::Places(v) => v.iter_mut().for_each(|r| r.image = next()),
        CategoryData::Cuisine(v) => v.iter_mut().for_each(|r| r.image = next()),
        CategoryData::Adventures(v) => v.iter_mut().for_each(|r| r.image = next()),
        CategoryData::History(v) => v.iter_mut().for_each(|r| r.image = next()),
        CategoryData::Surprise(r) => r.image = next(),
        CategoryData::Weather(_) | CategoryData::Itinerary(_) | CategoryData::Translation(_) => {}
    }
}

/// Turns normalized JSON into typed records and attaches images.
pub struct RecordFiller {
    photos: Arc<dyn PhotoSearch>,
    image_concurrency: usize,
    hotel_cap: usize,
    forecast_days: usize,
}

impl RecordFiller {
    pub fn new(photos: Arc<dyn PhotoSearch>, cfg: &Config) -> Self {
        Self {
            photos,
            image_concurrency: cfg.image_concurrency(),
            hotel_cap: cfg.pipeline.hotel_cap,
            forecast_days: cfg.pipeline.forecast_days,
        }
    }

    /// Decode without images. Errors are schema mismatches only.
    pub fn decode(
        &self,
        category: Category,
        value: Value,
        ctx: &FillContext,
    ) -> Result<CategoryData> {
        Ok(match category {
            Category::Weather => CategoryData::Weather(fill_weather(value, self.forecast_days)?),
            Category::Hotels => CategoryData::Hotels(fill_hotels(value, ctx, self.hotel_cap)?),
            Category::Places => CategoryData::Places(fill_places(value, ctx)?),
            Category::Cuisine => CategoryData::Cuisine(fill_cuisine(value)?),
            Category::Adventures => CategoryData::Adventures(fill_adventures(value)?),
            Category::History => CategoryData::History(fill_history(value)?),
            Category::Surprise => CategoryData::Surprise(fill_surprise(value, ctx)?),
            Category::Itinerary => CategoryData::Itinerary(fill_itinerary(value)?),
            Category::Translation => CategoryData::Translation(fill_translation(value, ctx)?),
        })
    }

    /// Decode and attach one image per record.
    pub async fn fill(
        &self,
        category: Category,
        value: Value,
        ctx: &FillContext,
    ) -> Result<CategoryData> {
        let mut data = self.decode(category, value, ctx)?;
        self.attach_images(&mut data, &ctx.destination).await;
        Ok(data)
    }

    /// Decode the category's fixed fallback set with placeholder images.
    pub fn fallback(&self, category: Category, ctx: &FillContext) -> Result<CategoryData> {
        let mut data = self.decode(category, fallback_value(category), ctx)?;
        if let Some(captions) = image_captions(&data) {
            let images = captions
                .iter()
                .map(|caption| placeholder_image(&format!("{caption} {}", ctx.destination)))
                .collect();
            assign_images(&mut data, images);
        }
        Ok(data)
    }

    /// Resolve images for every record; all lookups finish before returning.
    pub async fn attach_images(&self, data: &mut CategoryData, destination: &str) {
        let Some(captions) = image_captions(data) else {
            return;
        };
        let images = self.resolve_all(captions, destination).await;
        assign_images(data, images);
    }

    async fn resolve_all(&self, captions: Vec<String>, destination: &str) -> Vec<String> {
        debug!(
            count = captions.len(),
            limit = self.image_concurrency,
            "Resolving record images"
        );
        let photos = self.photos.as_ref();
        stream::iter(captions)
            .map(|caption| async move {
                let query = format!("{caption} {destination}");
                resolve_image(photos, &query).await
            })
            .buffered(self.image_concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photos::MockPhotoSearch;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ctx() -> FillContext {
        FillContext {
            destination: "Goa".to_string(),
            language: "hi".to_string(),
        }
    }

    fn weather_input(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| json!({"day": format!("D{i}"), "temp": "30°C", "condition": "sunny", "desc": "Clear"}))
                .collect(),
        )
    }

    #[test]
    fn test_weather_always_five_entries() {
        for n in [0, 3, 5, 8] {
            let forecast = fill_weather(weather_input(n), 5).unwrap();
            assert_eq!(forecast.len(), 5, "input of {n}");
        }
        let padded = fill_weather(weather_input(3), 5).unwrap();
        assert_eq!(padded[2].day, "D2");
        assert_eq!(padded[3].day, "Day 4");
        assert_eq!(padded[4].temp, "--");

        let truncated = fill_weather(weather_input(8), 5).unwrap();
        assert_eq!(truncated[4].day, "D4");
    }

    #[test]
    fn test_weather_defaults_and_condition_tags() {
        let forecast = fill_weather(
            json!([{"temperature": 22, "desc": "Heavy rain showers"}, "junk"]),
            5,
        )
        .unwrap();
        assert_eq!(forecast[0].day, "Day 1");
        assert_eq!(forecast[0].temp, "22");
        assert_eq!(forecast[0].condition, WeatherCondition::Rainy);
        assert_eq!(forecast[1].day, "Day 2");
    }

    #[test]
    fn test_hotels_capped_at_twelve_in_order() {
        let input = Value::Array(
            (0..20)
                .map(|i| json!({"id": format!("h{i}"), "name": format!("Hotel {i}"), "rating": 4.2}))
                .collect(),
        );
        let hotels = fill_hotels(input, &ctx(), 12).unwrap();
        assert_eq!(hotels.len(), 12);
        let ids: Vec<&str> = hotels.iter().map(|h| h.id.as_str()).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("h{i}")).collect();
        assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_hotel_field_defaults() {
        let hotels = fill_hotels(
            json!({"hotels": [
                {"name": "Taj", "rating": "not a number", "amenities": "Pool, Spa"},
                {"name": "Leela", "rating": "4.8"},
                {"rating": 9}
            ]}),
            &ctx(),
            12,
        )
        .unwrap();
        assert_eq!(hotels[0].id, "hotel_0");
        assert_eq!(hotels[0].rating, 4.0);
        assert_eq!(hotels[0].amenities, vec!["Pool", "Spa"]);
        assert_eq!(hotels[0].address, "Goa");
        assert_eq!(hotels[0].phone, "Not available");
        assert_eq!(hotels[1].rating, 4.8);
        assert_eq!(hotels[2].name, "Hotel 3");
        assert_eq!(hotels[2].rating, 5.0);
    }

    #[test]
    fn test_duplicate_ids_are_made_unique() {
        let hotels = fill_hotels(
            json!([{"id": "x", "name": "A"}, {"id": "x", "name": "B"}]),
            &ctx(),
            12,
        )
        .unwrap();
        assert_eq!(hotels[0].id, "x");
        assert_eq!(hotels[1].id, "x_1");
    }

    #[test]
    fn test_place_id_synthesized_from_name_and_destination() {
        let places = fill_places(json!([{"name": "Baga Beach", "rating": 4.6}]), &ctx()).unwrap();
        assert_eq!(places[0].id, "baga-beach-goa");
        assert_eq!(places[0].category, "Attraction");
        assert_eq!(places[0].rating, 4.6);
    }

    #[test]
    fn test_list_categories_reject_wrong_shapes() {
        assert!(matches!(
            fill_cuisine(json!("a string")),
            Err(VoyaError::Parse(_))
        ));
        assert!(matches!(
            fill_adventures(json!({"note": "no list here"})),
            Err(VoyaError::Parse(_))
        ));
        assert!(matches!(fill_history(json!([])), Err(VoyaError::Parse(_))));
    }

    #[test]
    fn test_cuisine_and_adventure_defaults() {
        let dishes = fill_cuisine(json!([{"name": "Vindaloo", "tags": ["Spicy", 5]}])).unwrap();
        assert_eq!(dishes[0].rating, 4.5);
        assert_eq!(dishes[0].tags, vec!["Spicy", "5"]);
        assert_eq!(dishes[0].price, "Varies");

        let adventures = fill_adventures(json!([{"name": "Parasailing", "bestTime": "Morning"}])).unwrap();
        assert_eq!(adventures[0].best_time, "Morning");
        assert_eq!(adventures[0].difficulty, "Moderate");
    }

    #[test]
    fn test_surprise_accepts_single_element_array() {
        let surprise = fill_surprise(json!([{"title": "Secret cove", "tip": "Go early"}]), &ctx()).unwrap();
        assert_eq!(surprise.title, "Secret cove");
        assert_eq!(surprise.place, "Goa");
        assert_eq!(surprise.best_time, "Anytime");
    }

    #[test]
    fn test_itinerary_fields_default_independently() {
        let itinerary = fill_itinerary(json!({
            "weatherTips": "Monsoon in July",
            "budgetBreakdown": {"total": "₹40,000"},
            "dailyItinerary": [{"day": 1, "title": "Beaches"}]
        }))
        .unwrap();
        assert_eq!(itinerary.weather_tips, "Monsoon in July");
        assert_eq!(itinerary.budget_breakdown["total"], "₹40,000");
        assert_eq!(itinerary.daily_itinerary[0].title, "Beaches");
        assert!(itinerary.flight_options.is_empty());
        assert!(itinerary.packing_list.is_empty());
    }

    #[test]
    fn test_itinerary_keeps_plan_when_fields_have_wrong_types() {
        let itinerary = fill_itinerary(json!({
            "weatherTips": "Monsoon",
            "flightOptions": [{"airline": "IndiGo", "stops": 0, "price": 5400}],
            "hotelRecommendations": [{"name": "Taj", "rating": "4.7", "amenities": "Pool, Spa"}],
            "foodRecommendations": [{"name": "Xacuti", "rating": null, "mustTry": "Chicken Xacuti"}],
            "experiences": [{"name": "Dolphin cruise", "type": "Wildlife", "duration": 2}],
            "packingList": "Sunscreen, Hat"
        }))
        .unwrap();
        assert_eq!(itinerary.weather_tips, "Monsoon");
        assert_eq!(itinerary.flight_options[0].airline, "IndiGo");
        assert_eq!(itinerary.flight_options[0].stops, "0");
        assert_eq!(itinerary.flight_options[0].price, "5400");
        assert_eq!(itinerary.hotel_recommendations[0].rating, 4.7);
        assert_eq!(itinerary.hotel_recommendations[0].amenities, vec!["Pool", "Spa"]);
        assert_eq!(itinerary.food_recommendations[0].rating, 4.5);
        assert_eq!(itinerary.food_recommendations[0].must_try, vec!["Chicken Xacuti"]);
        assert_eq!(itinerary.experiences[0].kind, "Wildlife");
        assert_eq!(itinerary.experiences[0].duration, "2");
        assert_eq!(itinerary.packing_list, vec!["Sunscreen", "Hat"]);
    }

    #[test]
    fn test_itinerary_day_numbers() {
        let itinerary = fill_itinerary(json!({
            "dailyItinerary": [
                {"day": "Day 1", "title": "Arrival"},
                {"day": 2.0, "activities": [{"time": "9 AM", "activity": "Fort Aguada", "cost": 0}, "junk"]},
                {"day": "three"},
                {"title": "Departure"},
                "not a day"
            ]
        }))
        .unwrap();
        let days: Vec<u32> = itinerary.daily_itinerary.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![1, 2, 3, 4]);
        assert_eq!(itinerary.daily_itinerary[1].title, "Day 2");
        assert_eq!(itinerary.daily_itinerary[1].activities.len(), 1);
        assert_eq!(itinerary.daily_itinerary[1].activities[0].cost, "0");
        assert_eq!(itinerary.daily_itinerary[3].title, "Departure");
    }

    #[test]
    fn test_itinerary_maps_drop_null_entries() {
        let itinerary = fill_itinerary(json!({
            "localInsights": {"currency": "INR", "safety": null, "tips": ["Haggle", "Carry cash"]},
            "budgetBreakdown": {"total": 40000, "hotels": null, "food": {"nested": 1}},
            "flightOptions": "none found"
        }))
        .unwrap();
        assert_eq!(itinerary.local_insights.get("currency").map(String::as_str), Some("INR"));
        assert!(!itinerary.local_insights.contains_key("safety"));
        assert_eq!(itinerary.local_insights["tips"], "Haggle, Carry cash");
        assert_eq!(itinerary.budget_breakdown.len(), 1);
        assert_eq!(itinerary.budget_breakdown["total"], "40000");
        assert!(itinerary.flight_options.is_empty());
    }

    #[test]
    fn test_translation_decoding() {
        let t = fill_translation(json!({"translation": "समुद्र तट कहाँ है?"}), &ctx()).unwrap();
        assert_eq!(t.translated, "समुद्र तट कहाँ है?");
        assert_eq!(t.source_language, "hi");

        let t = fill_translation(json!("Bonjour"), &ctx()).unwrap();
        assert_eq!(t.translated, "Bonjour");

        assert!(fill_translation(json!({"pronunciation": "x"}), &ctx()).is_err());
    }

    #[tokio::test]
    async fn test_fill_attaches_images_in_record_order() {
        let mut photos = MockPhotoSearch::new();
        photos
            .expect_search()
            .returning(|q| Ok(Some(format!("https://img/{}", q.replace(' ', "_")))));
        let filler = RecordFiller::new(Arc::new(photos), &Config::default());

        let data = filler
            .fill(
                Category::Places,
                json!([{"name": "Fort Aguada"}, {"name": "Dudhsagar Falls"}]),
                &ctx(),
            )
            .await
            .unwrap();
        let CategoryData::Places(places) = data else {
            panic!("expected places");
        };
        assert_eq!(places[0].image, "https://img/Fort_Aguada_Goa");
        assert_eq!(places[1].image, "https://img/Dudhsagar_Falls_Goa");
    }

    #[tokio::test]
    async fn test_failed_image_lookup_keeps_record() {
        let mut photos = MockPhotoSearch::new();
        photos
            .expect_search()
            .returning(|_| Err(VoyaError::Network("down".to_string())));
        let filler = RecordFiller::new(Arc::new(photos), &Config::default());
        let data = filler
            .fill(Category::Surprise, json!({"place": "Butterfly Beach"}), &ctx())
            .await
            .unwrap();
        let CategoryData::Surprise(s) = data else {
            panic!("expected surprise");
        };
        assert_eq!(s.image, placeholder_image("Butterfly Beach Goa"));
    }

    #[tokio::test]
    async fn test_weather_issues_no_photo_calls() {
        let mut photos = MockPhotoSearch::new();
        photos.expect_search().never();
        let filler = RecordFiller::new(Arc::new(photos), &Config::default());
        let data = filler
            .fill(Category::Weather, weather_input(2), &ctx())
            .await
            .unwrap();
        assert_eq!(data.len(), 5);
    }

    struct CountingPhotos {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PhotoSearch for CountingPhotos {
        async fn search(&self, query: &str) -> Result<Option<String>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(query.to_string()))
        }
    }

    #[tokio::test]
    async fn test_image_fan_out_is_bounded() {
        let photos = Arc::new(CountingPhotos {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut cfg = Config::default();
        cfg.pipeline.image_concurrency = 3;
        let filler = RecordFiller::new(photos.clone(), &cfg);

        let input = Value::Array(
            (0..12)
                .map(|i| json!({"name": format!("Hotel {i}")}))
                .collect(),
        );
        let data = filler.fill(Category::Hotels, input, &ctx()).await.unwrap();
        assert_eq!(data.len(), 12);
        let peak = photos.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak >= 1);
    }

    #[test]
    fn test_every_fallback_decodes_with_placeholders() {
        let mut photos = MockPhotoSearch::new();
        photos.expect_search().never();
        let filler = RecordFiller::new(Arc::new(photos), &Config::default());
        for category in Category::DESTINATION
            .into_iter()
            .chain([Category::Itinerary, Category::Translation])
        {
            let data = filler.fallback(category, &ctx()).unwrap();
            assert_eq!(data.category(), category);
            assert!(!data.is_empty());
        }

        let CategoryData::Hotels(hotels) = filler.fallback(Category::Hotels, &ctx()).unwrap() else {
            panic!("expected hotels");
        };
        assert_eq!(hotels[0].name, "Heritage Grand Hotel");
        assert_eq!(hotels[1].name, "Modern Suites");
        assert_eq!(hotels[0].image, placeholder_image("Heritage Grand Hotel Goa"));
    }
}
