use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DestinationDefaults {
    pub currency: &'static str,
    pub language: &'static str,
}

pub const FALLBACK_DEFAULTS: DestinationDefaults = DestinationDefaults {
    currency: "USD",
    language: "en",
};

const KNOWN_DESTINATIONS: &[(&str, &str, &str)] = &[
    ("goa", "INR", "hi"),
    ("manali", "INR", "hi"),
    ("mumbai", "INR", "hi"),
    ("delhi", "INR", "hi"),
    ("jaipur", "INR", "hi"),
    ("kerala", "INR", "ml"),
    ("paris", "EUR", "fr"),
    ("rome", "EUR", "it"),
    ("barcelona", "EUR", "es"),
    ("amsterdam", "EUR", "nl"),
    ("berlin", "EUR", "de"),
    ("london", "GBP", "en"),
    ("new york", "USD", "en"),
    ("tokyo", "JPY", "ja"),
    ("bangkok", "THB", "th"),
    ("bali", "IDR", "id"),
    ("singapore", "SGD", "en"),
    ("dubai", "AED", "ar"),
    ("maldives", "MVR", "dv"),
    ("sydney", "AUD", "en"),
    ("seoul", "KRW", "ko"),
    ("istanbul", "TRY", "tr"),
    ("zurich", "CHF", "de"),
    ("kathmandu", "NPR", "ne"),
];

/// Case-insensitive exact match; unknown places get USD/English.
pub fn destination_defaults(destination: &str) -> DestinationDefaults {
    let key = destination.trim().to_lowercase();
    KNOWN_DESTINATIONS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|&(_, currency, language)| DestinationDefaults { currency, language })
        .unwrap_or(FALLBACK_DEFAULTS)
}
