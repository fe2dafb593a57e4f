use serde_json::{Value, json};

use crate::models::Category;

/// Fixed record set rendered when live content cannot be obtained or parsed.
/// Images are left out; the fill step attaches placeholders.
pub fn fallback_value(category: Category) -> Value {
    match category {
        Category::Weather => json!([
            {"day": "Today", "temp": "28°C", "condition": "sunny", "desc": "Sunny"},
            {"day": "Tomorrow", "temp": "26°C", "condition": "cloudy", "desc": "Partly Cloudy"},
            {"day": "Day 3", "temp": "24°C", "condition": "rainy", "desc": "Light Rain"},
            {"day": "Day 4", "temp": "30°C", "condition": "sunny", "desc": "Hot & Sunny"},
            {"day": "Day 5", "temp": "27°C", "condition": "cloudy", "desc": "Warm & Cloudy"}
        ]),
        Category::Hotels => json!([
            {
                "id": "hotel_fallback_1",
                "name": "Heritage Grand Hotel",
                "price": "₹6,500/night",
                "rating": 4.5,
                "amenities": ["Pool", "Spa", "Restaurant"],
                "address": "Old Town",
                "phone": "Not available"
            },
            {
                "id": "hotel_fallback_2",
                "name": "Modern Suites",
                "price": "₹4,200/night",
                "rating": 4.2,
                "amenities": ["WiFi", "Gym", "City View"],
                "address": "City Centre",
                "phone": "Not available"
            }
        ]),
        Category::Places => json!([
            {"id": "place_fallback_1", "name": "Golden Temple", "category": "Landmark", "address": "Old Town", "rating": 4.8},
            {"id": "place_fallback_2", "name": "Sunset Beach", "category": "Beach", "address": "Coastline", "rating": 4.9},
            {"id": "place_fallback_3", "name": "Heritage Museum", "category": "Museum", "address": "City Centre", "rating": 4.6}
        ]),
        Category::Cuisine => json!([
            {"name": "Spiced Golden Curry", "rating": 4.8, "tags": ["Aromatic", "Traditional"], "description": "Slow-cooked house curry", "restaurant": "Local favourite", "price": "₹350"},
            {"name": "Honey Glazed Seafood", "rating": 4.7, "tags": ["Fresh", "Sweet"], "description": "Catch of the day", "restaurant": "Harbour stalls", "price": "₹600"},
            {"name": "Sunset Street Tacos", "rating": 4.6, "tags": ["Spicy", "Local"], "description": "Evening street food", "restaurant": "Night market", "price": "₹200"}
        ]),
        Category::Adventures => json!([
            {"name": "Sunrise Hiking", "difficulty": "Moderate", "duration": "5 hours", "description": "Guided trail to the viewpoint", "price": "₹1,500", "bestTime": "Early morning"},
            {"name": "Golden Hour Photography", "difficulty": "Easy", "duration": "3 hours", "description": "Photo walk with a local", "price": "₹1,200", "bestTime": "Evening"},
            {"name": "Desert Safari", "difficulty": "Easy", "duration": "4 hours", "description": "Jeep ride and camp dinner", "price": "₹3,000", "bestTime": "Afternoon"}
        ]),
        Category::History => json!([
            {"title": "Ancient Roots", "content": "The region has been inhabited and traded through for centuries.", "period": "Antiquity", "significance": "Shaped the local culture and cuisine"},
            {"title": "Colonial Era", "content": "Foreign powers left a lasting mark on architecture and language.", "period": "16th-20th century", "significance": "Visible in the old quarter today"}
        ]),
        Category::Surprise => json!({
            "title": "Hidden Gem Discovered! ✨",
            "place": "Secret Sunset Viewpoint",
            "description": "A magical spot known only to locals, where the golden hour creates the most breathtaking views. Perfect for romantic moments and unforgettable photos!",
            "tip": "Best visited 30 minutes before sunset with a picnic basket!",
            "category": "Viewpoint",
            "bestTime": "Sunset"
        }),
        Category::Itinerary => json!({
            "dailyItinerary": [
                {
                    "day": 1,
                    "title": "Arrival and first look",
                    "theme": "Settle in",
                    "activities": [
                        {"time": "Afternoon", "activity": "Check in and explore the neighbourhood", "location": "Hotel area", "duration": "3 hours", "cost": "Free", "tips": "Keep the first day light"}
                    ],
                    "meals": ["Dinner at a local restaurant"],
                    "transportation": "Taxi from the airport",
                    "budget": "Varies"
                }
            ],
            "weatherTips": "Check the forecast before you pack.",
            "packingList": ["Travel documents", "Comfortable shoes", "Phone charger"],
            "emergencyContacts": ["Local emergency number: 112"]
        }),
        Category::Translation => json!({
            "translated": "Translation unavailable right now.",
            "pronunciation": "",
            "sourceLanguage": "en"
        }),
    }
}
