pub mod config;
pub mod currency;
pub mod destinations;
pub mod error;
pub mod fallback;
pub mod fill;
pub mod geocode;
pub mod models;
pub mod normalize;
pub mod photos;
pub mod prompts;
pub mod service;
pub mod state;
pub mod transport;

pub use crate::config::Config;
pub use crate::error::{Result, VoyaError};
pub use crate::models::{Category, CategoryData, DateMode, Travelers, TripQuery};
pub use crate::normalize::{FallbackReason, Provenance};
pub use crate::service::{Outcome, TripPlanner};
pub use crate::state::{Status, ViewState};
