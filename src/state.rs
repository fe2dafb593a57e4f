use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Category, CategoryData, GeoPoint};
use crate::normalize::{FallbackReason, Provenance};

const ALL_CATEGORIES: [Category; 9] = [
    Category::Weather,
    Category::Hotels,
    Category::Places,
    Category::Cuisine,
    Category::Adventures,
    Category::History,
    Category::Surprise,
    Category::Itinerary,
    Category::Translation,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Slot {
    pub status: Status,
    pub data: Option<CategoryData>,
    pub provenance: Option<Provenance>,
    pub error_message: Option<String>,
    /// Bumped by every `begin`; only the newest ticket may write.
    pub generation: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Proof that a fetch was started; stale once a newer fetch begins or the
/// session it was taken in is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub session_id: Uuid,
    pub category: Category,
    pub generation: u64,
}

/// Per-session container: one slot per category, mutated only through the
/// transition methods below.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub session_id: Uuid,
    pub location: Option<GeoPoint>,
    slots: BTreeMap<Category, Slot>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            location: None,
            slots: ALL_CATEGORIES
                .into_iter()
                .map(|c| (c, Slot::default()))
                .collect(),
        }
    }

    pub fn slot(&self, category: Category) -> &Slot {
        // Every category is inserted by `new`
        &self.slots[&category]
    }

    fn slot_mut(&mut self, category: Category) -> &mut Slot {
        self.slots.entry(category).or_default()
    }

    pub fn data(&self, category: Category) -> Option<&CategoryData> {
        self.slot(category).data.as_ref()
    }

    /// idle/ready/error -> loading. Supersedes any in-flight fetch.
    pub fn begin(&mut self, category: Category) -> Ticket {
        let slot = self.slot_mut(category);
        slot.generation += 1;
        slot.status = Status::Loading;
        slot.error_message = None;
        debug!(category = %category, generation = slot.generation, "Category loading");
        let generation = slot.generation;
        Ticket {
            session_id: self.session_id,
            category,
            generation,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        if ticket.session_id != self.session_id {
            warn!(
                category = %ticket.category,
                session = %ticket.session_id,
                "Discarding result from a previous session"
            );
            return false;
        }
        let current = self.slot(ticket.category).generation;
        if current != ticket.generation {
            warn!(
                category = %ticket.category,
                stale = ticket.generation,
                current,
                "Discarding superseded result"
            );
            return false;
        }
        true
    }

    /// loading -> ready with live or fallback data. Returns false if stale.
    pub fn resolve(&mut self, ticket: Ticket, data: CategoryData, provenance: Provenance) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let slot = self.slot_mut(ticket.category);
        info!(
            category = %ticket.category,
            records = data.len(),
            fallback = provenance.is_fallback(),
            "Category ready"
        );
        slot.status = Status::Ready;
        slot.data = Some(data);
        slot.provenance = Some(provenance);
        slot.error_message = None;
        slot.updated_at = Some(Utc::now());
        true
    }

    /// loading -> error. Upstream failures install the fallback set; configuration
    /// failures pass `None` and keep whatever data the slot already had.
    pub fn fail(
        &mut self,
        ticket: Ticket,
        message: String,
        fallback: Option<(CategoryData, FallbackReason)>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let slot = self.slot_mut(ticket.category);
        warn!(category = %ticket.category, error = %message, "Category failed");
        slot.status = Status::Error;
        slot.error_message = Some(message);
        if let Some((data, reason)) = fallback {
            slot.data = Some(data);
            slot.provenance = Some(Provenance::Fallback { reason });
        }
        slot.updated_at = Some(Utc::now());
        true
    }

    /// Only applies while `session_id` is still the live session.
    pub fn set_location(&mut self, session_id: Uuid, location: Option<GeoPoint>) -> bool {
        if session_id != self.session_id {
            warn!(session = %session_id, "Discarding location from a previous session");
            return false;
        }
        self.location = location;
        true
    }

    /// Categories still waiting on a response.
    pub fn pending(&self) -> Vec<Category> {
        self.slots
            .iter()
            .filter(|(_, s)| s.status == Status::Loading)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Back navigation: drop everything and start a fresh session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
