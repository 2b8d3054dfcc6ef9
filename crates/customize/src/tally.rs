//! Render tally: which slots and items the render pass actually touched.
//!
//! Observation only. Both slot hooks hand their input back unchanged so they
//! can sit inline in a render loop.

use indexmap::IndexSet;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TallySnapshot {
    pub declared_slots: Vec<String>,
    pub rendered_slots: Vec<String>,
    pub queried_slots: Vec<String>,
    pub rendered_items: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderTally {
    declared: IndexSet<String>,
    rendered_slots: IndexSet<String>,
    queried_slots: IndexSet<String>,
    rendered_items: IndexSet<String>,
}

impl RenderTally {
    pub fn new<I, S>(declared_slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: declared_slots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Called by the slot render function. Undeclared keys are not recorded.
    pub fn on_render_slot(&mut self, slot_key: &str, has_items: bool) -> bool {
        if self.declared.contains(slot_key) {
            self.rendered_slots.insert(slot_key.to_string());
        }
        has_items
    }

    /// Called when a caller only asks whether a slot has active items.
    pub fn on_has_active_items(&mut self, slot_key: &str, is_active: bool) -> bool {
        if self.declared.contains(slot_key) {
            self.queried_slots.insert(slot_key.to_string());
        }
        is_active
    }

    pub fn on_render_item(&mut self, item_id: &str) {
        self.rendered_items.insert(item_id.to_string());
    }

    pub fn is_slot_rendered(&self, slot_key: &str) -> bool {
        self.rendered_slots.contains(slot_key)
    }

    pub fn was_slot_queried(&self, slot_key: &str) -> bool {
        self.queried_slots.contains(slot_key)
    }

    pub fn is_item_rendered(&self, item_id: &str) -> bool {
        self.rendered_items.contains(item_id)
    }

    pub fn snapshot(&self) -> TallySnapshot {
        fn list(set: &IndexSet<String>) -> Vec<String> {
            set.iter().cloned().collect()
        }
        TallySnapshot {
            declared_slots: list(&self.declared),
            rendered_slots: list(&self.rendered_slots),
            queried_slots: list(&self.queried_slots),
            rendered_items: list(&self.rendered_items),
        }
    }

    /// Forget observations; declared slots stay.
    pub fn reset(&mut self) {
        self.rendered_slots.clear();
        self.queried_slots.clear();
        self.rendered_items.clear();
    }
}
