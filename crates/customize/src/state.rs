//! Effective-state provider: storage plus ordered read intercepts.
//!
//! Three read points are interceptable:
//!
//! - the persisted slot-map read (what storage "returns"),
//! - the old-slot-map-data read (previous theme's map during a switch),
//! - the slot-map read used for rendering and registration.
//!
//! Intercepts run in [`Layer`] order, ties in installation order, so a
//! theme-switch override always runs before setting previews, which run
//! before the draft merge, which runs before anything external.
//!
//! The slot-map read keeps a cached base value. Installing an intercept on
//! the persisted read drops that cache.

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::model::{SlotMap, StoredSlotMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    ThemeSwitch,
    SettingPreview,
    DraftMerge,
    External,
}

pub type Intercept<T> = Box<dyn Fn(T) -> T>;

struct Installed<T> {
    layer: Layer,
    seq: usize,
    label: String,
    apply: Intercept<T>,
}

/// Ordered chain of read intercepts for one read point.
pub struct InterceptChain<T> {
    entries: Vec<Installed<T>>,
    next_seq: usize,
}

impl<T> Default for InterceptChain<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T> InterceptChain<T> {
    /// Install under a unique label. Returns false (and installs nothing) if
    /// the label is already present.
    pub fn install(
        &mut self,
        layer: Layer,
        label: impl Into<String>,
        intercept: impl Fn(T) -> T + 'static,
    ) -> bool {
        let label = label.into();
        if self.is_installed(&label) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Installed {
            layer,
            seq,
            label,
            apply: Box::new(intercept),
        });
        self.entries.sort_by_key(|e| (e.layer, e.seq));
        true
    }

    pub fn is_installed(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e.label == label)
    }

    pub fn apply(&self, value: T) -> T {
        self.entries.iter().fold(value, |acc, e| (e.apply)(acc))
    }

    /// Labels in call order.
    pub fn labels(&self) -> Vec<(Layer, &str)> {
        self.entries.iter().map(|e| (e.layer, e.label.as_str())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> fmt::Debug for InterceptChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

/// Durable state as loaded from storage. Never written during a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PersistedState {
    pub active_theme: String,
    pub slot_map: StoredSlotMap,
    /// Raw item id → configuration payload.
    pub instances: IndexMap<String, Value>,
    /// Slot maps saved when a theme was last active, by theme name.
    pub theme_snapshots: IndexMap<String, SlotMap>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterceptSummary {
    pub persisted_slot_map: Vec<(Layer, String)>,
    pub old_slot_map_data: Vec<(Layer, String)>,
    pub slot_map: Vec<(Layer, String)>,
}

pub struct EffectiveStateProvider {
    store: PersistedState,
    persisted: InterceptChain<StoredSlotMap>,
    old_data: InterceptChain<Option<SlotMap>>,
    render: InterceptChain<SlotMap>,
    cached: RefCell<Option<SlotMap>>,
}

impl EffectiveStateProvider {
    pub fn new(store: PersistedState) -> Self {
        Self {
            store,
            persisted: InterceptChain::default(),
            old_data: InterceptChain::default(),
            render: InterceptChain::default(),
            cached: RefCell::new(None),
        }
    }

    pub fn store(&self) -> &PersistedState {
        &self.store
    }

    pub fn active_theme(&self) -> &str {
        &self.store.active_theme
    }

    /// Raw storage, bypassing every intercept.
    pub fn stored_slot_map(&self) -> &StoredSlotMap {
        &self.store.slot_map
    }

    pub fn persisted_instance(&self, raw_item_id: &str) -> Option<&Value> {
        self.store.instances.get(raw_item_id)
    }

    pub fn theme_snapshot(&self, theme: &str) -> Option<&SlotMap> {
        self.store.theme_snapshots.get(theme)
    }

    /// Persisted slot-map read, after intercepts. Always recomputed.
    pub fn read_persisted_slot_map(&self) -> StoredSlotMap {
        self.persisted.apply(self.store.slot_map.clone())
    }

    pub fn old_slot_map_data(&self) -> Option<SlotMap> {
        self.old_data.apply(None)
    }

    /// Current slot map as every reader should see it.
    pub fn slot_map(&self) -> SlotMap {
        let base = self
            .cached
            .borrow_mut()
            .get_or_insert_with(|| self.read_persisted_slot_map().into_slots())
            .clone();
        self.render.apply(base)
    }

    pub fn invalidate_cache(&self) {
        self.cached.borrow_mut().take();
    }

    pub fn is_cached(&self) -> bool {
        self.cached.borrow().is_some()
    }

    pub fn intercept_persisted(
        &mut self,
        layer: Layer,
        label: impl Into<String>,
        intercept: impl Fn(StoredSlotMap) -> StoredSlotMap + 'static,
    ) -> bool {
        let installed = self.persisted.install(layer, label, intercept);
        if installed {
            self.invalidate_cache();
        }
        installed
    }

    pub fn intercept_old_data(
        &mut self,
        layer: Layer,
        label: impl Into<String>,
        intercept: impl Fn(Option<SlotMap>) -> Option<SlotMap> + 'static,
    ) -> bool {
        self.old_data.install(layer, label, intercept)
    }

    pub fn intercept_slot_map(
        &mut self,
        layer: Layer,
        label: impl Into<String>,
        intercept: impl Fn(SlotMap) -> SlotMap + 'static,
    ) -> bool {
        self.render.install(layer, label, intercept)
    }

    pub fn is_slot_map_intercepted(&self, label: &str) -> bool {
        self.render.is_installed(label)
    }

    pub fn intercepts(&self) -> InterceptSummary {
        fn owned(labels: Vec<(Layer, &str)>) -> Vec<(Layer, String)> {
            labels.into_iter().map(|(l, s)| (l, s.to_string())).collect()
        }
        InterceptSummary {
            persisted_slot_map: owned(self.persisted.labels()),
            old_slot_map_data: owned(self.old_data.labels()),
            slot_map: owned(self.render.labels()),
        }
    }
}

impl fmt::Debug for EffectiveStateProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveStateProvider")
            .field("active_theme", &self.store.active_theme)
            .field("persisted", &self.persisted)
            .field("old_data", &self.old_data)
            .field("render", &self.render)
            .field("cached", &self.is_cached())
            .finish()
    }
}
