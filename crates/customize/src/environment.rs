//! Host environment: item kinds, loaded items, declared slots.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use crate::codec::parse_item_id;
use crate::model::{DeclaredSlot, ItemId, ItemKind, RegisteredItem, SlotMap};
use crate::reconcile::{ReconcileInput, Reconciler, SlotMatchReconciler};
use crate::wide::WidePredicate;

pub trait EnvironmentProvider {
    /// Materialize items. `previewed` lists items with an active draft, which
    /// must load even if nothing is stored for them yet.
    fn load(&mut self, previewed: &[ItemId]);

    fn kinds(&self) -> &[ItemKind];

    fn registered_items(&self) -> &[RegisteredItem];

    fn declared_slots(&self) -> &[DeclaredSlot];

    fn registered_item(&self, raw_item_id: &str) -> Option<&RegisteredItem> {
        self.registered_items().iter().find(|item| item.id == raw_item_id)
    }

    fn is_declared(&self, slot_key: &str) -> bool {
        self.declared_slots().iter().any(|slot| slot.key == slot_key)
    }

    /// Map `existing` onto this environment's slots after a theme switch.
    fn reconcile(&self, existing: &SlotMap, previous: Option<&SlotMap>) -> SlotMap {
        SlotMatchReconciler.reconcile(
            existing,
            &ReconcileInput {
                declared_slots: self.declared_slots(),
                registered_items: self.registered_items(),
                previous,
            },
        )
    }
}

/// Environment backed by a site description.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    kinds: Vec<ItemKind>,
    slots: Vec<DeclaredSlot>,
    /// Raw ids of stored item instances.
    stored: Vec<String>,
    items: Vec<RegisteredItem>,
    loaded: bool,
}

impl Environment {
    pub fn new(kinds: Vec<ItemKind>, slots: Vec<DeclaredSlot>, stored: Vec<String>) -> Self {
        Self {
            kinds,
            slots,
            stored,
            items: Vec::new(),
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl EnvironmentProvider for Environment {
    /// Singleton kinds load once. Multi kinds load one item per stored or
    /// previewed instance number, ascending.
    fn load(&mut self, previewed: &[ItemId]) {
        let mut items = Vec::new();
        for kind in &self.kinds {
            if !kind.multi {
                items.push(RegisteredItem::new(kind, None));
                continue;
            }
            let numbers: BTreeSet<u64> = self
                .stored
                .iter()
                .map(|raw| parse_item_id(raw))
                .chain(previewed.iter().cloned())
                .filter(|id| id.kind_base == kind.kind_base)
                .filter_map(|id| id.instance_number)
                .collect();
            items.extend(numbers.into_iter().map(|n| RegisteredItem::new(kind, Some(n))));
        }
        debug!(
            "environment loaded {} items from {} kinds ({} previewed)",
            items.len(),
            self.kinds.len(),
            previewed.len()
        );
        self.items = items;
        self.loaded = true;
    }

    fn kinds(&self) -> &[ItemKind] {
        &self.kinds
    }

    fn registered_items(&self) -> &[RegisteredItem] {
        &self.items
    }

    fn declared_slots(&self) -> &[DeclaredSlot] {
        &self.slots
    }
}

/// Entry for an "add item" picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableKind {
    pub kind_base: String,
    pub name: String,
    pub description: String,
    pub multi: bool,
    /// Instance number a new item of this kind would take.
    pub next_instance_number: Option<u64>,
    pub is_wide: bool,
}

pub fn available_kinds(env: &dyn EnvironmentProvider, wide: &WidePredicate) -> Vec<AvailableKind> {
    env.kinds()
        .iter()
        .map(|kind| {
            let next_instance_number = kind.multi.then(|| {
                env.registered_items()
                    .iter()
                    .filter(|item| item.identity.kind_base == kind.kind_base)
                    .filter_map(|item| item.identity.instance_number)
                    .max()
                    .map_or(2, |max| (max + 1).max(2))
            });
            let candidate = match next_instance_number {
                Some(n) => ItemId::instance(kind.kind_base.clone(), n),
                None => ItemId::singleton(kind.kind_base.clone()),
            };
            AvailableKind {
                kind_base: kind.kind_base.clone(),
                name: kind.name.clone(),
                description: kind.description.clone(),
                multi: kind.multi,
                next_instance_number,
                is_wide: wide.is_wide(&candidate),
            }
        })
        .collect()
}
