//! Mapping a slot map onto a new theme's declared slots.
//!
//! Used when the session switches theme: the previous theme's placements are
//! carried over where the new theme has a matching slot, everything else
//! lands in the reserved `unassigned` slot.

use std::collections::HashSet;

use crate::model::{DeclaredSlot, RegisteredItem, SlotMap, ORPHANED_SLOT_PREFIX, UNASSIGNED_SLOT};

/// Slot names that commonly mean the same place across themes.
const COMMON_SLOT_GROUPS: &[&[&str]] = &[
    &["sidebar", "primary", "main", "right"],
    &["second", "left"],
    &["sidebar-2", "footer", "bottom"],
    &["header", "top"],
];

pub struct ReconcileInput<'a> {
    pub declared_slots: &'a [DeclaredSlot],
    pub registered_items: &'a [RegisteredItem],
    /// The new theme's own slot map from when it was last active.
    pub previous: Option<&'a SlotMap>,
}

pub trait Reconciler {
    /// Candidate slot map for the new theme. Must be pure: equal inputs give
    /// equal output.
    fn reconcile(&self, existing: &SlotMap, input: &ReconcileInput<'_>) -> SlotMap;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotMatchReconciler;

impl Reconciler for SlotMatchReconciler {
    fn reconcile(&self, existing: &SlotMap, input: &ReconcileInput<'_>) -> SlotMap {
        let known: HashSet<&str> = input.registered_items.iter().map(|i| i.id.as_str()).collect();

        let mut out = SlotMap::new();
        out.set(UNASSIGNED_SLOT, Vec::new());
        for slot in input.declared_slots {
            out.entry(&slot.key);
        }

        let mut pending = SlotMap::new();
        for (key, items) in existing.iter() {
            if is_inactive_slot(key) {
                out.entry(UNASSIGNED_SLOT).extend(items.iter().cloned());
            } else {
                pending.set(key, items.to_vec());
            }
        }

        if pending.len() == 1 && input.declared_slots.len() == 1 {
            if let Some((_, items)) = pending.iter().next() {
                out.set(input.declared_slots[0].key.clone(), items.to_vec());
            }
        } else {
            map_by_key(&mut out, &mut pending, input.declared_slots);
            map_by_common_name(&mut out, &mut pending, input.declared_slots);
            for (_, items) in pending.iter() {
                out.entry(UNASSIGNED_SLOT).extend(items.iter().cloned());
            }
            if let Some(previous) = input.previous {
                restore_previous(&mut out, previous, input.declared_slots, &known);
            }
        }

        for (_, items) in out.iter_mut() {
            items.retain(|id| known.contains(id.as_str()));
        }
        prepend_lost_items(&mut out, input.registered_items);
        dedupe(&mut out);
        out
    }
}

fn is_inactive_slot(key: &str) -> bool {
    key == UNASSIGNED_SLOT || key.starts_with(ORPHANED_SLOT_PREFIX)
}

fn map_by_key(out: &mut SlotMap, pending: &mut SlotMap, declared: &[DeclaredSlot]) {
    for slot in declared {
        if let Some(items) = pending.remove(&slot.key) {
            out.set(slot.key.clone(), items);
        }
    }
}

/// Case-insensitive containment either way.
fn loosely_matches(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    a.contains(&b) || b.contains(&a)
}

fn map_by_common_name(out: &mut SlotMap, pending: &mut SlotMap, declared: &[DeclaredSlot]) {
    if pending.is_empty() {
        return;
    }
    for group in COMMON_SLOT_GROUPS {
        for slug in group.iter() {
            'declared: for slot in declared {
                if !loosely_matches(&slot.key, slug) {
                    continue;
                }
                let candidates: Vec<String> = pending.keys().map(str::to_string).collect();
                for old_key in candidates {
                    let matched = group.iter().any(|other| loosely_matches(&old_key, other));
                    if matched && !pending.items(&old_key).is_empty() {
                        let moved = pending.remove(&old_key).unwrap_or_default();
                        out.entry(&slot.key).extend(moved);
                        continue 'declared;
                    }
                }
            }
        }
    }
}

/// Refill declared slots that are still empty from the new theme's
/// last-known map.
fn restore_previous(
    out: &mut SlotMap,
    previous: &SlotMap,
    declared: &[DeclaredSlot],
    known: &HashSet<&str>,
) {
    let mut revived: SlotMap = previous
        .iter()
        .filter(|(key, items)| !items.is_empty() && declared.iter().any(|slot| slot.key == *key))
        .filter(|(key, _)| out.items(key).is_empty())
        .map(|(key, items)| {
            let items = items.iter().filter(|id| known.contains(id.as_str())).cloned().collect();
            (key.to_string(), items)
        })
        .collect();

    // An item already active elsewhere stays there; one parked in
    // `unassigned` is revived instead.
    let active: HashSet<String> = out
        .iter()
        .filter(|(key, _)| *key != UNASSIGNED_SLOT)
        .flat_map(|(_, items)| items.iter().cloned())
        .collect();
    for (_, items) in revived.iter_mut() {
        items.retain(|id| !active.contains(id));
    }
    let reviving: HashSet<String> = revived.iter().flat_map(|(_, items)| items.iter().cloned()).collect();
    out.entry(UNASSIGNED_SLOT).retain(|id| !reviving.contains(id));

    out.merge(&revived);
}

/// Registered items shown nowhere go to the front of `unassigned`. Instances
/// numbered below 2 are placeholders and stay hidden.
fn prepend_lost_items(out: &mut SlotMap, registered: &[RegisteredItem]) {
    let lost: Vec<String> = registered
        .iter()
        .filter(|item| !matches!(item.identity.instance_number, Some(n) if n < 2))
        .filter(|item| !out.contains_item(&item.id))
        .map(|item| item.id.clone())
        .collect();
    if lost.is_empty() {
        return;
    }
    let unassigned = out.entry(UNASSIGNED_SLOT);
    let rest = std::mem::take(unassigned);
    *unassigned = lost.into_iter().chain(rest).collect();
}

/// Each item appears once; active slots win over `unassigned`.
fn dedupe(out: &mut SlotMap) {
    let mut seen: HashSet<String> = HashSet::new();
    for (key, items) in out.iter_mut() {
        if key != UNASSIGNED_SLOT {
            items.retain(|id| seen.insert(id.clone()));
        }
    }
    out.entry(UNASSIGNED_SLOT).retain(|id| seen.insert(id.clone()));
}
