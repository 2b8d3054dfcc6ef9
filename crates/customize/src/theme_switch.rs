//! Theme-switch overlay.
//!
//! When the session previews a theme other than the active one, the stored
//! slot map is reconciled against the new theme's slots and served through
//! the persisted read. The old map stays readable as `old_slot_map_data` so
//! the save pipeline can keep it. Storage is never written.

use serde::Serialize;

use crate::environment::EnvironmentProvider;
use crate::model::{SlotMap, StoredSlotMap};
use crate::pipeline::CustomizeSession;
use crate::state::Layer;

pub const OLD_DATA_INTERCEPT: &str = "theme_switch:old_slot_map_data";
pub const SLOT_MAP_INTERCEPT: &str = "theme_switch:slot_map";

/// Captured once per session; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeSwitchCache {
    pub from_theme: String,
    pub to_theme: String,
    pub old_slot_map: SlotMap,
    pub reconciled: SlotMap,
}

/// Returns true if the overlay was installed by this call.
pub fn reconcile_theme_switch(session: &mut CustomizeSession, env: &dyn EnvironmentProvider) -> bool {
    if session.context.async_request || session.is_theme_active() || session.theme_switch.is_some() {
        return false;
    }

    let old_slot_map = session.state.stored_slot_map().slots.clone();
    let previous = session.state.theme_snapshot(&session.context.target_theme);
    let reconciled = env.reconcile(&old_slot_map, previous);

    let snapshot = old_slot_map.clone();
    session
        .state
        .intercept_old_data(Layer::ThemeSwitch, OLD_DATA_INTERCEPT, move |_| Some(snapshot.clone()));

    let computed = reconciled.clone();
    session.state.intercept_persisted(Layer::ThemeSwitch, SLOT_MAP_INTERCEPT, move |_| {
        StoredSlotMap::versioned(computed.clone())
    });
    session.state.invalidate_cache();

    session.theme_switch = Some(ThemeSwitchCache {
        from_theme: session.state.active_theme().to_string(),
        to_theme: session.context.target_theme.clone(),
        old_slot_map,
        reconciled,
    });
    true
}
