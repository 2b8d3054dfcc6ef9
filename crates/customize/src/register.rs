//! Registration pass: settings and controls for every slot and item.

use log::debug;

use crate::codec::{item_setting_id, slot_setting_id};
use crate::controls::{Control, ControlKind, Panel, Section};
use crate::environment::EnvironmentProvider;
use crate::model::{SlotMap, OLD_SLOT_MAP_DATA, UNASSIGNED_SLOT};
use crate::pipeline::CustomizeSession;
use crate::resolver::{ArgOverrides, SettingType};
use crate::state::Layer;

pub const WIDGETS_PANEL: &str = "widgets";
pub const WIDGETS_PANEL_PRIORITY: i64 = 110;
pub const DRAFT_MERGE_INTERCEPT: &str = "draft_merge";

pub fn section_id(slot_key: &str) -> String {
    format!("sidebar-widgets-{slot_key}")
}

/// Ensure every setting, section and control exists. Every creation is
/// guarded, so a second pass is a no-op.
///
/// Returns the setting ids created by this call.
pub fn register_settings_and_controls(
    session: &mut CustomizeSession,
    env: &dyn EnvironmentProvider,
) -> Vec<String> {
    let theme_active = session.is_theme_active();
    let mut created = Vec::new();

    let mut working = SlotMap::new();
    working.set(UNASSIGNED_SLOT, Vec::new());
    for slot in env.declared_slots() {
        working.entry(&slot.key);
    }
    working.merge(&session.slot_map());

    for item in env.registered_items() {
        let id = item_setting_id(&item.identity);
        ensure_setting(session, &id, ArgOverrides::default(), &mut created);
    }

    if !theme_active {
        let overrides = ArgOverrides::default()
            .setting_type(SettingType::GlobalVariable)
            .dirty(true);
        ensure_setting(session, OLD_SLOT_MAP_DATA, overrides, &mut created);
    }

    session.controls.add_panel(Panel {
        id: WIDGETS_PANEL.to_string(),
        title: "Widgets".to_string(),
        description: "Items placed in the slots your theme declares.".to_string(),
        priority: WIDGETS_PANEL_PRIORITY,
        active: !env.declared_slots().is_empty(),
    });

    for (slot_key, items) in working.iter() {
        let declared = env
            .declared_slots()
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.key == slot_key);
        if declared.is_none() && slot_key != UNASSIGNED_SLOT {
            debug!("slot {slot_key} is not declared by the theme, skipping");
            continue;
        }

        let setting_id = slot_setting_id(slot_key);
        ensure_setting(
            session,
            &setting_id,
            ArgOverrides::default().dirty(!theme_active),
            &mut created,
        );

        let Some((position, slot)) = declared else {
            continue;
        };
        let section = section_id(slot_key);
        session.controls.add_section(Section {
            id: section.clone(),
            title: slot.name.clone(),
            description: slot.description.clone(),
            priority: position as i64,
            panel: WIDGETS_PANEL.to_string(),
            slot_key: slot_key.to_string(),
        });
        session.controls.add_control(Control {
            id: setting_id.clone(),
            setting: setting_id,
            section: section.clone(),
            priority: items.len() as i64,
            kind: ControlKind::SlotAssignment {
                slot_key: slot_key.to_string(),
            },
        });

        for (index, raw_item_id) in items.iter().enumerate() {
            let Some(item) = env.registered_item(raw_item_id) else {
                debug!("item {raw_item_id} in slot {slot_key} is not loaded, skipping");
                continue;
            };
            let item_setting = item_setting_id(&item.identity);
            session.controls.add_control(Control {
                id: item_setting.clone(),
                setting: item_setting,
                section: section.clone(),
                priority: index as i64,
                kind: ControlKind::ItemForm {
                    label: item.name.clone(),
                    item_id: item.id.clone(),
                    kind_base: item.identity.kind_base.clone(),
                    width: item.width,
                    height: item.height,
                    is_wide: session.wide.is_wide(&item.identity),
                },
            });
        }
    }

    created
}

/// Preview every touched setting (unless persisting), then install the
/// draft merge on the slot-map read.
///
/// Returns the setting ids previewed by this call.
pub fn activate_previews(session: &mut CustomizeSession) -> Vec<String> {
    let mut previewed = Vec::new();
    if session.previews_enabled() {
        for id in &session.touched {
            if session.settings.preview(id, &session.drafts, &mut session.state) {
                previewed.push(id.clone());
            }
        }
    }

    let slot_drafts = session.settings.previewed_slot_drafts(&session.drafts);
    session
        .state
        .intercept_slot_map(Layer::DraftMerge, DRAFT_MERGE_INTERCEPT, move |mut map| {
            for (key, items) in &slot_drafts {
                map.set(key.clone(), items.clone());
            }
            map
        });
    previewed
}

fn ensure_setting(
    session: &mut CustomizeSession,
    id: &str,
    overrides: ArgOverrides,
    created: &mut Vec<String>,
) {
    if !session.settings.contains(id) {
        let args = session.resolver.build_args(id, overrides);
        if session.settings.add_setting(id, args) {
            created.push(id.to_string());
        }
    }
    session.touched.insert(id.to_string());
}
