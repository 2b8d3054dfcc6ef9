use std::path::PathBuf;

use serde_json::json;

use widgetry_customize::controls::ControlKind;
use widgetry_customize::model::{OLD_SLOT_MAP_DATA, UNASSIGNED_SLOT};
use widgetry_customize::pipeline::{PipelineReport, Stage};
use widgetry_customize::register::{section_id, WIDGETS_PANEL};
use widgetry_customize::state::Layer;
use widgetry_customize::{
    run, CustomizeSession, Drafts, Environment, SessionContext, SessionMode, SessionReport,
    SiteConfig,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_site(name: &str) -> SiteConfig {
    let path = fixtures_dir().join(name);
    let toml = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    SiteConfig::from_toml(&toml).unwrap()
}

fn drafts(pairs: &[(&str, serde_json::Value)]) -> Drafts {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn start(
    site: &SiteConfig,
    context: SessionContext,
    drafts: Drafts,
) -> (CustomizeSession, Environment, PipelineReport) {
    let mut env = site.environment(&context.target_theme).unwrap();
    let mut session = CustomizeSession::new(context, site.persisted_state(), drafts);
    let report = run(&mut session, &mut env);
    (session, env, report)
}

fn items(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

fn controls_in(session: &CustomizeSession, slot_key: &str) -> Vec<(String, i64)> {
    session
        .controls
        .controls_in(&section_id(slot_key))
        .iter()
        .map(|c| (c.id.clone(), c.priority))
        .collect()
}

// -------------------------------------------------------------------------
// Registration
// -------------------------------------------------------------------------

#[test]
fn controls_follow_slot_order() {
    let site = load_site("site.toml");
    let (session, _, _) = start(&site, SessionContext::new("twentyten"), Drafts::new());

    assert_eq!(
        controls_in(&session, "sidebar-1"),
        vec![
            ("item_text[2]".to_string(), 0),
            ("item_rss[3]".to_string(), 1),
            ("item_search".to_string(), 2),
            ("slots[sidebar-1]".to_string(), 3),
        ]
    );
    assert_eq!(controls_in(&session, "footer"), vec![("slots[footer]".to_string(), 0)]);

    let panel = session.controls.panel(WIDGETS_PANEL).unwrap();
    assert_eq!(panel.priority, 110);
    assert!(panel.active);
    let sections: Vec<_> = session
        .controls
        .sections_in(WIDGETS_PANEL)
        .iter()
        .map(|s| (s.title.clone(), s.priority))
        .collect();
    assert_eq!(
        sections,
        vec![
            ("Primary Widget Area".to_string(), 0),
            ("Footer Widget Area".to_string(), 1),
        ]
    );
}

#[test]
fn registration_is_idempotent() {
    let site = load_site("site.toml");
    let (mut session, mut env, first) = start(&site, SessionContext::new("twentyten"), Drafts::new());
    let settings: Vec<String> = session.settings.ids().map(str::to_string).collect();
    let controls = serde_json::to_value(session.controls.snapshot()).unwrap();
    assert!(!first.outcome(Stage::Register).unwrap().settings.is_empty());

    let second = run(&mut session, &mut env);
    assert!(second.outcome(Stage::Register).unwrap().settings.is_empty());
    assert!(second.outcome(Stage::ActivatePreviews).unwrap().settings.is_empty());
    assert_eq!(session.settings.ids().collect::<Vec<_>>(), settings);
    assert_eq!(serde_json::to_value(session.controls.snapshot()).unwrap(), controls);
    assert_eq!(session.state.intercepts().slot_map.len(), 1);
}

#[test]
fn orphaned_item_has_setting_but_no_control() {
    let site = load_site("site.toml");
    let (session, _, _) = start(&site, SessionContext::new("twentyten"), Drafts::new());
    assert!(session.settings.contains("item_text[7]"));
    assert!(session.controls.control("item_text[7]").is_none());
    // Placed only in the unassigned slot.
    assert!(session.settings.contains("item_rss[5]"));
    assert!(session.controls.control("item_rss[5]").is_none());
}

#[test]
fn unknown_slot_key_is_skipped() {
    let site = load_site("site.toml");
    let (session, _, _) = start(&site, SessionContext::new("twentyten"), Drafts::new());
    assert!(session.controls.section(&section_id("legacy-area")).is_none());
    assert!(!session.settings.contains("slots[legacy-area]"));
    assert!(session.settings.contains("item_text[4]"));
    assert!(session.controls.control("item_text[4]").is_none());
    assert_eq!(session.controls.section_count(), 2);
}

#[test]
fn item_controls_carry_display_hints() {
    let site = load_site("site.toml");
    let (session, _, _) = start(&site, SessionContext::new("twentyten"), Drafts::new());
    match &session.controls.control("item_text[2]").unwrap().kind {
        ControlKind::ItemForm {
            label,
            width,
            height,
            is_wide,
            ..
        } => {
            assert_eq!(label, "Text");
            assert_eq!((*width, *height), (400, 350));
            assert!(!is_wide);
        }
        other => panic!("unexpected control kind {other:?}"),
    }
}

// -------------------------------------------------------------------------
// Drafts
// -------------------------------------------------------------------------

#[test]
fn slot_draft_wins_for_every_reader() {
    let site = load_site("site.toml");
    let pending = drafts(&[("slots[sidebar-1]", json!(["rss-3", "text-2"]))]);
    let (session, _, _) = start(&site, SessionContext::new("twentyten"), pending);

    let expected = vec!["rss-3", "text-2"];
    assert_eq!(items(session.slot_map().items("sidebar-1")), expected);
    assert_eq!(
        items(session.state.read_persisted_slot_map().slots.items("sidebar-1")),
        expected
    );
    assert_eq!(session.setting_value("slots[sidebar-1]"), Some(json!(["rss-3", "text-2"])));
    // Controls are built from the draft order.
    assert_eq!(
        controls_in(&session, "sidebar-1"),
        vec![
            ("item_rss[3]".to_string(), 0),
            ("item_text[2]".to_string(), 1),
            ("slots[sidebar-1]".to_string(), 2),
        ]
    );
    // Storage is untouched.
    assert_eq!(
        items(session.state.stored_slot_map().slots.items("sidebar-1")),
        vec!["text-2", "rss-3", "search"]
    );
}

#[test]
fn drafted_item_is_loaded_and_placed() {
    let site = load_site("site.toml");
    let pending = drafts(&[
        ("item_text[8]", json!({"title": "Fresh"})),
        ("slots[footer]", json!(["text-8"])),
    ]);
    let (session, env, report) = start(&site, SessionContext::new("twentyten"), pending);

    assert_eq!(
        report.outcome(Stage::DiscoverDrafts).unwrap().settings,
        vec!["item_text[8]", "slots[footer]"]
    );
    assert!(widgetry_customize::EnvironmentProvider::registered_item(&env, "text-8").is_some());
    assert_eq!(
        controls_in(&session, "footer"),
        vec![("item_text[8]".to_string(), 0), ("slots[footer]".to_string(), 1)]
    );
    assert_eq!(session.setting_value("item_text[8]"), Some(json!({"title": "Fresh"})));
}

#[test]
fn rejected_draft_shows_persisted_value() {
    let site = load_site("site.toml");
    let pending = drafts(&[("slots[sidebar-1]", json!("text-2"))]);
    let (session, _, _) = start(&site, SessionContext::new("twentyten"), pending);
    assert_eq!(
        items(session.slot_map().items("sidebar-1")),
        vec!["text-2", "rss-3", "search"]
    );
    assert!(session.changeset().is_empty());
}

#[test]
fn persist_mode_previews_nothing() {
    let site = load_site("site.toml");
    let pending = drafts(&[("slots[sidebar-1]", json!(["search"]))]);
    let mut context = SessionContext::new("twentyten");
    context.mode = SessionMode::Persist;
    let (session, _, report) = start(&site, context, pending);

    assert!(session.settings.iter().all(|s| !s.previewed));
    assert!(report.outcome(Stage::ActivatePreviews).unwrap().settings.is_empty());
    assert_eq!(
        items(session.slot_map().items("sidebar-1")),
        vec!["text-2", "rss-3", "search"]
    );
    let changeset = session.changeset();
    assert_eq!(changeset.len(), 1);
    assert_eq!(changeset["slots[sidebar-1]"], json!(["search"]));
}

#[test]
fn update_item_request_registers_its_setting() {
    let site = load_site("site.toml");
    let mut context = SessionContext::new("twentyten");
    context.update_item = Some("rss-12".to_string());
    let (session, _, report) = start(&site, context, Drafts::new());
    assert_eq!(report.outcome(Stage::DiscoverDrafts).unwrap().settings, vec!["item_rss[12]"]);
    assert!(session.settings.get_setting("item_rss[12]").unwrap().previewed);
}

// -------------------------------------------------------------------------
// Theme switch
// -------------------------------------------------------------------------

#[test]
fn theme_switch_seeds_matching_slot() {
    let site = load_site("theme_switch.toml");
    let (session, _, _) = start(&site, SessionContext::new("minimal"), Drafts::new());

    assert!(session.theme_switch.is_some());
    assert_eq!(items(session.slot_map().items("sidebar-1")), vec!["text-2", "rss-3"]);
    let old = session.settings.get_setting(OLD_SLOT_MAP_DATA).unwrap();
    assert!(old.args.dirty);
    assert!(session.settings.get_setting("slots[sidebar-1]").unwrap().args.dirty);
    assert_eq!(session.state.read_persisted_slot_map().array_version, Some(3));

    let changeset = session.changeset();
    assert_eq!(changeset[OLD_SLOT_MAP_DATA], json!({"sidebar-1": ["text-2", "rss-3"]}));
    assert_eq!(changeset["slots[sidebar-1]"], json!(["text-2", "rss-3"]));
}

#[test]
fn theme_switch_maps_by_name_and_restores_snapshot() {
    let site = load_site("site.toml");
    let (session, _, _) = start(&site, SessionContext::new("twentyeleven"), Drafts::new());

    let map = session.slot_map();
    assert_eq!(
        map.keys().collect::<Vec<_>>(),
        vec![UNASSIGNED_SLOT, "main-sidebar", "footer-one"]
    );
    assert_eq!(items(map.items("main-sidebar")), vec!["text-2", "rss-3", "search"]);
    assert_eq!(items(map.items("footer-one")), vec!["slider-2", "text-4"]);
    assert_eq!(items(map.items(UNASSIGNED_SLOT)), vec!["text-7", "rss-5"]);

    let old = session.state.old_slot_map_data().unwrap();
    assert_eq!(items(old.items("legacy-area")), vec!["text-4"]);
    assert_eq!(
        controls_in(&session, "footer-one"),
        vec![
            ("item_slider[2]".to_string(), 0),
            ("item_text[4]".to_string(), 1),
            ("slots[footer-one]".to_string(), 2),
        ]
    );
}

#[test]
fn slot_draft_wins_over_theme_switch() {
    let site = load_site("theme_switch.toml");
    let pending = drafts(&[("slots[sidebar-1]", json!(["rss-3"]))]);
    let (session, _, _) = start(&site, SessionContext::new("minimal"), pending);
    assert_eq!(items(session.slot_map().items("sidebar-1")), vec!["rss-3"]);
    let labels: Vec<Layer> = session
        .state
        .intercepts()
        .persisted_slot_map
        .iter()
        .map(|(layer, _)| *layer)
        .collect();
    assert_eq!(labels, vec![Layer::ThemeSwitch, Layer::SettingPreview]);
}

#[test]
fn async_request_never_switches() {
    let site = load_site("theme_switch.toml");
    let mut context = SessionContext::new("minimal");
    context.async_request = true;
    let (session, _, _) = start(&site, context, Drafts::new());
    assert!(session.theme_switch.is_none());
    assert_eq!(session.state.old_slot_map_data(), None);
    // Still not the active theme, so the old map setting exists.
    assert!(session.settings.contains(OLD_SLOT_MAP_DATA));
}

// -------------------------------------------------------------------------
// Read intercepts, tally, report
// -------------------------------------------------------------------------

#[test]
fn external_intercepts_run_after_draft_merge() {
    let site = load_site("site.toml");
    let pending = drafts(&[("slots[footer]", json!(["text-2"]))]);
    let (mut session, _, _) = start(&site, SessionContext::new("twentyten"), pending);
    session
        .state
        .intercept_slot_map(Layer::External, "hide-footer", |mut map| {
            map.set("footer", Vec::new());
            map
        });
    assert!(session.slot_map().items("footer").is_empty());
    let order: Vec<String> = session
        .state
        .intercepts()
        .slot_map
        .into_iter()
        .map(|(_, label)| label)
        .collect();
    assert_eq!(order, vec!["draft_merge", "hide-footer"]);
}

#[test]
fn tally_records_declared_slots_only() {
    let site = load_site("site.toml");
    let (mut session, _, _) = start(&site, SessionContext::new("twentyten"), Drafts::new());
    let map = session.slot_map();
    for key in ["sidebar-1", "footer", "legacy-area"] {
        let list = map.items(key);
        if session.tally.on_has_active_items(key, !list.is_empty()) && key == "sidebar-1" {
            session.tally.on_render_slot(key, true);
            for id in list {
                session.tally.on_render_item(id);
            }
        }
    }
    let snap = session.tally.snapshot();
    assert_eq!(snap.declared_slots, vec!["sidebar-1", "footer"]);
    assert_eq!(snap.queried_slots, vec!["sidebar-1", "footer"]);
    assert_eq!(snap.rendered_slots, vec!["sidebar-1"]);
    assert_eq!(snap.rendered_items, vec!["text-2", "rss-3", "search"]);
}

#[test]
fn report_serializes_session() {
    let site = load_site("site.toml");
    let pending = drafts(&[("item_text[2]", json!({"title": "Draft"}))]);
    let (session, env, pipeline) = start(&site, SessionContext::new("twentyten"), pending);
    let report = SessionReport::build(&session, &env, pipeline, false);
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["meta"]["target_theme"], "twentyten");
    assert_eq!(value["meta"]["theme_switched"], false);
    assert_eq!(value["meta"]["mode"], "preview");
    assert_eq!(value["stages"].as_array().unwrap().len(), 5);
    assert_eq!(value["changeset"]["item_text[2]"]["title"], "Draft");
    assert_eq!(value["panels"][0]["id"], "widgets");
    assert!(value.get("tally").is_none());
    assert!(value.get("old_slot_map_data").is_none());

    let kinds = value["available_kinds"].as_array().unwrap();
    let slider = kinds.iter().find(|k| k["kind_base"] == "slider").unwrap();
    assert_eq!(slider["next_instance_number"], 3);
    assert_eq!(slider["is_wide"], true);
}
