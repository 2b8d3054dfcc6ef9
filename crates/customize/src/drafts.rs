//! First stage: materialize settings for incoming drafts.

use indexmap::IndexSet;
use log::debug;

use crate::codec::item_setting_id_for;
use crate::pipeline::CustomizeSession;
use crate::resolver::ArgOverrides;

/// Create a setting for every widget-related draft id (plus the out-of-band
/// updated item) and preview it unless the session is persisting.
///
/// Returns the ids created by this call, in first-seen order.
pub fn discover_drafts(session: &mut CustomizeSession) -> Vec<String> {
    let mut candidates: IndexSet<String> = session.drafts.ids().map(str::to_string).collect();
    if let Some(raw) = &session.context.update_item {
        candidates.insert(item_setting_id_for(raw));
    }

    let mut created = Vec::new();
    for id in candidates {
        if session.resolver.classify(&id).is_none() {
            debug!("draft {id} is not an item or slot setting, skipping");
            continue;
        }
        if session.settings.contains(&id) {
            continue;
        }
        let args = session.resolver.build_args(&id, ArgOverrides::default());
        if session.settings.add_setting(&id, args) {
            created.push(id);
        }
    }

    if session.previews_enabled() {
        for id in &created {
            session.settings.preview(id, &session.drafts, &mut session.state);
        }
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{SessionContext, SessionMode};
    use crate::settings::Drafts;
    use crate::state::PersistedState;
    use serde_json::json;

    fn session(mode: SessionMode, update_item: Option<&str>) -> CustomizeSession {
        let drafts: Drafts = [
            ("blogname".to_string(), json!("Site")),
            ("item_text[4]".to_string(), json!({"title": "New"})),
            ("slots[sidebar-1]".to_string(), json!(["text-4"])),
        ]
        .into_iter()
        .collect();
        let context = SessionContext {
            target_theme: "twentyten".into(),
            mode,
            async_request: false,
            update_item: update_item.map(str::to_string),
        };
        let store = PersistedState {
            active_theme: "twentyten".into(),
            ..Default::default()
        };
        CustomizeSession::new(context, store, drafts)
    }

    #[test]
    fn creates_and_previews_widget_drafts() {
        let mut session = session(SessionMode::Preview, Some("text-4"));
        let created = discover_drafts(&mut session);
        assert_eq!(created, vec!["item_text[4]", "slots[sidebar-1]"]);
        assert!(!session.settings.contains("blogname"));
        assert!(session.settings.iter().all(|s| s.previewed));
        assert_eq!(session.slot_map().items("sidebar-1"), ["text-4".to_string()]);
    }

    #[test]
    fn update_item_without_draft_is_registered() {
        let mut session = session(SessionMode::Preview, Some("rss-9"));
        let created = discover_drafts(&mut session);
        assert_eq!(created.last().map(String::as_str), Some("item_rss[9]"));
        assert!(discover_drafts(&mut session).is_empty());
    }

    #[test]
    fn persist_mode_skips_preview() {
        let mut session = session(SessionMode::Persist, None);
        discover_drafts(&mut session);
        assert_eq!(session.settings.len(), 2);
        assert!(session.settings.iter().all(|s| !s.previewed));
        assert!(session.slot_map().items("sidebar-1").is_empty());
    }
}
