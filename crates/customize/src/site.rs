use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::codec::parse_item_id;
use crate::environment::Environment;
use crate::error::CustomizeError;
use crate::model::{DeclaredSlot, ItemKind, SlotMap, StoredSlotMap, ORPHANED_SLOT_PREFIX, UNASSIGNED_SLOT};
use crate::state::PersistedState;

// ---------------------------------------------------------------------------
// Site description
// ---------------------------------------------------------------------------

/// A site: item kinds, themes with their declared slots, and what storage
/// currently holds.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kinds: Vec<ItemKind>,
    #[serde(default)]
    pub themes: IndexMap<String, ThemeConfig>,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfig {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<DeclaredSlot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub active_theme: String,
    /// Stored slot map. Non-list entries (a legacy `array_version`) are
    /// ignored.
    #[serde(default)]
    pub slot_map: SlotMap,
    /// Raw item id → instance payload.
    #[serde(default)]
    pub instances: IndexMap<String, Value>,
    /// Slot maps saved when a theme was last active.
    #[serde(default)]
    pub theme_snapshots: IndexMap<String, SlotMap>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SiteConfig {
    pub fn from_toml(input: &str) -> Result<Self, CustomizeError> {
        let config: SiteConfig =
            toml::from_str(input).map_err(|e| CustomizeError::SiteParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CustomizeError> {
        let mut seen_kinds = HashSet::new();
        for kind in &self.kinds {
            let base = kind.kind_base.as_str();
            if base.is_empty() || base.contains(|c: char| c == '[' || c == ']') {
                return Err(CustomizeError::SiteValidation(format!(
                    "invalid kind_base '{base}'"
                )));
            }
            if !seen_kinds.insert(base) {
                return Err(CustomizeError::SiteValidation(format!(
                    "duplicate kind_base '{base}'"
                )));
            }
            // A singleton's raw id is its kind_base and must not read as an instance.
            if !kind.multi && parse_item_id(base).instance_number.is_some() {
                return Err(CustomizeError::SiteValidation(format!(
                    "single-instance kind '{base}' must not end in a number"
                )));
            }
        }

        for (theme_id, theme) in &self.themes {
            let mut seen_slots = HashSet::new();
            for slot in &theme.slots {
                let key = slot.key.as_str();
                if key.is_empty() {
                    return Err(CustomizeError::SiteValidation(format!(
                        "theme '{theme_id}': empty slot key"
                    )));
                }
                if key == UNASSIGNED_SLOT || key.starts_with(ORPHANED_SLOT_PREFIX) {
                    return Err(CustomizeError::SiteValidation(format!(
                        "theme '{theme_id}': slot key '{key}' is reserved"
                    )));
                }
                if !seen_slots.insert(key) {
                    return Err(CustomizeError::SiteValidation(format!(
                        "theme '{theme_id}': duplicate slot key '{key}'"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn theme(&self, theme_id: &str) -> Result<&ThemeConfig, CustomizeError> {
        self.themes
            .get(theme_id)
            .ok_or_else(|| CustomizeError::UnknownTheme(theme_id.to_string()))
    }

    /// The environment as it looks with `theme_id` active. Items are not
    /// loaded yet.
    pub fn environment(&self, theme_id: &str) -> Result<Environment, CustomizeError> {
        let theme = self.theme(theme_id)?;
        Ok(Environment::new(
            self.kinds.clone(),
            theme.slots.clone(),
            self.store.instances.keys().cloned().collect(),
        ))
    }

    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            active_theme: self.store.active_theme.clone(),
            slot_map: StoredSlotMap::new(self.store.slot_map.clone()),
            instances: self.store.instances.clone(),
            theme_snapshots: self.store.theme_snapshots.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentProvider;

    const SITE: &str = r#"
name = "Demo"

[[kinds]]
kind_base = "text"
name = "Text"
width = 400

[[kinds]]
kind_base = "search"
name = "Search"
multi = false

[themes.twentyten]
name = "Twenty Ten"

[[themes.twentyten.slots]]
key = "sidebar-1"
name = "Primary Widget Area"
description = "The primary widget area"

[store]
active_theme = "twentyten"

[store.slot_map]
array_version = 3
unassigned = []
sidebar-1 = ["text-2", "search"]

[store.instances]
"text-2" = { title = "Hello", text = "World" }
"#;

    #[test]
    fn parse_site() {
        let site = SiteConfig::from_toml(SITE).unwrap();
        assert_eq!(site.name, "Demo");
        assert_eq!(site.kinds[0].width, 400);
        assert_eq!(site.kinds[0].height, 200);
        assert!(site.kinds[0].multi);
        assert!(!site.kinds[1].multi);
        assert!(!site.store.slot_map.contains_key("array_version"));
        assert_eq!(site.store.instances["text-2"]["title"], "Hello");

        let state = site.persisted_state();
        assert_eq!(state.active_theme, "twentyten");
        assert_eq!(state.slot_map.array_version, None);
    }

    #[test]
    fn environment_for_theme() {
        let site = SiteConfig::from_toml(SITE).unwrap();
        let mut env = site.environment("twentyten").unwrap();
        env.load(&[]);
        let ids: Vec<_> = env.registered_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["text-2", "search"]);
        assert_eq!(env.declared_slots()[0].description, "The primary widget area");

        let err = site.environment("missing").unwrap_err();
        assert!(matches!(err, CustomizeError::UnknownTheme(t) if t == "missing"));
    }

    #[test]
    fn reserved_slot_key_rejected() {
        let input = r#"
[themes.t]
name = "T"
[[themes.t.slots]]
key = "unassigned"
name = "Nope"
"#;
        let err = SiteConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn duplicate_slot_key_rejected() {
        let input = r#"
[themes.t]
name = "T"
[[themes.t.slots]]
key = "a"
name = "A"
[[themes.t.slots]]
key = "a"
name = "A again"
"#;
        let err = SiteConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate slot key"));
    }

    #[test]
    fn numbered_singleton_rejected() {
        let input = r#"
[[kinds]]
kind_base = "calendar-2"
name = "Calendar"
multi = false
"#;
        assert!(matches!(
            SiteConfig::from_toml(input),
            Err(CustomizeError::SiteValidation(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            SiteConfig::from_toml("kinds = 5"),
            Err(CustomizeError::SiteParse(_))
        ));
    }
}
