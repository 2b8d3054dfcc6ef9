//! In-memory settings registry with draft previews and the save changeset.

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::{parse_item_setting_id, parse_slot_setting_id};
use crate::error::{CustomizeError, SanitizeError};
use crate::model::OLD_SLOT_MAP_DATA;
use crate::resolver::{SettingArgs, SettingType};
use crate::state::{EffectiveStateProvider, Layer};

/// Pending client edits keyed by setting id. Read-only for the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drafts(IndexMap<String, Value>);

impl Drafts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(input: &str) -> Result<Self, CustomizeError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| CustomizeError::DraftParse(e.to_string()))?;
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(CustomizeError::DraftParse(format!(
                "expected an object of setting id → value, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, setting_id: &str) -> Option<&Value> {
        self.0.get(setting_id)
    }

    pub fn contains(&self, setting_id: &str) -> bool {
        self.0.contains_key(setting_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Drafts {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub id: String,
    #[serde(flatten)]
    pub args: SettingArgs,
    pub previewed: bool,
}

impl Setting {
    pub fn setting_type(&self) -> SettingType {
        self.args.setting_type
    }
}

/// Value transforms keyed by setting type.
pub trait SettingHooks {
    /// Validate a draft on its way in. An error rejects the draft.
    fn sanitize(&self, setting: &Setting, value: &Value) -> Result<Value, SanitizeError>;

    /// Shape a value on its way out.
    fn unserialize(&self, _setting: &Setting, value: Value) -> Value {
        value
    }
}

/// Slot assignments must be lists (strings kept once, in order); item
/// instances must be objects; global variables pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl SettingHooks for DefaultHooks {
    fn sanitize(&self, setting: &Setting, value: &Value) -> Result<Value, SanitizeError> {
        match setting.setting_type() {
            SettingType::SlotAssignment => {
                let Value::Array(entries) = value else {
                    return Err(SanitizeError::new(
                        &setting.id,
                        format!("expected a list of item ids, got {}", json_kind(value)),
                    ));
                };
                let mut items: Vec<String> = Vec::with_capacity(entries.len());
                for entry in entries {
                    let Some(id) = entry.as_str() else { continue };
                    if !items.iter().any(|i| i == id) {
                        items.push(id.to_string());
                    }
                }
                Ok(Value::from(items))
            }
            SettingType::ItemInstance => match value {
                Value::Object(_) => Ok(value.clone()),
                // An empty list is how some clients encode an empty instance.
                Value::Array(a) if a.is_empty() => Ok(Value::Object(Map::new())),
                other => Err(SanitizeError::new(
                    &setting.id,
                    format!("expected an instance object, got {}", json_kind(other)),
                )),
            },
            SettingType::GlobalVariable => Ok(value.clone()),
        }
    }
}

/// Settings in registration order.
pub struct SettingsRegistry {
    settings: IndexMap<String, Setting>,
    hooks: Box<dyn SettingHooks>,
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::with_hooks(DefaultHooks)
    }

    pub fn with_hooks(hooks: impl SettingHooks + 'static) -> Self {
        Self {
            settings: IndexMap::new(),
            hooks: Box::new(hooks),
        }
    }

    /// No-op returning false when `id` is already registered.
    pub fn add_setting(&mut self, id: &str, args: SettingArgs) -> bool {
        if self.settings.contains_key(id) {
            return false;
        }
        debug!("add setting {id} ({})", args.setting_type);
        self.settings.insert(
            id.to_string(),
            Setting {
                id: id.to_string(),
                args,
                previewed: false,
            },
        );
        true
    }

    pub fn get_setting(&self, id: &str) -> Option<&Setting> {
        self.settings.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.settings.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.settings.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// The sanitized draft for `id`, or `None` when absent or rejected.
    pub fn accepted_draft(&self, id: &str, drafts: &Drafts) -> Option<Value> {
        let setting = self.settings.get(id)?;
        let raw = drafts.get(id)?;
        match self.hooks.sanitize(setting, raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("draft rejected: {e}");
                None
            }
        }
    }

    /// Substitute the draft for the persisted value from now on.
    ///
    /// Slot-assignment drafts are projected onto the persisted slot-map read,
    /// so every reader of the slot map sees them. Returns false if the
    /// setting is unknown or already previewed.
    pub fn preview(&mut self, id: &str, drafts: &Drafts, state: &mut EffectiveStateProvider) -> bool {
        let setting_type = match self.settings.get(id) {
            Some(setting) if !setting.previewed => setting.setting_type(),
            _ => return false,
        };
        let draft = self.accepted_draft(id, drafts);
        if let (Some(value), Some(slot_key)) = (draft, parse_slot_setting_id(id)) {
            if setting_type == SettingType::SlotAssignment {
                let slot_key = slot_key.to_string();
                let items = string_list(&value);
                state.intercept_persisted(Layer::SettingPreview, format!("preview:{id}"), move |mut stored| {
                    stored.slots.set(slot_key.clone(), items.clone());
                    stored
                });
            }
        }
        if let Some(setting) = self.settings.get_mut(id) {
            setting.previewed = true;
        }
        true
    }

    /// Slot assignments from previewed settings with an accepted draft.
    pub fn previewed_slot_drafts(&self, drafts: &Drafts) -> Vec<(String, Vec<String>)> {
        self.settings
            .values()
            .filter(|s| s.previewed && s.setting_type() == SettingType::SlotAssignment)
            .filter_map(|s| {
                let key = parse_slot_setting_id(&s.id)?;
                let value = self.accepted_draft(&s.id, drafts)?;
                Some((key.to_string(), string_list(&value)))
            })
            .collect()
    }

    /// Current value: the draft when previewed, else the persisted value.
    pub fn value(&self, id: &str, drafts: &Drafts, state: &EffectiveStateProvider) -> Option<Value> {
        let setting = self.settings.get(id)?;
        let value = setting
            .previewed
            .then(|| self.accepted_draft(id, drafts))
            .flatten()
            .unwrap_or_else(|| persisted_value(setting, state));
        Some(self.hooks.unserialize(setting, value))
    }

    /// What the save pipeline persists: accepted drafts, then dirty
    /// settings at their current value, in registration order.
    pub fn changeset(&self, drafts: &Drafts, state: &EffectiveStateProvider) -> IndexMap<String, Value> {
        let mut out = IndexMap::new();
        for setting in self.settings.values() {
            if let Some(value) = self.accepted_draft(&setting.id, drafts) {
                out.insert(setting.id.clone(), self.hooks.unserialize(setting, value));
            } else if setting.args.dirty {
                if let Some(value) = self.value(&setting.id, drafts, state) {
                    out.insert(setting.id.clone(), value);
                }
            }
        }
        out
    }
}

impl std::fmt::Debug for SettingsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRegistry")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn persisted_value(setting: &Setting, state: &EffectiveStateProvider) -> Value {
    let found = match setting.setting_type() {
        SettingType::SlotAssignment => parse_slot_setting_id(&setting.id).and_then(|key| {
            state
                .read_persisted_slot_map()
                .slots
                .get(key)
                .map(|items| Value::from(items.to_vec()))
        }),
        SettingType::ItemInstance => parse_item_setting_id(&setting.id)
            .and_then(|item| state.persisted_instance(&item.to_string()).cloned()),
        SettingType::GlobalVariable if setting.id == OLD_SLOT_MAP_DATA => {
            state.old_slot_map_data().map(|map| map.to_value())
        }
        SettingType::GlobalVariable => None,
    };
    found.unwrap_or_else(|| setting.args.default.clone())
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|entries| entries.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
