//! Dynamic setting resolution: which kind of setting an incoming id names,
//! and what it should be constructed with.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::codec::{parse_item_setting_id, parse_slot_setting_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    ItemInstance,
    SlotAssignment,
    GlobalVariable,
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemInstance => write!(f, "item_instance"),
            Self::SlotAssignment => write!(f, "slot_assignment"),
            Self::GlobalVariable => write!(f, "global_variable"),
        }
    }
}

/// Construction parameters for a setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingArgs {
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub default: Value,
    /// Treated as carrying a draft even without explicit input.
    pub dirty: bool,
}

/// Caller overrides for [`SettingResolver::build_args`]. Set fields win.
#[derive(Debug, Clone, Default)]
pub struct ArgOverrides {
    pub setting_type: Option<SettingType>,
    pub default: Option<Value>,
    pub dirty: Option<bool>,
}

impl ArgOverrides {
    pub fn setting_type(mut self, setting_type: SettingType) -> Self {
        self.setting_type = Some(setting_type);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }
}

/// Classifies setting ids, memoizing per id for the life of the session.
#[derive(Debug, Default)]
pub struct SettingResolver {
    cache: HashMap<String, Option<SettingType>>,
}

impl SettingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot-assignment pattern first, then item-instance. `None` means the id
    /// is not widget-related and callers skip it.
    pub fn classify(&mut self, setting_id: &str) -> Option<SettingType> {
        if let Some(hit) = self.cache.get(setting_id) {
            return *hit;
        }
        let resolved = classify_uncached(setting_id);
        self.cache.insert(setting_id.to_string(), resolved);
        resolved
    }

    /// Memoized answer for `setting_id`, if it was classified before.
    pub fn cached(&self, setting_id: &str) -> Option<Option<SettingType>> {
        self.cache.get(setting_id).copied()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn build_args(&mut self, setting_id: &str, overrides: ArgOverrides) -> SettingArgs {
        let setting_type = overrides
            .setting_type
            .or_else(|| self.classify(setting_id))
            .unwrap_or(SettingType::GlobalVariable);
        SettingArgs {
            setting_type,
            default: overrides
                .default
                .unwrap_or_else(|| default_value(setting_type)),
            dirty: overrides.dirty.unwrap_or(false),
        }
    }
}

fn classify_uncached(setting_id: &str) -> Option<SettingType> {
    if parse_slot_setting_id(setting_id).is_some() {
        Some(SettingType::SlotAssignment)
    } else if parse_item_setting_id(setting_id).is_some() {
        Some(SettingType::ItemInstance)
    } else {
        None
    }
}

pub fn default_value(setting_type: SettingType) -> Value {
    match setting_type {
        SettingType::SlotAssignment => json!([]),
        SettingType::ItemInstance | SettingType::GlobalVariable => json!({}),
    }
}
