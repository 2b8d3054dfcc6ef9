use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reserved slot holding inactive items. Always present in a working map.
pub const UNASSIGNED_SLOT: &str = "unassigned";

/// Prefix of slots left behind by a previous theme; their items are treated
/// as unassigned on reconcile.
pub const ORPHANED_SLOT_PREFIX: &str = "orphaned_";

/// Synthetic global-variable setting carrying the previous theme's slot map
/// across a theme switch.
pub const OLD_SLOT_MAP_DATA: &str = "old_slot_map_data";

/// Format marker attached to a recomputed slot map.
pub const SLOT_MAP_ARRAY_VERSION: u32 = 3;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Identity of an item (widget). `instance_number` is `None` for singleton kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId {
    pub kind_base: String,
    pub instance_number: Option<u64>,
}

impl ItemId {
    pub fn singleton(kind_base: impl Into<String>) -> Self {
        Self {
            kind_base: kind_base.into(),
            instance_number: None,
        }
    }

    pub fn instance(kind_base: impl Into<String>, number: u64) -> Self {
        Self {
            kind_base: kind_base.into(),
            instance_number: Some(number),
        }
    }
}

/// Displays the combined raw id (`text-2`, `search`).
impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance_number {
            Some(n) => write!(f, "{}-{}", self.kind_base, n),
            None => write!(f, "{}", self.kind_base),
        }
    }
}

/// An item kind the host environment knows how to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemKind {
    pub kind_base: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Multi-instance kinds materialize one item per instance number.
    #[serde(default = "default_multi")]
    pub multi: bool,
}

fn default_width() -> u32 {
    250
}

fn default_height() -> u32 {
    200
}

fn default_multi() -> bool {
    true
}

/// An item loaded by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredItem {
    /// Combined raw id, as stored in slot maps.
    pub id: String,
    pub identity: ItemId,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl RegisteredItem {
    pub fn new(kind: &ItemKind, instance_number: Option<u64>) -> Self {
        let identity = ItemId {
            kind_base: kind.kind_base.clone(),
            instance_number,
        };
        Self {
            id: identity.to_string(),
            identity,
            name: kind.name.clone(),
            width: kind.width,
            height: kind.height,
        }
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// A slot (sidebar) declared by the active theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSlot {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl DeclaredSlot {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Slot key → ordered raw item ids. Key order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlotMap(IndexMap<String, Vec<String>>);

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    /// Items of `key`, empty when the key is absent.
    pub fn items(&self, key: &str) -> &[String] {
        self.get(key).unwrap_or(&[])
    }

    /// Insert or replace. An existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, items: Vec<String>) {
        self.0.insert(key.into(), items);
    }

    pub fn entry(&mut self, key: &str) -> &mut Vec<String> {
        self.0.entry(key.to_string()).or_default()
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.0.values().any(|items| items.iter().any(|i| i == item_id))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<String>)> {
        self.0.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other`: its values replace ours, new keys are appended.
    pub fn merge(&mut self, other: &SlotMap) {
        for (key, items) in &other.0 {
            self.0.insert(key.clone(), items.clone());
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Lenient conversion: non-array entries (a legacy `array_version`, say)
    /// are absent, non-string members are dropped.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => map
                .iter()
                .filter_map(|(key, v)| item_list(v).map(|items| (key.clone(), items)))
                .collect(),
            _ => Self::default(),
        }
    }
}

impl FromIterator<(String, Vec<String>)> for SlotMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for SlotMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(key, v)| item_list(&v).map(|items| (key, items)))
            .collect())
    }
}

fn item_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect()
    })
}

/// A slot map as it sits in storage, with its optional format marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoredSlotMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_version: Option<u32>,
    #[serde(flatten)]
    pub slots: SlotMap,
}

impl StoredSlotMap {
    pub fn new(slots: SlotMap) -> Self {
        Self {
            array_version: None,
            slots,
        }
    }

    pub fn versioned(slots: SlotMap) -> Self {
        Self {
            array_version: Some(SLOT_MAP_ARRAY_VERSION),
            slots,
        }
    }

    /// Drop the format marker.
    pub fn into_slots(self) -> SlotMap {
        self.slots
    }
}
