//! Setting-id codec.
//!
//! Item settings are `item_<kind_base>` or `item_<kind_base>[<n>]`, slot
//! settings are `slots[<slot_key>]`. Raw item ids are `<kind_base>-<n>` or a
//! bare `<kind_base>` for singleton kinds.

use crate::model::ItemId;

const ITEM_PREFIX: &str = "item_";
const SLOT_PREFIX: &str = "slots[";

pub fn slot_setting_id(slot_key: &str) -> String {
    format!("{SLOT_PREFIX}{slot_key}]")
}

pub fn item_setting_id(item: &ItemId) -> String {
    match item.instance_number {
        Some(n) => format!("{ITEM_PREFIX}{}[{n}]", item.kind_base),
        None => format!("{ITEM_PREFIX}{}", item.kind_base),
    }
}

/// Setting id for a raw item id such as `text-2`.
pub fn item_setting_id_for(raw_item_id: &str) -> String {
    item_setting_id(&parse_item_id(raw_item_id))
}

/// Split `<kind_base>-<n>` on its trailing numeric segment.
///
/// A trailing segment that is not a canonical number (`text-02`, `text-`)
/// leaves the whole id as a singleton kind base, so re-encoding is lossless.
pub fn parse_item_id(raw_item_id: &str) -> ItemId {
    if let Some((base, suffix)) = raw_item_id.rsplit_once('-') {
        if !base.is_empty() {
            if let Some(n) = parse_canonical_number(suffix) {
                return ItemId::instance(base, n);
            }
        }
    }
    ItemId::singleton(raw_item_id)
}

/// Inverse of [`item_setting_id`].
pub fn parse_item_setting_id(setting_id: &str) -> Option<ItemId> {
    let rest = setting_id.strip_prefix(ITEM_PREFIX)?;
    let (name, number) = match rest.strip_suffix(']').and_then(|r| r.rsplit_once('[')) {
        Some((name, digits)) => (name, Some(parse_canonical_number(digits)?)),
        None => (rest, None),
    };
    if name.is_empty() || name.contains(|c: char| c == '[' || c == ']') {
        return None;
    }
    Some(ItemId {
        kind_base: name.to_string(),
        instance_number: number,
    })
}

/// Slot key of a `slots[<key>]` setting id.
pub fn parse_slot_setting_id(setting_id: &str) -> Option<&str> {
    setting_id
        .strip_prefix(SLOT_PREFIX)?
        .strip_suffix(']')
        .filter(|key| !key.is_empty())
}

/// Non-negative decimal without leading zeros.
fn parse_canonical_number(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_setting_round_trip() {
        let id = slot_setting_id("sidebar-1");
        assert_eq!(id, "slots[sidebar-1]");
        assert_eq!(parse_slot_setting_id(&id), Some("sidebar-1"));
        assert_eq!(parse_slot_setting_id("slots[]"), None);
        assert_eq!(parse_slot_setting_id("slots[x"), None);
    }

    #[test]
    fn item_setting_ids() {
        assert_eq!(item_setting_id(&ItemId::instance("text", 2)), "item_text[2]");
        assert_eq!(item_setting_id(&ItemId::singleton("search")), "item_search");
        assert_eq!(item_setting_id_for("recent-posts-3"), "item_recent-posts[3]");
    }

    #[test]
    fn parse_raw_ids() {
        assert_eq!(parse_item_id("text-2"), ItemId::instance("text", 2));
        assert_eq!(parse_item_id("recent-posts-14"), ItemId::instance("recent-posts", 14));
        assert_eq!(parse_item_id("recent-posts"), ItemId::singleton("recent-posts"));
        assert_eq!(parse_item_id("search"), ItemId::singleton("search"));
        assert_eq!(parse_item_id("text-0"), ItemId::instance("text", 0));
    }

    #[test]
    fn parse_raw_ids_without_canonical_suffix() {
        assert_eq!(parse_item_id("text-02"), ItemId::singleton("text-02"));
        assert_eq!(parse_item_id("text-"), ItemId::singleton("text-"));
        assert_eq!(parse_item_id("-5"), ItemId::singleton("-5"));
        assert_eq!(
            parse_item_id("huge-99999999999999999999999"),
            ItemId::singleton("huge-99999999999999999999999")
        );
    }

    #[test]
    fn parse_setting_ids() {
        assert_eq!(parse_item_setting_id("item_text[2]"), Some(ItemId::instance("text", 2)));
        assert_eq!(parse_item_setting_id("item_search"), Some(ItemId::singleton("search")));
        assert_eq!(parse_item_setting_id("item_"), None);
        assert_eq!(parse_item_setting_id("item_text[x]"), None);
        assert_eq!(parse_item_setting_id("item_text[02]"), None);
        assert_eq!(parse_item_setting_id("item_te]xt"), None);
        assert_eq!(parse_item_setting_id("slots[sidebar-1]"), None);
    }
}
