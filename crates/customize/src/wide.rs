//! "Wide" item classification.
//!
//! Every kind is wide unless it is one of the built-in kinds below. One
//! filter may override the answer; it receives the default.

use std::collections::HashSet;
use std::fmt;

use crate::model::ItemId;

pub const CORE_KIND_BASES: &[&str] = &[
    "archives",
    "calendar",
    "categories",
    "custom_html",
    "links",
    "media_audio",
    "media_gallery",
    "media_image",
    "media_video",
    "meta",
    "nav_menu",
    "pages",
    "recent-comments",
    "recent-posts",
    "rss",
    "search",
    "tag_cloud",
    "text",
];

pub type WideFilter = Box<dyn Fn(&ItemId, bool) -> bool>;

#[derive(Default)]
pub struct WidePredicate {
    filter: Option<WideFilter>,
}

impl WidePredicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: impl Fn(&ItemId, bool) -> bool + 'static) -> Self {
        Self {
            filter: Some(Box::new(filter)),
        }
    }

    /// Replaces any previously installed filter.
    pub fn set_filter(&mut self, filter: impl Fn(&ItemId, bool) -> bool + 'static) {
        self.filter = Some(Box::new(filter));
    }

    /// Filter that forces the listed kind bases to narrow.
    pub fn narrow_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let narrow: HashSet<String> = kinds.into_iter().map(Into::into).collect();
        Self::with_filter(move |item, wide| wide && !narrow.contains(&item.kind_base))
    }

    pub fn default_is_wide(item: &ItemId) -> bool {
        !CORE_KIND_BASES.contains(&item.kind_base.as_str())
    }

    pub fn is_wide(&self, item: &ItemId) -> bool {
        let default = Self::default_is_wide(item);
        match &self.filter {
            Some(filter) => filter(item, default),
            None => default,
        }
    }
}

impl fmt::Debug for WidePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidePredicate")
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
