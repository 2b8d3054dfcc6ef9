//! In-memory grouping/control registry.
//!
//! Panels hold sections, sections hold controls. Listings are ordered by
//! ascending priority, ties broken by insertion order.

use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub panel: String,
    pub slot_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub id: String,
    pub setting: String,
    pub section: String,
    pub priority: i64,
    #[serde(flatten)]
    pub kind: ControlKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    /// Reorder/add affordance for a whole slot.
    SlotAssignment { slot_key: String },
    /// Form for one item placed in a slot.
    ItemForm {
        label: String,
        item_id: String,
        kind_base: String,
        width: u32,
        height: u32,
        is_wide: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView<'a> {
    #[serde(flatten)]
    pub section: &'a Section,
    pub controls: Vec<&'a Control>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelView<'a> {
    #[serde(flatten)]
    pub panel: &'a Panel,
    pub sections: Vec<SectionView<'a>>,
}

#[derive(Debug, Default)]
pub struct ControlTree {
    panels: IndexMap<String, Panel>,
    sections: IndexMap<String, Section>,
    controls: IndexMap<String, Control>,
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a panel with this id already exists.
    pub fn add_panel(&mut self, panel: Panel) -> bool {
        if self.panels.contains_key(&panel.id) {
            return false;
        }
        self.panels.insert(panel.id.clone(), panel);
        true
    }

    pub fn add_section(&mut self, section: Section) -> bool {
        if self.sections.contains_key(&section.id) {
            return false;
        }
        self.sections.insert(section.id.clone(), section);
        true
    }

    pub fn add_control(&mut self, control: Control) -> bool {
        if self.controls.contains_key(&control.id) {
            return false;
        }
        self.controls.insert(control.id.clone(), control);
        true
    }

    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.get(id)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.get(id)
    }

    pub fn panels(&self) -> Vec<&Panel> {
        ordered(self.panels.values(), |p| p.priority)
    }

    pub fn sections_in(&self, panel_id: &str) -> Vec<&Section> {
        ordered(
            self.sections.values().filter(|s| s.panel == panel_id),
            |s| s.priority,
        )
    }

    pub fn controls_in(&self, section_id: &str) -> Vec<&Control> {
        ordered(
            self.controls.values().filter(|c| c.section == section_id),
            |c| c.priority,
        )
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    /// Whole tree in display order.
    pub fn snapshot(&self) -> Vec<PanelView<'_>> {
        self.panels()
            .into_iter()
            .map(|panel| PanelView {
                panel,
                sections: self
                    .sections_in(&panel.id)
                    .into_iter()
                    .map(|section| SectionView {
                        section,
                        controls: self.controls_in(&section.id),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Stable sort keeps insertion order among equal priorities.
fn ordered<'a, T>(iter: impl Iterator<Item = &'a T>, priority: impl Fn(&T) -> i64) -> Vec<&'a T> {
    let mut out: Vec<&T> = iter.collect();
    out.sort_by_key(|t| priority(t));
    out
}
