//! Session state and the stage orchestrator.
//!
//! A session runs five stages in a fixed order:
//! `discover_drafts → reconcile_theme_switch → register → activate_previews → tally`.
//! The environment loads between the first two, so items that only exist
//! as drafts are materialized.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::parse_item_setting_id;
use crate::controls::ControlTree;
use crate::drafts::discover_drafts;
use crate::environment::EnvironmentProvider;
use crate::model::{ItemId, SlotMap};
use crate::register::{activate_previews, register_settings_and_controls};
use crate::resolver::{SettingResolver, SettingType};
use crate::settings::{Drafts, SettingHooks, SettingsRegistry};
use crate::state::{EffectiveStateProvider, PersistedState};
use crate::tally::RenderTally;
use crate::theme_switch::{reconcile_theme_switch, ThemeSwitchCache};
use crate::wide::WidePredicate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Live preview: drafts are substituted for persisted values.
    #[default]
    Preview,
    /// Final save: nothing is previewed.
    Persist,
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub target_theme: String,
    pub mode: SessionMode,
    /// Partial-refresh requests never trigger a theme switch.
    pub async_request: bool,
    /// Raw id of an item being updated out of band.
    pub update_item: Option<String>,
}

impl SessionContext {
    pub fn new(target_theme: impl Into<String>) -> Self {
        Self {
            target_theme: target_theme.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DiscoverDrafts,
    ReconcileThemeSwitch,
    Register,
    ActivatePreviews,
    Tally,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiscoverDrafts => write!(f, "discover_drafts"),
            Self::ReconcileThemeSwitch => write!(f, "reconcile_theme_switch"),
            Self::Register => write!(f, "register"),
            Self::ActivatePreviews => write!(f, "activate_previews"),
            Self::Tally => write!(f, "tally"),
        }
    }
}

/// What one stage did. `settings` lists setting ids created or previewed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub settings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
}

impl PipelineReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|o| o.stage == stage)
    }

    fn push(&mut self, stage: Stage, settings: Vec<String>) {
        info!("stage {stage}: {} settings", settings.len());
        self.stages.push(StageOutcome { stage, settings });
    }
}

/// Everything one customization session owns.
#[derive(Debug)]
pub struct CustomizeSession {
    pub context: SessionContext,
    pub drafts: Drafts,
    pub resolver: SettingResolver,
    pub settings: SettingsRegistry,
    pub controls: ControlTree,
    pub state: EffectiveStateProvider,
    pub wide: WidePredicate,
    pub tally: RenderTally,
    pub theme_switch: Option<ThemeSwitchCache>,
    /// Setting ids touched by registration, awaiting preview.
    pub touched: IndexSet<String>,
}

impl CustomizeSession {
    pub fn new(context: SessionContext, store: PersistedState, drafts: Drafts) -> Self {
        Self {
            context,
            drafts,
            resolver: SettingResolver::new(),
            settings: SettingsRegistry::new(),
            controls: ControlTree::new(),
            state: EffectiveStateProvider::new(store),
            wide: WidePredicate::new(),
            tally: RenderTally::default(),
            theme_switch: None,
            touched: IndexSet::new(),
        }
    }

    /// Replace the settings registry's hooks. Call before [`run`].
    pub fn with_hooks(mut self, hooks: impl SettingHooks + 'static) -> Self {
        self.settings = SettingsRegistry::with_hooks(hooks);
        self
    }

    pub fn with_wide_predicate(mut self, wide: WidePredicate) -> Self {
        self.wide = wide;
        self
    }

    pub fn is_theme_active(&self) -> bool {
        self.state.active_theme() == self.context.target_theme
    }

    pub fn previews_enabled(&self) -> bool {
        self.context.mode != SessionMode::Persist
    }

    /// Items whose instance setting is previewed.
    pub fn previewed_items(&self) -> Vec<ItemId> {
        self.settings
            .iter()
            .filter(|s| s.previewed && s.setting_type() == SettingType::ItemInstance)
            .filter_map(|s| parse_item_setting_id(&s.id))
            .collect()
    }

    pub fn setting_value(&self, setting_id: &str) -> Option<Value> {
        self.settings.value(setting_id, &self.drafts, &self.state)
    }

    pub fn changeset(&self) -> IndexMap<String, Value> {
        self.settings.changeset(&self.drafts, &self.state)
    }

    pub fn slot_map(&self) -> SlotMap {
        self.state.slot_map()
    }
}

/// Run every stage once. Safe to call again: later passes create nothing
/// new and install nothing twice.
pub fn run(session: &mut CustomizeSession, env: &mut dyn EnvironmentProvider) -> PipelineReport {
    let mut report = PipelineReport::default();

    let discovered = discover_drafts(session);
    report.push(Stage::DiscoverDrafts, discovered);

    env.load(&session.previewed_items());

    if reconcile_theme_switch(session, &*env) {
        info!(
            "theme switch {} -> {}: slot map reconciled",
            session.state.active_theme(),
            session.context.target_theme
        );
    }
    report.push(Stage::ReconcileThemeSwitch, Vec::new());

    let registered = register_settings_and_controls(session, &*env);
    report.push(Stage::Register, registered);

    let previewed = activate_previews(session);
    report.push(Stage::ActivatePreviews, previewed);

    session.tally = RenderTally::new(env.declared_slots().iter().map(|s| s.key.clone()));
    report.push(Stage::Tally, Vec::new());

    report
}
