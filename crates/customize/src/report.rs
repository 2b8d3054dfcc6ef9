//! Serializable summary of a finished session.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::controls::PanelView;
use crate::environment::{available_kinds, AvailableKind, EnvironmentProvider};
use crate::model::SlotMap;
use crate::pipeline::{CustomizeSession, PipelineReport, SessionMode, StageOutcome};
use crate::resolver::SettingType;
use crate::state::InterceptSummary;
use crate::tally::TallySnapshot;

#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub meta: ReportMeta,
    pub stages: Vec<StageOutcome>,
    pub settings: Vec<SettingEntry>,
    pub panels: Vec<PanelView<'a>>,
    pub slot_map: SlotMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_slot_map_data: Option<SlotMap>,
    pub changeset: IndexMap<String, Value>,
    pub intercepts: InterceptSummary,
    pub available_kinds: Vec<AvailableKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tally: Option<TallySnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub target_theme: String,
    pub active_theme: String,
    pub theme_switched: bool,
    pub mode: SessionMode,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub setting_type: SettingType,
    pub dirty: bool,
    pub previewed: bool,
    pub value: Value,
}

impl<'a> SessionReport<'a> {
    /// `with_tally` includes the render tally; leave it off when nothing
    /// was rendered.
    pub fn build(
        session: &'a CustomizeSession,
        env: &dyn EnvironmentProvider,
        pipeline: PipelineReport,
        with_tally: bool,
    ) -> Self {
        let settings = session
            .settings
            .iter()
            .map(|s| SettingEntry {
                id: s.id.clone(),
                setting_type: s.setting_type(),
                dirty: s.args.dirty,
                previewed: s.previewed,
                value: session.setting_value(&s.id).unwrap_or(Value::Null),
            })
            .collect();

        SessionReport {
            meta: ReportMeta {
                target_theme: session.context.target_theme.clone(),
                active_theme: session.state.active_theme().to_string(),
                theme_switched: session.theme_switch.is_some(),
                mode: session.context.mode,
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            stages: pipeline.stages,
            settings,
            panels: session.controls.snapshot(),
            slot_map: session.slot_map(),
            old_slot_map_data: session.state.old_slot_map_data(),
            changeset: session.changeset(),
            intercepts: session.state.intercepts(),
            available_kinds: available_kinds(env, &session.wide),
            tally: with_tally.then(|| session.tally.snapshot()),
        }
    }
}
