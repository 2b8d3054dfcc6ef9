//! `widgetry preview|classify|validate`.

use std::path::{Path, PathBuf};

use log::debug;
use widgetry_config::Settings;
use widgetry_customize::environment::EnvironmentProvider;
use widgetry_customize::resolver::SettingResolver;
use widgetry_customize::wide::WidePredicate;
use widgetry_customize::{
    run, CustomizeSession, Drafts, SessionContext, SessionMode, SessionReport, SiteConfig,
};

use crate::exit_codes::EXIT_UNCLASSIFIED;
use crate::CliError;

pub struct PreviewArgs {
    pub site: PathBuf,
    pub theme: String,
    pub drafts: Option<PathBuf>,
    pub update_item: Option<String>,
    pub persist: bool,
    pub preview: bool,
    pub async_request: bool,
    pub render: bool,
    pub json: bool,
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

fn load_site(path: &Path) -> Result<SiteConfig, CliError> {
    SiteConfig::from_toml(&read_file(path)?).map_err(CliError::customize)
}

/// `--persist` and `--preview` win over the `preview.finalPersist` preference.
fn session_mode(args: &PreviewArgs, settings: &Settings) -> SessionMode {
    if args.persist || (settings.final_persist && !args.preview) {
        SessionMode::Persist
    } else {
        SessionMode::Preview
    }
}

pub fn cmd_preview(settings: &Settings, args: PreviewArgs) -> Result<(), CliError> {
    if args.update_item.as_deref().is_some_and(|id| id.trim().is_empty()) {
        return Err(CliError::args("--update-item needs an item id, e.g. text-4"));
    }

    let site = load_site(&args.site)?;
    let mut env = site.environment(&args.theme).map_err(CliError::customize)?;

    let drafts = match &args.drafts {
        Some(path) => Drafts::from_json(&read_file(path)?).map_err(CliError::customize)?,
        None => Drafts::new(),
    };

    let context = SessionContext {
        target_theme: args.theme.clone(),
        mode: session_mode(&args, settings),
        async_request: args.async_request,
        update_item: args.update_item.clone(),
    };
    let mut session = CustomizeSession::new(context, site.persisted_state(), drafts)
        .with_wide_predicate(WidePredicate::narrow_kinds(settings.narrow_kinds.iter().cloned()));

    let pipeline = run(&mut session, &mut env);
    if args.render {
        render_pass(&mut session, &env);
    }

    let report = SessionReport::build(&session, &env, pipeline, args.render);
    if args.json {
        let out = if settings.pretty_output {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        }
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{out}");
    } else {
        for (key, items) in report.slot_map.iter() {
            println!("{key}: {}", items.join(", "));
        }
    }

    // Human summary to stderr
    eprintln!(
        "preview {}: {} settings, {} sections, {} controls, {} pending changes{}",
        report.meta.target_theme,
        report.settings.len(),
        session.controls.section_count(),
        session.controls.control_count(),
        report.changeset.len(),
        if report.meta.theme_switched {
            format!(" (switched from {})", report.meta.active_theme)
        } else {
            String::new()
        },
    );
    Ok(())
}

/// Stand-in for the host's render loop: query every declared slot, render
/// the ones with items.
fn render_pass(session: &mut CustomizeSession, env: &dyn EnvironmentProvider) {
    let map = session.slot_map();
    for slot in env.declared_slots() {
        let items = map.items(&slot.key);
        if !session.tally.on_has_active_items(&slot.key, !items.is_empty()) {
            continue;
        }
        session.tally.on_render_slot(&slot.key, true);
        for id in items {
            if env.registered_item(id).is_some() {
                session.tally.on_render_item(id);
            } else {
                debug!("render: {id} in {} is not loaded", slot.key);
            }
        }
    }
}

pub fn cmd_classify(ids: Vec<String>) -> Result<(), CliError> {
    let mut resolver = SettingResolver::new();
    let mut unclassified = 0;
    for id in &ids {
        match resolver.classify(id) {
            Some(setting_type) => println!("{id}\t{setting_type}"),
            None => {
                println!("{id}\t-");
                unclassified += 1;
            }
        }
    }
    if unclassified > 0 {
        return Err(CliError {
            code: EXIT_UNCLASSIFIED,
            message: format!("{unclassified} of {} ids are not item or slot settings", ids.len()),
            hint: None,
        });
    }
    Ok(())
}

pub fn cmd_validate(path: PathBuf) -> Result<(), CliError> {
    let site = load_site(&path).map_err(|e| {
        let hint = format!("fix {} and re-run validate", path.display());
        e.with_hint(hint)
    })?;
    for (theme_id, theme) in &site.themes {
        let slots: Vec<&str> = theme.slots.iter().map(|s| s.key.as_str()).collect();
        println!("{theme_id} ({}): {}", theme.name, slots.join(", "));
    }
    eprintln!(
        "{}: valid, {} kinds, {} themes, active theme '{}'",
        path.display(),
        site.kinds.len(),
        site.themes.len(),
        site.store.active_theme,
    );
    Ok(())
}
