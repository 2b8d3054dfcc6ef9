// widgetry CLI - headless customizer previews

mod exit_codes;
mod preview;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{customize_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use widgetry_config::Settings;
use widgetry_customize::CustomizeError;

#[derive(Parser)]
#[command(name = "widgetry")]
#[command(about = "Preview slot/item customizer sessions without touching storage")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WIDGETRY_COMMIT"), ")"))]
struct Cli {
    /// Log at debug level (overrides log.level; RUST_LOG wins over both)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a preview session against a site file
    #[command(after_help = "\
Examples:
  widgetry preview site.toml --theme twentyten
  widgetry preview site.toml --theme twentyeleven --json
  widgetry preview site.toml --theme twentyten --drafts drafts.json --render
  widgetry preview site.toml --theme twentyten --update-item text-4 --persist")]
    Preview {
        /// Path to the site .toml file
        site: PathBuf,

        /// Theme the session previews
        #[arg(long)]
        theme: String,

        /// JSON object of setting id → draft value
        #[arg(long)]
        drafts: Option<PathBuf>,

        /// Raw id of an item updated out of band (e.g. text-4)
        #[arg(long, value_name = "ITEM_ID")]
        update_item: Option<String>,

        /// Final-save session: nothing is previewed
        #[arg(long, conflicts_with = "preview")]
        persist: bool,

        /// Live preview even when preview.finalPersist is set
        #[arg(long)]
        preview: bool,

        /// Partial-refresh request (never switches theme)
        #[arg(long)]
        async_request: bool,

        /// Simulate a render pass and include the tally
        #[arg(long)]
        render: bool,

        /// Output the full session report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify setting ids
    #[command(after_help = "\
Examples:
  widgetry classify 'slots[sidebar-1]' 'item_text[2]' blogname")]
    Classify {
        /// Setting ids to classify
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Validate a site file without running a session
    Validate {
        /// Path to the site .toml file
        site: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::load();

    let level = if cli.verbose { "debug" } else { settings.log_level.as_filter() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("preferences: {}", Settings::config_path_display());

    let result = match cli.command {
        Commands::Preview {
            site,
            theme,
            drafts,
            update_item,
            persist,
            preview,
            async_request,
            render,
            json,
        } => preview::cmd_preview(
            &settings,
            preview::PreviewArgs {
                site,
                theme,
                drafts,
                update_item,
                persist,
                preview,
                async_request,
                render,
                json,
            },
        ),
        Commands::Classify { ids } => preview::cmd_classify(ids),
        Commands::Validate { site } => preview::cmd_validate(site),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with its registered exit code.
    pub fn customize(err: CustomizeError) -> Self {
        let code = customize_exit_code(&err);
        let hint = match &err {
            CustomizeError::UnknownTheme(_) => {
                Some("run `widgetry validate <site>` to list declared themes".to_string())
            }
            CustomizeError::DraftParse(_) => {
                Some("drafts must be a JSON object, e.g. {\"slots[sidebar-1]\": [\"text-2\"]}".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
