//! `widgetry-customize`: live-preview state for slot-and-item customizers.
//!
//! Pure engine crate: receives a loaded site (item kinds, declared slots,
//! stored slot map) plus pending drafts, and builds the settings, controls
//! and effective slot map a preview session shows. Nothing is persisted.

pub mod codec;
pub mod controls;
pub mod drafts;
pub mod environment;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod register;
pub mod report;
pub mod resolver;
pub mod settings;
pub mod site;
pub mod state;
pub mod tally;
pub mod theme_switch;
pub mod wide;

pub use environment::{Environment, EnvironmentProvider};
pub use error::{CustomizeError, SanitizeError};
pub use model::{ItemId, SlotMap};
pub use pipeline::{run, CustomizeSession, SessionContext, SessionMode};
pub use report::SessionReport;
pub use settings::Drafts;
pub use site::SiteConfig;
