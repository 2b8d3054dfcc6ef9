use std::fmt;

#[derive(Debug)]
pub enum CustomizeError {
    /// TOML parse / deserialization error in a site file.
    SiteParse(String),
    /// Site validation error (duplicate slot key, reserved key, bad kind name).
    SiteValidation(String),
    /// The requested theme is not declared in the site file.
    UnknownTheme(String),
    /// Draft payload is not a JSON object.
    DraftParse(String),
}

impl fmt::Display for CustomizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SiteParse(msg) => write!(f, "site parse error: {msg}"),
            Self::SiteValidation(msg) => write!(f, "site validation error: {msg}"),
            Self::UnknownTheme(theme) => write!(f, "unknown theme: {theme}"),
            Self::DraftParse(msg) => write!(f, "draft parse error: {msg}"),
        }
    }
}

impl std::error::Error for CustomizeError {}

/// A draft value rejected by a setting's sanitize hook.
///
/// Rejection is not fatal: the draft is ignored and the persisted value
/// shows through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeError {
    pub setting_id: String,
    pub reason: String,
}

impl SanitizeError {
    pub fn new(setting_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            setting_id: setting_id.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "setting '{}': {}", self.setting_id, self.reason)
    }
}

impl std::error::Error for SanitizeError {}
