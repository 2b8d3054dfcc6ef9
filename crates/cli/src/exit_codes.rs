//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3       | Universal        | I/O error (read/write failed)            |
//! | 10-19   | site             | Site file parse/validation codes         |
//! | 20-29   | drafts           | Draft input codes                        |
//! | 30-39   | classify         | Setting-id classification codes          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use widgetry_customize::CustomizeError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read an input file or write output.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Site (10-19)
// =============================================================================

/// Site file is not valid TOML or has the wrong shape.
pub const EXIT_SITE_PARSE: u8 = 10;

/// Site file parsed but failed validation (duplicate/reserved slot keys, bad kinds).
pub const EXIT_SITE_INVALID: u8 = 11;

/// `--theme` names a theme the site file does not declare.
pub const EXIT_UNKNOWN_THEME: u8 = 12;

// =============================================================================
// Drafts (20-29)
// =============================================================================

/// Draft file is not a JSON object of setting id → value.
pub const EXIT_DRAFT_PARSE: u8 = 20;

// =============================================================================
// Classify (30-39)
// =============================================================================

/// At least one id is neither an item nor a slot setting.
pub const EXIT_UNCLASSIFIED: u8 = 30;

/// Map an engine error to its exit code.
pub fn customize_exit_code(err: &CustomizeError) -> u8 {
    match err {
        CustomizeError::SiteParse(_) => EXIT_SITE_PARSE,
        CustomizeError::SiteValidation(_) => EXIT_SITE_INVALID,
        CustomizeError::UnknownTheme(_) => EXIT_UNKNOWN_THEME,
        CustomizeError::DraftParse(_) => EXIT_DRAFT_PARSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_have_distinct_codes() {
        let codes = [
            customize_exit_code(&CustomizeError::SiteParse(String::new())),
            customize_exit_code(&CustomizeError::SiteValidation(String::new())),
            customize_exit_code(&CustomizeError::UnknownTheme(String::new())),
            customize_exit_code(&CustomizeError::DraftParse(String::new())),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(![EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_IO].contains(a));
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
