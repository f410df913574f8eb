//! # Output Configuration
//!
//! Controls how the CLI decorates what it prints: status markers in
//! `validate`, and the colored `Error:` prefix on failures. Built manifests
//! written by `build` and `accumulate` are never decorated.
//!
//! The `--color=never|always|auto` flag wins; in `auto` mode the usual
//! environment conventions are honoured (`NO_COLOR`, `CLICOLOR=0`,
//! `CLICOLOR_FORCE=1`, `TERM=dumb`) before falling back to TTY detection.

use console::style;
use std::env;

/// Whether decorated output should be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag against the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // https://no-color.org/: presence alone disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stderr().features().colors_supported()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// The emoji when decoration is on, the plain marker otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Prefix for an error report printed to stderr.
pub fn error_prefix(config: &OutputConfig) -> String {
    if config.use_color {
        style("Error:").red().bold().force_styling(true).to_string()
    } else {
        "Error:".to_string()
    }
}
