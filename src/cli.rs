//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - `--file` and `--owner` are required unless `--print-config` or `--encrypt` is given.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::share::ResolverOptions;

/// Resolve a share link for a file on a Nextcloud server and optionally
/// register it with the quicklink API.
/// CLI flags override config values (which are loaded from XML).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Resolve Nextcloud share links and publish them as quicklinks"
)]
pub struct Args {
    /// File to resolve, relative to the owner's files or a full server-side path.
    #[arg(
        long,
        short = 'f',
        value_name = "PATH",
        required_unless_present_any = ["print_config", "encrypt"],
        help = "File path (relative to the owner's files, or <data_root>/<owner>/files/...)"
    )]
    pub file: Option<String>,

    /// Owner of the file on the server.
    #[arg(
        long,
        short = 'o',
        value_name = "USER",
        required_unless_present_any = ["print_config", "encrypt"],
        help = "Owner of the file"
    )]
    pub owner: Option<String>,

    /// Config file to use instead of $CLOUD_QUICKLINK_CONFIG or the platform default.
    #[arg(long, value_name = "XML", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// Create a public share when none exists.
    #[arg(long, help = "Create a public share when the file has none")]
    pub create_public_share: bool,

    /// Create a public share when the file path contains this word (case-insensitive).
    #[arg(long, value_name = "WORD")]
    pub public_keyword: Option<String>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Print where the config file will be read from, then exit.
    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,

    /// Encrypt a password for the config file, then exit.
    #[arg(long, value_name = "PLAINTEXT", requires = "iv")]
    pub encrypt: Option<String>,

    /// IV for `--encrypt` (16 or more characters).
    #[arg(long, value_name = "IV", requires = "encrypt")]
    pub iv: Option<String>,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }

    /// Resolver options from `--create-public-share` and `--public-keyword`.
    pub fn resolver_options(&self) -> ResolverOptions {
        let options = ResolverOptions::new().create_public_if_missing(self.create_public_share);
        match &self.public_keyword {
            Some(word) => options.public_keyword(word.as_str()),
            None => options,
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
