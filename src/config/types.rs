//! Core configuration types.
//! - Config holds runtime settings loaded once from XML.
//! - LogLevel represents verbosity with simple parsing helpers.
//! - Passwords are kept as StoredCredential tokens and only decrypted on demand.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::DEFAULT_TIMEOUT_SECS;
use crate::credential::StoredCredential;
use crate::errors::LinkError;
use crate::quicklink::QuicklinkEndpoint;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Warnings (default)
    #[default]
    Normal,
    /// Progress information
    Info,
    /// Request-level detail
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    /// Aliases such as critical, warning and notset are accepted too.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "critical" | "none" => Some(LogLevel::Quiet),
            "normal" | "warning" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" | "notset" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Quicklink API settings (`<quicklink>` section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuicklinkConfig {
    pub url: String,
    pub web_resource: String,
    pub user: String,
    pub password: StoredCredential,
}

impl QuicklinkConfig {
    /// Endpoint with the service password decrypted.
    pub fn endpoint(&self) -> Result<QuicklinkEndpoint, LinkError> {
        let password = self.password.reveal()?;
        QuicklinkEndpoint::new(&self.url, &self.web_resource, &self.user, password)
    }
}

/// One `<user name=".." password=".."/>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub name: String,
    pub password: StoredCredential,
}

/// Runtime configuration, built once and passed around by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the file-sync service
    pub url: String,
    /// Server-side data directory; `<data_root>/<owner>/files` is stripped from file paths
    pub data_root: Option<PathBuf>,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Optional audit CSV destination
    pub data_log: Option<PathBuf>,
    /// Skip TLS certificate verification (self-signed servers)
    pub accept_invalid_certs: bool,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Quicklink API; publishing is skipped when absent
    pub quicklink: Option<QuicklinkConfig>,
    /// Owners and their password tokens
    pub users: Vec<UserEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            data_root: None,
            log_level: LogLevel::Normal,
            log_file: None,
            data_log: None,
            accept_invalid_certs: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            quicklink: None,
            users: Vec::new(),
        }
    }
}

impl Config {
    /// Construct a Config for `url`; other fields use defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add (or replace) an owner entry.
    pub fn with_user(mut self, name: impl Into<String>, password: StoredCredential) -> Self {
        let name = name.into();
        self.users.retain(|u| u.name != name);
        self.users.push(UserEntry { name, password });
        self
    }

    /// Decrypted password for `owner`.
    pub fn owner_password(&self, owner: &str) -> Result<String, LinkError> {
        let entry = self.users.iter().find(|u| u.name == owner).ok_or_else(|| {
            LinkError::invalid_parameter("owner", format!("no password configured for owner '{owner}'"))
        })?;
        entry.password.reveal()
    }

    /// Quicklink endpoint if the section is configured.
    pub fn quicklink_endpoint(&self) -> Result<Option<QuicklinkEndpoint>, LinkError> {
        self.quicklink.as_ref().map(QuicklinkConfig::endpoint).transpose()
    }
}
