//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a secure template when the platform default is missing.
//!
//! Notes:
//! - Unknown XML elements are rejected (`deny_unknown_fields`) to surface typos early.
//! - Password tokens are parsed here, so a malformed token fails the load.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::DEFAULT_TIMEOUT_SECS;
use super::paths::{ConfigLocation, default_log_path, locate_config, path_has_symlink_ancestor};
use crate::config::types::{Config, LogLevel, QuicklinkConfig, UserEntry};
use crate::credential::StoredCredential;
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    url: Option<String>,
    data_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    data_log: Option<String>,
    #[serde(default, deserialize_with = "de_bool_trimmed_opt")]
    accept_invalid_certs: Option<bool>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    timeout_seconds: Option<u64>,
    quicklink: Option<XmlQuicklink>,
    users: Option<XmlUsers>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlQuicklink {
    url: Option<String>,
    web_resource: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlUsers {
    #[serde(rename = "user", default)]
    user: Vec<XmlUser>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XmlUser {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@password")]
    password: String,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn de_bool_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Outcome of [`load_or_init`].
#[derive(Debug)]
pub enum LoadResult {
    Loaded(Box<Config>, PathBuf),
    /// The default config was missing; a template was written there.
    CreatedTemplate(PathBuf),
}

/// Locate and load the config. A missing platform default gets a template;
/// a missing explicit path (flag or env var) is an error.
pub fn load_or_init(cli_path: Option<&Path>) -> Result<LoadResult> {
    let location = locate_config(cli_path)?;
    let path = location.path().to_path_buf();
    if !path.exists() {
        if location.is_default() {
            create_template_config(&path)?;
            return Ok(LoadResult::CreatedTemplate(path));
        }
        let origin = match location {
            ConfigLocation::Cli(_) => "--config-file",
            _ => super::CONFIG_ENV,
        };
        bail!("config file '{}' (from {origin}) does not exist", path.display());
    }
    let cfg = load_config_from_xml_path(&path)?;
    Ok(LoadResult::Loaded(Box::new(cfg), path))
}

/// Load a Config from a specific XML file path (quick_xml).
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    load_config_from_xml_str(&contents).with_context(|| format!("parse config xml '{}'", path.display()))
}

/// Parse XML text into a Config.
pub fn load_config_from_xml_str(contents: &str) -> Result<Config> {
    let parsed: XmlConfig = from_xml_str(contents)?;
    xml_to_config(parsed)
}

// Map XmlConfig -> Config
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(url) = non_empty(parsed.url) {
        cfg.url = url;
    }
    cfg.data_root = non_empty(parsed.data_root).map(PathBuf::from);
    cfg.log_file = non_empty(parsed.log_file).map(PathBuf::from);
    cfg.data_log = non_empty(parsed.data_log).map(PathBuf::from);

    if let Some(s) = non_empty(parsed.log_level) {
        cfg.log_level = s
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("<log_level>")?;
    }

    cfg.accept_invalid_certs = parsed.accept_invalid_certs.unwrap_or(false);
    cfg.timeout = Duration::from_secs(parsed.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS));

    if let Some(q) = parsed.quicklink {
        let token = non_empty(q.password).unwrap_or_default();
        cfg.quicklink = Some(QuicklinkConfig {
            url: non_empty(q.url).unwrap_or_default(),
            web_resource: non_empty(q.web_resource).unwrap_or_default(),
            user: non_empty(q.user).unwrap_or_default(),
            password: StoredCredential::parse(&token).context("<quicklink><password>")?,
        });
    }

    for u in parsed.users.map(|u| u.user).unwrap_or_default() {
        let name = u.name.trim().to_string();
        let password = StoredCredential::parse(u.password.trim())
            .with_context(|| format!("password for user '{name}'"))?;
        if cfg.users.iter().any(|e| e.name == name) {
            bail!("user '{name}' is listed more than once");
        }
        cfg.users.push(UserEntry { name, password });
    }

    Ok(cfg)
}

/// Create default template config file and parent directory (best-effort permissions).
/// Uses secure creation to avoid following attacker-controlled symlinks on Unix.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "/path/to/cloud_quicklink.log".into());

    let content = format!(
        "<!--\n  cloud_quicklink configuration (XML)\n\n  Fields:\n    url                  -> base URL of the Nextcloud server\n    data_root            -> server data directory; <data_root>/<owner>/files is stripped from the file argument\n    log_level            -> quiet | normal | info | debug\n    log_file             -> path to log file (optional; stderr still used)\n    data_log             -> audit CSV ('|' delimited); omit to skip\n    accept_invalid_certs -> true to accept self-signed TLS certificates\n    timeout_seconds      -> per-request HTTP timeout\n    quicklink            -> business API; omit the whole section to skip publishing\n    users                -> one <user name=\"..\" password=\"..\"/> per file owner\n\n  Passwords are either plain text or '<ciphertext>,<iv>' as printed by\n  the encrypt option of cloud_quicklink (see its help output).\n-->\n<config>\n  <url>https://cloud.example.com</url>\n  <data_root>/var/www/html/nextcloud/data</data_root>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <accept_invalid_certs>false</accept_invalid_certs>\n  <timeout_seconds>{}</timeout_seconds>\n  <users>\n    <user name=\"owner\" password=\"change-me\"/>\n  </users>\n</config>\n",
        suggested_log, DEFAULT_TIMEOUT_SECS
    );

    // Atomic, secure write (O_NOFOLLOW + create_new on Unix), then tighten perms.
    write_config_secure_new_0600(path, content.as_bytes())?;
    let _ = set_file_mode_0600(path);

    info!("Created template config at {}", path.display());
    Ok(())
}
