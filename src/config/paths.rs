//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{Context, Result, bail};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{APP_DIR, CONFIG_ENV, CONFIG_FILE_NAME, LOG_FILE_NAME};

/// Where the config path came from; decides whether a template may be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// `--config-file`
    Cli(PathBuf),
    /// `$CLOUD_QUICKLINK_CONFIG`
    Env(PathBuf),
    /// Platform default
    Default(PathBuf),
}

impl ConfigLocation {
    pub fn path(&self) -> &Path {
        match self {
            ConfigLocation::Cli(p) | ConfigLocation::Env(p) | ConfigLocation::Default(p) => p,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, ConfigLocation::Default(_))
    }
}

/// Pick the config file: CLI flag, then env var, then the platform default.
pub fn locate_config(cli_path: Option<&Path>) -> Result<ConfigLocation> {
    if let Some(p) = cli_path {
        return Ok(ConfigLocation::Cli(normalize_explicit(p)?));
    }
    if let Some(v) = env::var_os(CONFIG_ENV)
        && !v.is_empty()
    {
        return Ok(ConfigLocation::Env(normalize_explicit(Path::new(&v))?));
    }
    Ok(ConfigLocation::Default(platform_config_path()?))
}

/// OS-appropriate default config path, honoring `$CLOUD_QUICKLINK_CONFIG`.
pub fn default_config_path() -> Result<PathBuf> {
    locate_config(None).map(|loc| loc.path().to_path_buf())
}

fn platform_config_path() -> Result<PathBuf> {
    if let Some(mut base) = config_dir() {
        base.push(APP_DIR);
        base.push(CONFIG_FILE_NAME);
        return Ok(base);
    }
    match env::var_os("HOME") {
        Some(h) => Ok(PathBuf::from(h).join(".config").join(APP_DIR).join(CONFIG_FILE_NAME)),
        None => bail!("cannot determine a config directory (no platform config dir and HOME unset)"),
    }
}

/// Relative paths are taken from the current directory; a directory means `<dir>/config.xml`.
fn normalize_explicit(p: &Path) -> Result<PathBuf> {
    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        env::current_dir()
            .context("resolve current directory for relative config path")?
            .join(p)
    };
    if abs.is_dir() {
        Ok(abs.join(CONFIG_FILE_NAME))
    } else {
        Ok(abs)
    }
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(mut base) = data_dir() {
        base.push(APP_DIR);
        base.push(LOG_FILE_NAME);
        return Ok(base);
    }
    match env::var_os("HOME") {
        Some(h) => Ok(PathBuf::from(h)
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join(LOG_FILE_NAME)),
        None => bail!("cannot determine a data directory for the log file"),
    }
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
