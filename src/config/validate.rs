//! Config validation logic.
//! Checks the service URL, the owner list, the quicklink section and the audit
//! destination before any remote call is made.

use anyhow::{Result, bail};
use std::path::Path;
use tracing::{debug, error, info};
use url::Url;

use super::types::Config;
use crate::credential::StoredCredential;

impl Config {
    /// Validate required values and their shape.
    pub fn validate(&self) -> Result<()> {
        // 1) Service URL: present, absolute, http(s).
        ensure_http_url(&self.url, "url")?;

        // 2) At least one owner with a non-blank name.
        if self.users.is_empty() {
            error!("no users defined in the configuration");
            bail!("There are no users defined in the configuration file");
        }
        if self.users.iter().any(|u| u.name.trim().is_empty()) {
            bail!("a <user> entry has a blank name");
        }

        // 3) Quicklink section, when present, must be complete.
        if let Some(q) = &self.quicklink {
            ensure_http_url(&q.url, "quicklink url")?;
            if q.web_resource.trim().is_empty() {
                bail!("quicklink web_resource is empty");
            }
            if q.user.trim().is_empty() {
                bail!("The quicklink api user id is empty");
            }
            let blank = match &q.password {
                StoredCredential::Plain(p) => p.trim().is_empty(),
                StoredCredential::Encrypted { ciphertext, .. } => ciphertext.trim().is_empty(),
            };
            if blank {
                bail!("The quicklink api password is empty");
            }
        }

        // 4) Audit destination: its directory must exist.
        if let Some(dl) = &self.data_log {
            ensure_parent_dir(dl, "data_log")?;
        }

        if self.timeout.is_zero() {
            bail!("timeout_seconds must be greater than zero");
        }

        info!(
            url = %self.url,
            users = self.users.len(),
            quicklink = self.quicklink.is_some(),
            data_log = %self
                .data_log
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".into()),
            "Config validated"
        );
        Ok(())
    }
}

fn ensure_http_url(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        error!("{name} is not defined");
        bail!("{name} is not defined in the configuration file");
    }
    let parsed = match Url::parse(value.trim()) {
        Ok(u) => u,
        Err(e) => bail!("{name} '{value}' is not a valid URL: {e}"),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{name} '{value}' must use http or https");
    }
    debug!("{name} ok: {value}");
    Ok(())
}

fn ensure_parent_dir(path: &Path, name: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        && !parent.is_dir()
    {
        error!("{name} directory does not exist: {}", parent.display());
        bail!("{name} directory does not exist: {}", parent.display());
    }
    if path.is_dir() {
        bail!("{name} '{}' is a directory", path.display());
    }
    Ok(())
}
