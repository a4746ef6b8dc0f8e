//! Share resolution.
//!
//! A [`ShareResolver`] is bound to one owner session and one file. It decides,
//! once, which link to expose for that file:
//!
//! 1. an existing public link share, if the path has one;
//! 2. otherwise a newly created public link, when creation is requested (flag or keyword);
//! 3. otherwise the private link `<service url>/index.php/f/<file id>`.
//!
//! The outcome is cached; later reads never call the store again.
//!
//! Lifecycle: `Uninitialized --set_file_path--> Unresolved --resolve--> Resolved`.

pub mod nextcloud;
pub mod store;

use std::fmt;

use tracing::{debug, info};

use crate::errors::{LinkError, StoreError};
use store::{RemoteShare, RemoteShareStore};

/// Path appended to the service URL to build a private (login required) link.
/// Format: `<service url>/index.php/f/<file id>`.
pub const PRIVATE_LINK_PATH: &str = "/index.php/f/";

/// Private link for `file_id` on `service_url` (trailing '/' on the URL is ignored).
pub fn private_link_url(service_url: &str, file_id: u64) -> String {
    format!("{}{}{}", service_url.trim_end_matches('/'), PRIVATE_LINK_PATH, file_id)
}

/// Service URL and the owner's session credentials. All three are required.
#[derive(Clone)]
pub struct Credentials {
    service_url: String,
    owner: String,
    password: String,
}

impl Credentials {
    pub fn new(
        service_url: impl Into<String>,
        owner: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, LinkError> {
        let service_url = non_blank("service_url", service_url.into())?;
        let owner = non_blank("owner", owner.into())?;
        let password = password.into();
        if password.trim().is_empty() {
            return Err(LinkError::invalid_parameter("password", "must not be blank"));
        }
        Ok(Self {
            service_url,
            owner,
            password,
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("service_url", &self.service_url)
            .field("owner", &self.owner)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn non_blank(name: &'static str, value: String) -> Result<String, LinkError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LinkError::invalid_parameter(name, "must not be blank"));
    }
    Ok(trimmed.to_string())
}

/// When to create a public share if none exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    create_public_if_missing: bool,
    public_keyword: Option<String>,
}

impl ResolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always create a public share when the path has none.
    pub fn create_public_if_missing(mut self, yes: bool) -> Self {
        self.create_public_if_missing = yes;
        self
    }

    /// Create a public share when `keyword` appears in the path (any case).
    /// A blank keyword is ignored.
    pub fn public_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.public_keyword = if keyword.trim().is_empty() { None } else { Some(keyword) };
        self
    }

    pub fn always_create(&self) -> bool {
        self.create_public_if_missing
    }

    pub fn keyword(&self) -> Option<&str> {
        self.public_keyword.as_deref()
    }

    /// True if a missing public share should be created for `path`.
    pub fn wants_public_share(&self, path: &str) -> bool {
        if self.create_public_if_missing {
            return true;
        }
        match &self.public_keyword {
            Some(k) => path.to_uppercase().contains(&k.to_uppercase()),
            None => false,
        }
    }
}

/// Where the exposed link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    ExistingPublic,
    CreatedPublic,
    Private,
}

/// Cached outcome of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub share_url: String,
    /// Present iff a public link share is used.
    pub public_share_id: Option<String>,
    pub file_id: u64,
    pub source: LinkSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Uninitialized,
    Unresolved,
    Resolved,
}

#[derive(Debug, Clone)]
struct Target {
    path: String,
    file_id: u64,
}

#[derive(Debug)]
enum Stage {
    Unbound,
    Bound(Target),
    Resolved(Target, Resolution),
}

/// Resolves the link for one file of one owner. See the module docs.
pub struct ShareResolver<S: RemoteShareStore> {
    store: S,
    credentials: Credentials,
    options: ResolverOptions,
    stage: Stage,
    messages: Vec<String>,
}

impl<S: RemoteShareStore> ShareResolver<S> {
    /// Verify the store session and return an unbound resolver.
    pub fn connect(store: S, credentials: Credentials, options: ResolverOptions) -> Result<Self, LinkError> {
        if let Err(e) = store.check_connection() {
            return Err(LinkError::ConnectionFailure {
                url: credentials.service_url().to_string(),
                owner: credentials.owner().to_string(),
                reason: e.to_string(),
            });
        }
        info!(url = %credentials.service_url(), owner = %credentials.owner(), "Successful connection to share store");
        Ok(Self {
            store,
            credentials,
            options,
            stage: Stage::Unbound,
            messages: Vec::new(),
        })
    }

    /// Bind the resolver to `path` and look up its file id. Allowed once.
    pub fn set_file_path(&mut self, path: &str) -> Result<u64, LinkError> {
        if let Some(current) = self.file_path() {
            return Err(LinkError::InvalidState(format!(
                "file path already set to '{current}'; use a new resolver for another file"
            )));
        }
        if path.trim().is_empty() {
            return Err(LinkError::invalid_parameter("file_path", "must not be blank"));
        }

        let file_id = self.store.file_id(path).map_err(|e| LinkError::ResourceNotFound {
            path: path.to_string(),
            owner: self.owner().to_string(),
            reason: e.to_string(),
        })?;
        debug!(path, file_id, "Resolved file id");
        self.stage = Stage::Bound(Target {
            path: path.to_string(),
            file_id,
        });
        Ok(file_id)
    }

    /// Run resolution if it has not run yet; return the cached outcome.
    pub fn resolve(&mut self) -> Result<&Resolution, LinkError> {
        if let Stage::Bound(target) = &self.stage {
            let resolution = determine(
                &self.store,
                &self.credentials,
                &self.options,
                target,
                &mut self.messages,
            )?;
            let target = target.clone();
            self.stage = Stage::Resolved(target, resolution);
        }
        match &self.stage {
            Stage::Resolved(_, resolution) => Ok(resolution),
            Stage::Unbound => Err(LinkError::InvalidState(
                "no file path set; call set_file_path first".into(),
            )),
            Stage::Bound(_) => Err(LinkError::InvalidState("resolution did not complete".into())),
        }
    }

    pub fn share_url(&mut self) -> Result<&str, LinkError> {
        Ok(self.resolve()?.share_url.as_str())
    }

    pub fn public_share_id(&mut self) -> Result<Option<&str>, LinkError> {
        Ok(self.resolve()?.public_share_id.as_deref())
    }

    pub fn file_id(&mut self) -> Result<u64, LinkError> {
        Ok(self.resolve()?.file_id)
    }

    /// Cached outcome without triggering resolution.
    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.stage {
            Stage::Resolved(_, r) => Some(r),
            _ => None,
        }
    }

    pub fn state(&self) -> ResolverState {
        match self.stage {
            Stage::Unbound => ResolverState::Uninitialized,
            Stage::Bound(_) => ResolverState::Unresolved,
            Stage::Resolved(..) => ResolverState::Resolved,
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match &self.stage {
            Stage::Unbound => None,
            Stage::Bound(t) | Stage::Resolved(t, _) => Some(t.path.as_str()),
        }
    }

    pub fn owner(&self) -> &str {
        self.credentials.owner()
    }

    pub fn service_url(&self) -> &str {
        self.credentials.service_url()
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Human-readable outcome log, in order.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

fn determine<S: RemoteShareStore>(
    store: &S,
    credentials: &Credentials,
    options: &ResolverOptions,
    target: &Target,
    messages: &mut Vec<String>,
) -> Result<Resolution, LinkError> {
    let path = target.path.as_str();
    let owner = credentials.owner();

    debug!(path, "Looking for an existing public share");
    let shares = store.shares_for_path(path).map_err(|e| remote_api_failure(path, owner, &e))?;
    if let Some(RemoteShare { id, url, .. }) = shares.into_iter().find(RemoteShare::is_public_link) {
        let url = url.ok_or_else(|| LinkError::RemoteApiFailure {
            path: path.to_string(),
            owner: owner.to_string(),
            code: "missing_url".into(),
            message: format!("public share {id} has no URL"),
        })?;
        info!(path, share_id = %id, url = %url, "Existing public share located");
        record_share(messages, "Existing public share located:", &id, &url);
        return Ok(Resolution {
            share_url: url,
            public_share_id: Some(id),
            file_id: target.file_id,
            source: LinkSource::ExistingPublic,
        });
    }
    debug!(path, "No public shares found for file");

    if options.wants_public_share(path) {
        info!(path, "New public share required");
        let created = store
            .create_public_share(path)
            .map_err(|e| share_creation_failed(path, owner, e.to_string()))?;
        let RemoteShare { id, url, .. } = created;
        let url = url.ok_or_else(|| share_creation_failed(path, owner, format!("share {id} was created without a URL")))?;
        info!(path, share_id = %id, url = %url, "New public share created");
        record_share(messages, "New public share created:", &id, &url);
        return Ok(Resolution {
            share_url: url,
            public_share_id: Some(id),
            file_id: target.file_id,
            source: LinkSource::CreatedPublic,
        });
    }

    let url = private_link_url(credentials.service_url(), target.file_id);
    info!(path, url = %url, "Using private link");
    Ok(Resolution {
        share_url: url,
        public_share_id: None,
        file_id: target.file_id,
        source: LinkSource::Private,
    })
}

fn record_share(messages: &mut Vec<String>, heading: &str, id: &str, url: &str) {
    messages.push(heading.to_string());
    messages.push(format!("Share Link Id : {id}"));
    messages.push(format!("URL: {url}"));
}

fn remote_api_failure(path: &str, owner: &str, e: &StoreError) -> LinkError {
    LinkError::RemoteApiFailure {
        path: path.to_string(),
        owner: owner.to_string(),
        code: e.code(),
        message: e.to_string(),
    }
}

fn share_creation_failed(path: &str, owner: &str, reason: String) -> LinkError {
    LinkError::ShareCreationFailed {
        path: path.to_string(),
        owner: owner.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_link_format() {
        assert_eq!(
            private_link_url("https://cloud.example.com/", 4711),
            "https://cloud.example.com/index.php/f/4711"
        );
        assert_eq!(
            private_link_url("https://cloud.example.com/nc", 1),
            "https://cloud.example.com/nc/index.php/f/1"
        );
    }

    #[test]
    fn keyword_is_case_insensitive_substring() {
        let opts = ResolverOptions::new().public_keyword("shared");
        assert!(opts.wants_public_share("/Projects/SHARED/plan.pdf"));
        assert!(opts.wants_public_share("/unsharedfile.txt"));
        assert!(!opts.wants_public_share("/Projects/private/plan.pdf"));
    }

    #[test]
    fn blank_keyword_never_triggers() {
        let opts = ResolverOptions::new().public_keyword("   ");
        assert_eq!(opts.keyword(), None);
        assert!(!opts.wants_public_share("/anything"));
    }

    #[test]
    fn credentials_reject_blanks() {
        assert!(matches!(
            Credentials::new(" ", "alice", "pw"),
            Err(LinkError::InvalidParameter { name: "service_url", .. })
        ));
        assert!(matches!(
            Credentials::new("https://c", "", "pw"),
            Err(LinkError::InvalidParameter { name: "owner", .. })
        ));
        assert!(matches!(
            Credentials::new("https://c", "alice", ""),
            Err(LinkError::InvalidParameter { name: "password", .. })
        ));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials::new("https://c", "alice", "s3cret-pw").unwrap();
        assert!(!format!("{c:?}").contains("s3cret-pw"));
    }
}
