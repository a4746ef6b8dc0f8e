//! Core library for `cloud_quicklink`.
//!
//! Resolves a shareable link for a file on a Nextcloud server, records the
//! result in an audit CSV and registers it with the quicklink business API.
//!
//! Main entry points:
//! - [`ShareResolver`]: one file, one resolution; precedence between existing
//!   public shares, newly created ones and the private link.
//! - [`StoredCredential`]: config password tokens, plain or AES-256-CTR sealed.
//! - [`Config`]: XML settings loaded by [`config::load_or_init`].

pub mod audit;
pub mod cipher;
pub mod cli;
pub mod config;
pub mod credential;
pub mod errors;
pub mod http;
pub mod output;
pub mod platform;
pub mod quicklink;
pub mod share;
pub mod utils;

pub use audit::{AUDIT_DELIMITER, AUDIT_FIELDS, AuditRecord};
pub use config::types::{Config, LogLevel};
pub use config::{CONFIG_ENV, default_config_path, default_log_path, path_has_symlink_ancestor};
pub use credential::{SHARED_SECRET_KEY, StoredCredential};
pub use errors::{LinkError, StoreError, TransportError};
pub use http::{HttpMethod, HttpReply, HttpRequest, HttpTransport, ReqwestTransport};
pub use quicklink::{QuicklinkEndpoint, QuicklinkReceipt, QuicklinkRequest};
pub use share::store::{RemoteShare, RemoteShareStore, ShareType};
pub use share::{
    Credentials, LinkSource, PRIVATE_LINK_PATH, Resolution, ResolverOptions, ResolverState,
    ShareResolver, private_link_url,
};
pub use utils::relative_file_path;
