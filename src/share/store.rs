//! Remote share store boundary.
//! The resolver only needs four operations from the file-sync service; everything
//! else about the service stays behind this trait.

use crate::errors::StoreError;

/// Share kinds as numbered by the sharing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareType {
    User,
    Group,
    PublicLink,
    Email,
    Federated,
    Other(i64),
}

impl ShareType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ShareType::User,
            1 => ShareType::Group,
            3 => ShareType::PublicLink,
            4 => ShareType::Email,
            6 => ShareType::Federated,
            other => ShareType::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ShareType::User => 0,
            ShareType::Group => 1,
            ShareType::PublicLink => 3,
            ShareType::Email => 4,
            ShareType::Federated => 6,
            ShareType::Other(c) => c,
        }
    }
}

/// One share on a path. `url` is only populated for link shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteShare {
    pub id: String,
    pub share_type: ShareType,
    pub url: Option<String>,
}

impl RemoteShare {
    pub fn public_link(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            share_type: ShareType::PublicLink,
            url: Some(url.into()),
        }
    }

    pub fn is_public_link(&self) -> bool {
        self.share_type == ShareType::PublicLink
    }
}

/// Operations the resolver needs from the file-sync service.
/// Paths are owner-relative and start with '/'.
pub trait RemoteShareStore {
    /// Verify the session works (credentials accepted, service reachable).
    fn check_connection(&self) -> Result<(), StoreError>;

    /// Numeric file identifier for `path`; `StoreError::NotFound` if absent.
    fn file_id(&self, path: &str) -> Result<u64, StoreError>;

    /// All shares currently defined on `path`, in service order.
    fn shares_for_path(&self, path: &str) -> Result<Vec<RemoteShare>, StoreError>;

    /// Create a new public link share on `path`.
    fn create_public_share(&self, path: &str) -> Result<RemoteShare, StoreError>;
}

impl<S: RemoteShareStore + ?Sized> RemoteShareStore for &S {
    fn check_connection(&self) -> Result<(), StoreError> {
        (**self).check_connection()
    }
    fn file_id(&self, path: &str) -> Result<u64, StoreError> {
        (**self).file_id(path)
    }
    fn shares_for_path(&self, path: &str) -> Result<Vec<RemoteShare>, StoreError> {
        (**self).shares_for_path(path)
    }
    fn create_public_share(&self, path: &str) -> Result<RemoteShare, StoreError> {
        (**self).create_public_share(path)
    }
}
