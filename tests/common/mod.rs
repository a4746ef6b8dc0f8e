//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use cloud_quicklink::{
    Credentials, HttpReply, HttpRequest, HttpTransport, RemoteShare, RemoteShareStore,
    ResolverOptions, ShareResolver, StoreError, TransportError,
};

pub const SERVICE_URL: &str = "https://cloud.example.com";
pub const OWNER: &str = "alice";

/// In-memory share store that counts every call.
#[derive(Default)]
pub struct StubStore {
    pub refuse_connection: bool,
    pub files: HashMap<String, u64>,
    pub shares: Vec<RemoteShare>,
    /// HTTP status returned by the share listing instead of `shares`.
    pub listing_status: Option<u16>,
    /// Returned by `create_public_share`; `None` makes creation fail.
    pub created: Option<RemoteShare>,
    pub file_id_calls: Cell<usize>,
    pub listing_calls: Cell<usize>,
    pub create_calls: Cell<usize>,
}

impl StubStore {
    pub fn with_file(path: &str, id: u64) -> Self {
        let mut store = Self::default();
        store.files.insert(path.to_string(), id);
        store
    }

    pub fn share(mut self, share: RemoteShare) -> Self {
        self.shares.push(share);
        self
    }

    pub fn creates(mut self, share: RemoteShare) -> Self {
        self.created = Some(share);
        self
    }
}

impl RemoteShareStore for StubStore {
    fn check_connection(&self) -> Result<(), StoreError> {
        if self.refuse_connection {
            return Err(StoreError::Status {
                status: 401,
                message: "Unauthorised".into(),
            });
        }
        Ok(())
    }

    fn file_id(&self, path: &str) -> Result<u64, StoreError> {
        self.file_id_calls.set(self.file_id_calls.get() + 1);
        self.files
            .get(path)
            .copied()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn shares_for_path(&self, _path: &str) -> Result<Vec<RemoteShare>, StoreError> {
        self.listing_calls.set(self.listing_calls.get() + 1);
        if let Some(status) = self.listing_status {
            return Err(StoreError::Status {
                status,
                message: "listing failed".into(),
            });
        }
        Ok(self.shares.clone())
    }

    fn create_public_share(&self, _path: &str) -> Result<RemoteShare, StoreError> {
        self.create_calls.set(self.create_calls.get() + 1);
        self.created.clone().ok_or_else(|| StoreError::Status {
            status: 403,
            message: "Public link sharing is disabled".into(),
        })
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(SERVICE_URL, OWNER, "pw").unwrap()
}

pub fn resolver(store: StubStore, options: ResolverOptions) -> ShareResolver<StubStore> {
    ShareResolver::connect(store, credentials(), options).unwrap()
}

/// Canned HTTP replies matched by URL substring; records every request.
#[derive(Default)]
pub struct StubTransport {
    routes: Vec<(String, HttpReply)>,
    pub requests: RefCell<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_part: &str, status: u16, body: &str) -> Self {
        self.routes.push((url_part.to_string(), HttpReply::new(status, body)));
        self
    }

    pub fn request_to(&self, url_part: &str) -> Option<HttpRequest> {
        self.requests
            .borrow()
            .iter()
            .find(|r| r.url.contains(url_part))
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl HttpTransport for StubTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpReply, TransportError> {
        let reply = self
            .routes
            .iter()
            .find(|(part, _)| request.url.contains(part.as_str()))
            .map(|(_, reply)| reply.clone());
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);
        reply.ok_or_else(|| TransportError(format!("no route for {url}")))
    }
}
