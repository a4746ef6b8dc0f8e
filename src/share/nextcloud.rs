//! Nextcloud implementation of [`RemoteShareStore`].
//!
//! - OCS endpoints (JSON, `OCS-APIRequest: true`) for the user check and shares.
//! - WebDAV `PROPFIND` for the file id.
//!
//! All requests use HTTP basic auth with the owner's credentials.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use super::Credentials;
use super::store::{RemoteShare, RemoteShareStore, ShareType};
use crate::errors::StoreError;
use crate::http::{HttpMethod, HttpReply, HttpRequest, HttpTransport};
use crate::utils::first_element_text;

const USER_ENDPOINT: &[&str] = &["ocs", "v1.php", "cloud", "user"];
const SHARES_ENDPOINT: &[&str] = &["ocs", "v2.php", "apps", "files_sharing", "api", "v1", "shares"];
const DAV_FILES: &[&str] = &["remote.php", "dav", "files"];

const PROPFIND_FILEID: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">"#,
    r#"<d:prop><oc:fileid/></d:prop>"#,
    r#"</d:propfind>"#
);

/// OCS v1 reports success as 100, v2 as 200.
const OCS_OK: [i64; 2] = [100, 200];

#[derive(Debug, Deserialize)]
struct OcsEnvelope {
    ocs: Ocs,
}

// `data` is kept raw: failed calls send `[]` where an object would be expected.
#[derive(Debug, Deserialize)]
struct Ocs {
    meta: OcsMeta,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OcsMeta {
    statuscode: i64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ShareId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct OcsShare {
    id: ShareId,
    share_type: i64,
    #[serde(default)]
    url: Option<String>,
}

impl From<OcsShare> for RemoteShare {
    fn from(s: OcsShare) -> Self {
        RemoteShare {
            id: match s.id {
                ShareId::Number(n) => n.to_string(),
                ShareId::Text(t) => t,
            },
            share_type: ShareType::from_code(s.share_type),
            url: s.url.filter(|u| !u.trim().is_empty()),
        }
    }
}

/// Share store speaking to a Nextcloud server as the file owner.
pub struct NextcloudStore<T: HttpTransport> {
    base: Url,
    owner: String,
    password: String,
    transport: T,
}

impl<T: HttpTransport> NextcloudStore<T> {
    pub fn new(credentials: &Credentials, transport: T) -> Result<Self, StoreError> {
        let base = Url::parse(credentials.service_url()).map_err(|e| {
            StoreError::Malformed(format!("service url '{}': {e}", credentials.service_url()))
        })?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Malformed(format!(
                "service url '{}' cannot be used as a base",
                credentials.service_url()
            )));
        }
        Ok(Self {
            base,
            owner: credentials.owner().to_string(),
            password: credentials.password().to_string(),
            transport,
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed(format!("service url '{}' cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn ocs_request(&self, method: HttpMethod, url: Url) -> HttpRequest {
        HttpRequest::new(method, url.as_str())
            .basic_auth(&self.owner, &self.password)
            .header("OCS-APIRequest", "true")
            .header("Accept", "application/json")
    }

    fn send(&self, request: HttpRequest) -> Result<HttpReply, StoreError> {
        debug!(method = request.method.as_str(), url = %request.url, "Nextcloud request");
        let reply = self.transport.execute(request)?;
        trace!(status = reply.status, "Nextcloud reply");
        Ok(reply)
    }

    /// Decode an OCS JSON reply, mapping HTTP and OCS status failures.
    fn decode_ocs<D: DeserializeOwned>(&self, reply: HttpReply) -> Result<Option<D>, StoreError> {
        let parsed: Result<OcsEnvelope, _> = serde_json::from_str(&reply.body);
        match parsed {
            Ok(env) => {
                let Ocs { meta, data } = env.ocs;
                if !OCS_OK.contains(&meta.statuscode) {
                    let status = u16::try_from(meta.statuscode).unwrap_or(reply.status);
                    return Err(StoreError::Status {
                        status,
                        message: meta.message.unwrap_or_else(|| "OCS request failed".into()),
                    });
                }
                if data.is_null() {
                    return Ok(None);
                }
                serde_json::from_value(data)
                    .map(Some)
                    .map_err(|e| StoreError::Malformed(format!("OCS data: {e}")))
            }
            Err(_) if !reply.is_success() => Err(StoreError::Status {
                status: reply.status,
                message: snippet(&reply.body),
            }),
            Err(e) => Err(StoreError::Malformed(format!("OCS reply: {e}"))),
        }
    }

    fn shares_url(&self) -> Result<Url, StoreError> {
        let mut url = self.endpoint(SHARES_ENDPOINT.iter().copied())?;
        url.query_pairs_mut().append_pair("format", "json");
        Ok(url)
    }
}

impl<T: HttpTransport> RemoteShareStore for NextcloudStore<T> {
    fn check_connection(&self) -> Result<(), StoreError> {
        let mut url = self.endpoint(USER_ENDPOINT.iter().copied())?;
        url.query_pairs_mut().append_pair("format", "json");
        let reply = self.send(self.ocs_request(HttpMethod::Get, url))?;
        self.decode_ocs::<serde_json::Value>(reply)?;
        Ok(())
    }

    fn file_id(&self, path: &str) -> Result<u64, StoreError> {
        let segments = DAV_FILES
            .iter()
            .copied()
            .chain(std::iter::once(self.owner.as_str()))
            .chain(path.split('/').filter(|s| !s.is_empty()));
        let url = self.endpoint(segments)?;
        let request = HttpRequest::new(HttpMethod::Propfind, url.as_str())
            .basic_auth(&self.owner, &self.password)
            .header("Depth", "0")
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_FILEID);

        let reply = self.send(request)?;
        if reply.status == 404 {
            return Err(StoreError::NotFound(path.to_string()));
        }
        if !reply.is_success() {
            return Err(StoreError::Status {
                status: reply.status,
                message: snippet(&reply.body),
            });
        }
        let text = first_element_text(&reply.body, "fileid")
            .map_err(|e| StoreError::Malformed(format!("PROPFIND reply: {e}")))?
            .ok_or_else(|| StoreError::Malformed("PROPFIND reply has no fileid".into()))?;
        text.parse::<u64>()
            .map_err(|e| StoreError::Malformed(format!("fileid '{text}': {e}")))
    }

    fn shares_for_path(&self, path: &str) -> Result<Vec<RemoteShare>, StoreError> {
        let mut url = self.shares_url()?;
        url.query_pairs_mut().append_pair("path", path);
        let reply = self.send(self.ocs_request(HttpMethod::Get, url))?;
        if reply.status == 404 {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let shares: Vec<OcsShare> = self.decode_ocs(reply)?.unwrap_or_default();
        Ok(shares.into_iter().map(RemoteShare::from).collect())
    }

    fn create_public_share(&self, path: &str) -> Result<RemoteShare, StoreError> {
        let url = self.shares_url()?;
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("path", path)
            .append_pair("shareType", &ShareType::PublicLink.code().to_string())
            .finish();
        let request = self
            .ocs_request(HttpMethod::Post, url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form);
        let reply = self.send(request)?;
        let share: OcsShare = self
            .decode_ocs(reply)?
            .ok_or_else(|| StoreError::Malformed("share creation reply has no data".into()))?;
        Ok(share.into())
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".into();
    }
    trimmed.chars().take(200).collect()
}
