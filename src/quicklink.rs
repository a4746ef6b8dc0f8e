//! Quicklink publishing.
//!
//! Registers a resolved share with the business API in two calls:
//! - `POST <base>/pronto/rest/<web resource>/login` with username/password headers,
//!   returning an XML document with a `<token>` element;
//! - `POST <base>/pronto/rest/<web resource>/api/vapi-ql` with that token and an
//!   XML `<Data>` body describing the file and its link.
//!
//! The reply carries `APIResponseStatus/Code` (`0` on success) and, on success,
//! the created record in `ResponseFields`.

use std::fmt;
use std::io;

use quick_xml::Writer;
use quick_xml::de::from_str as from_xml_str;
use quick_xml::events::{BytesDecl, BytesText, Event};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::errors::LinkError;
use crate::http::{HttpMethod, HttpReply, HttpRequest, HttpTransport};
use crate::share::ShareResolver;
use crate::share::store::RemoteShareStore;
use crate::utils::first_element_text;

/// Business API location and service account.
#[derive(Clone)]
pub struct QuicklinkEndpoint {
    base_url: String,
    web_resource: String,
    user: String,
    password: String,
}

impl QuicklinkEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        web_resource: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, LinkError> {
        let endpoint = Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            web_resource: web_resource.into().trim().trim_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
        };
        if endpoint.base_url.is_empty() {
            return Err(LinkError::invalid_parameter("quicklink url", "must not be blank"));
        }
        if endpoint.web_resource.is_empty() {
            return Err(LinkError::invalid_parameter("quicklink web_resource", "must not be blank"));
        }
        if endpoint.user.trim().is_empty() {
            return Err(LinkError::invalid_parameter("quicklink user", "must not be blank"));
        }
        if endpoint.password.is_empty() {
            return Err(LinkError::invalid_parameter("quicklink password", "must not be blank"));
        }
        Ok(endpoint)
    }

    fn rest_root(&self) -> String {
        format!("{}/pronto/rest/{}", self.base_url, self.web_resource)
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.rest_root())
    }

    pub fn api_url(&self) -> String {
        format!("{}/api/vapi-ql", self.rest_root())
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl fmt::Debug for QuicklinkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuicklinkEndpoint")
            .field("base_url", &self.base_url)
            .field("web_resource", &self.web_resource)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of the quicklink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuicklinkRequest {
    pub filename: String,
    pub owner: String,
    pub share_url: String,
    pub public_share_id: Option<String>,
    pub file_id: u64,
}

impl QuicklinkRequest {
    /// Serialize as `<?xml ...?><Data>...</Data>`.
    /// `publicshareid` is omitted when absent and `fileid` when zero.
    pub fn to_xml(&self) -> io::Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.create_element("Data").write_inner_content(|w| {
            w.create_element("filename")
                .write_text_content(BytesText::new(&self.filename))?;
            w.create_element("owner")
                .write_text_content(BytesText::new(&self.owner))?;
            w.create_element("shareurl")
                .write_text_content(BytesText::new(&self.share_url))?;
            if let Some(id) = &self.public_share_id {
                w.create_element("publicshareid")
                    .write_text_content(BytesText::new(id))?;
            }
            if self.file_id != 0 {
                w.create_element("fileid")
                    .write_text_content(BytesText::new(&self.file_id.to_string()))?;
            }
            Ok(())
        })?;
        String::from_utf8(writer.into_inner()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Record created by the business API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuicklinkReceipt {
    pub company: String,
    pub object: String,
    pub keys: String,
    pub seq: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "APIResponseStatus")]
    status: ApiStatus,
    #[serde(rename = "ResponseFields", default)]
    fields: Option<ResponseFields>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseFields {
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    keys: Option<String>,
    #[serde(default)]
    seq: Option<String>,
}

/// Failure context for one publish call.
struct Call<'a> {
    path: &'a str,
    owner: &'a str,
}

impl Call<'_> {
    fn failure(&self, code: impl Into<String>, message: impl Into<String>) -> LinkError {
        LinkError::RemoteApiFailure {
            path: self.path.to_string(),
            owner: self.owner.to_string(),
            code: code.into(),
            message: message.into(),
        }
    }

    fn send(&self, transport: &dyn HttpTransport, request: HttpRequest) -> Result<HttpReply, LinkError> {
        transport
            .execute(request)
            .map_err(|e| self.failure("transport", e.to_string()))
    }
}

fn request_token(call: &Call<'_>, endpoint: &QuicklinkEndpoint, transport: &dyn HttpTransport) -> Result<String, LinkError> {
    let url = endpoint.login_url();
    debug!(url = %url, user = %endpoint.user, "Getting quicklink authorization token");
    let request = HttpRequest::new(HttpMethod::Post, url.as_str())
        .header("X-Pronto-Username", &endpoint.user)
        .header("X-Pronto-Password", &endpoint.password)
        .header("Content-Type", "application/xml");
    let reply = call.send(transport, request)?;
    if reply.status != 200 {
        error!(status = reply.status, url = %url, "Token request rejected");
        return Err(call.failure(reply.status.to_string(), "Unable to get token"));
    }
    let token = first_element_text(&reply.body, "token")
        .map_err(|e| call.failure("malformed", format!("token reply: {e}")))?
        .filter(|t| !t.is_empty())
        .ok_or_else(|| call.failure("no_token", "token reply has no <token> element"))?;
    debug!("Token successfully retrieved");
    Ok(token)
}

fn parse_api_response(call: &Call<'_>, body: &str) -> Result<QuicklinkReceipt, LinkError> {
    let parsed: ApiResponse =
        from_xml_str(body).map_err(|e| call.failure("malformed", format!("API reply: {e}")))?;
    let code = parsed.status.code.trim().to_string();
    if code != "0" {
        let message = parsed.status.message.unwrap_or_default();
        error!(code = %code, message = %message, "Quicklink API returned an error");
        return Err(call.failure(code, message));
    }
    let fields = parsed.fields.unwrap_or_default();
    Ok(QuicklinkReceipt {
        company: fields.company.unwrap_or_default(),
        object: fields.object.unwrap_or_default(),
        keys: fields.keys.unwrap_or_default(),
        seq: fields.seq.unwrap_or_default(),
    })
}

impl<S: RemoteShareStore> ShareResolver<S> {
    /// Resolve if needed, then register the link as a quicklink.
    /// On success the receipt is also appended to [`ShareResolver::messages`].
    pub fn publish_quicklink(
        &mut self,
        endpoint: &QuicklinkEndpoint,
        transport: &dyn HttpTransport,
    ) -> Result<QuicklinkReceipt, LinkError> {
        let resolution = self.resolve()?.clone();
        let path = self.file_path().unwrap_or_default().to_string();
        let owner = self.owner().to_string();
        if path.trim().is_empty() {
            return Err(LinkError::InvalidState("file path must be set before publishing".into()));
        }
        if resolution.share_url.trim().is_empty() {
            return Err(LinkError::InvalidState("share url must be resolved before publishing".into()));
        }

        let call = Call { path: &path, owner: &owner };
        let body = QuicklinkRequest {
            filename: path.clone(),
            owner: owner.clone(),
            share_url: resolution.share_url.clone(),
            public_share_id: resolution.public_share_id.clone(),
            file_id: resolution.file_id,
        }
        .to_xml()
        .map_err(|e| call.failure("request", e.to_string()))?;

        info!(filename = %path, owner = %owner, shareurl = %resolution.share_url, "Create quicklink via API");
        let token = request_token(&call, endpoint, transport)?;
        let request = HttpRequest::new(HttpMethod::Post, endpoint.api_url())
            .header("Content-Type", "application/xml")
            .header("X-Pronto-Token", token)
            .body(body);
        let reply = call.send(transport, request)?;
        if reply.status != 200 {
            error!(status = reply.status, "Call to quicklink API failed");
            return Err(call.failure(reply.status.to_string(), reply.body.trim().to_string()));
        }
        let receipt = parse_api_response(&call, &reply.body)?;

        info!(
            company = %receipt.company,
            object = %receipt.object,
            keys = %receipt.keys,
            seq = %receipt.seq,
            "Quicklink API successful"
        );
        self.push_message("Quicklink Added");
        self.push_message(format!("Company {}", receipt.company));
        self.push_message(format!("Pronto Object {}", receipt.object));
        self.push_message(format!("Keys {}", receipt.keys));
        self.push_message(format!("Sequence {}", receipt.seq));
        Ok(receipt)
    }
}
