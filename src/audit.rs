//! Audit data log.
//!
//! One `|`-delimited row per resolved file: `date|time|file|owner|url|shareid|fileid`.
//! The header is written only when the destination is empty when it is opened.
//! Appends take an exclusive advisory lock so concurrent runs never interleave rows.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use fs2::FileExt;
use tracing::debug;

use crate::errors::LinkError;
use crate::share::store::RemoteShareStore;
use crate::share::{Resolution, ShareResolver};

pub const AUDIT_FIELDS: [&str; 7] = ["date", "time", "file", "owner", "url", "shareid", "fileid"];
pub const AUDIT_DELIMITER: char = '|';
const ROW_END: &str = "\r\n";

/// One data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub date: String,
    pub time: String,
    pub file: String,
    pub owner: String,
    pub url: String,
    pub share_id: Option<String>,
    pub file_id: u64,
}

impl AuditRecord {
    pub fn new(at: DateTime<Local>, file: &str, owner: &str, resolution: &Resolution) -> Self {
        Self {
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M:%S").to_string(),
            file: file.to_string(),
            owner: owner.to_string(),
            url: resolution.share_url.clone(),
            share_id: resolution.public_share_id.clone(),
            file_id: resolution.file_id,
        }
    }

    fn fields(&self) -> [String; 7] {
        [
            self.date.clone(),
            self.time.clone(),
            self.file.clone(),
            self.owner.clone(),
            self.url.clone(),
            self.share_id.clone().unwrap_or_default(),
            self.file_id.to_string(),
        ]
    }
}

/// Render one row (with line ending).
pub fn format_row<S: AsRef<str>>(fields: &[S]) -> String {
    let mut line = fields
        .iter()
        .map(|f| quote_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(&AUDIT_DELIMITER.to_string());
    line.push_str(ROW_END);
    line
}

fn quote_field(value: &str) -> String {
    if value.contains([AUDIT_DELIMITER, '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Append `record` to `destination`, writing the header first if the file is empty.
/// Returns true when the header was written.
pub fn append_record(destination: &Path, record: &AuditRecord) -> Result<bool, LinkError> {
    if destination.as_os_str().is_empty() {
        return Err(LinkError::invalid_parameter("destination", "must not be blank"));
    }
    let fail = |e: std::io::Error| LinkError::AuditWriteFailed {
        path: destination.to_path_buf(),
        reason: e.to_string(),
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(destination)
        .map_err(fail)?;
    file.lock_exclusive().map_err(fail)?;

    let result = (|| -> std::io::Result<bool> {
        let empty = file.metadata()?.len() == 0;
        let mut buf = String::new();
        if empty {
            buf.push_str(&format_row(&AUDIT_FIELDS));
        }
        buf.push_str(&format_row(&record.fields()));
        file.write_all(buf.as_bytes())?;
        file.flush()?;
        Ok(empty)
    })();

    if let Err(e) = FileExt::unlock(&file) {
        debug!(dest = %destination.display(), error = %e, "Audit lock release failed; dropped with the handle");
    }
    let header_written = result.map_err(fail)?;
    debug!(dest = %destination.display(), header_written, "Audit record appended");
    Ok(header_written)
}

impl<S: RemoteShareStore> ShareResolver<S> {
    /// Resolve if needed, then append this file's record to `destination`.
    pub fn append_audit_record(&mut self, destination: &Path) -> Result<(), LinkError> {
        let resolution = self.resolve()?.clone();
        let file = self
            .file_path()
            .ok_or_else(|| LinkError::InvalidState("no file path set".into()))?;
        let record = AuditRecord::new(Local::now(), file, self.owner(), &resolution);
        append_record(destination, &record)?;
        Ok(())
    }
}
