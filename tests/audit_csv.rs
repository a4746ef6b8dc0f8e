mod common;

use std::fs;
use std::path::Path;
use std::thread;

use chrono::{Local, TimeZone};
use cloud_quicklink::audit::append_record;
use cloud_quicklink::{AuditRecord, LinkError, LinkSource, RemoteShare, Resolution, ResolverOptions};
use common::{StubStore, resolver};
use tempfile::tempdir;

const HEADER: &str = "date|time|file|owner|url|shareid|fileid";

fn rows(path: &Path) -> Vec<String> {
    let text = fs::read_to_string(path).unwrap();
    assert!(text.ends_with("\r\n"), "rows end with CRLF: {text:?}");
    text.split_terminator("\r\n").map(str::to_string).collect()
}

#[test]
fn header_once_then_one_row_per_file() {
    let td = tempdir().unwrap();
    let log = td.path().join("links.csv");

    let mut private = resolver(StubStore::with_file("/Docs/plan.pdf", 42), ResolverOptions::new());
    private.set_file_path("/Docs/plan.pdf").unwrap();
    private.append_audit_record(&log).unwrap();

    let store = StubStore::with_file("/Docs/manual.pdf", 43)
        .share(RemoteShare::public_link("7", "https://cloud.example.com/s/abc"));
    let mut public = resolver(store, ResolverOptions::new());
    public.set_file_path("/Docs/manual.pdf").unwrap();
    public.append_audit_record(&log).unwrap();

    let rows = rows(&log);
    assert_eq!(rows.len(), 3, "{rows:?}");
    assert_eq!(rows[0], HEADER);

    let first: Vec<&str> = rows[1].split('|').collect();
    assert_eq!(first.len(), 7);
    assert_eq!(
        &first[2..],
        ["/Docs/plan.pdf", "alice", "https://cloud.example.com/index.php/f/42", "", "42"]
    );
    let second: Vec<&str> = rows[2].split('|').collect();
    assert_eq!(
        &second[2..],
        ["/Docs/manual.pdf", "alice", "https://cloud.example.com/s/abc", "7", "43"]
    );
}

#[test]
fn existing_file_gets_no_second_header() {
    let td = tempdir().unwrap();
    let log = td.path().join("links.csv");
    fs::write(&log, format!("{HEADER}\r\n")).unwrap();

    let mut r = resolver(StubStore::with_file("/a.txt", 1), ResolverOptions::new());
    r.set_file_path("/a.txt").unwrap();
    r.append_audit_record(&log).unwrap();

    let rows = rows(&log);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|r| r.as_str() == HEADER).count(), 1);
}

#[test]
fn lock_is_released_after_append() {
    use fs2::FileExt;

    let td = tempdir().unwrap();
    let log = td.path().join("links.csv");
    let mut r = resolver(StubStore::with_file("/a.txt", 1), ResolverOptions::new());
    r.set_file_path("/a.txt").unwrap();
    r.append_audit_record(&log).unwrap();

    let other = fs::OpenOptions::new().append(true).open(&log).unwrap();
    other.try_lock_exclusive().expect("audit file left locked");
    FileExt::unlock(&other).unwrap();
}

#[test]
fn date_and_time_columns() {
    let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
    let resolution = Resolution {
        share_url: "https://c/index.php/f/1".into(),
        public_share_id: None,
        file_id: 1,
        source: LinkSource::Private,
    };
    let record = AuditRecord::new(at, "/a.txt", "alice", &resolution);
    assert_eq!(record.date, "2024-03-09");
    assert_eq!(record.time, "07:05:01");
}

#[test]
fn concurrent_appends_do_not_interleave() {
    let td = tempdir().unwrap();
    let log = td.path().join("links.csv");
    let resolution = Resolution {
        share_url: "https://cloud.example.com/index.php/f/9".into(),
        public_share_id: None,
        file_id: 9,
        source: LinkSource::Private,
    };

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let log = log.clone();
            let resolution = resolution.clone();
            thread::spawn(move || {
                let record = AuditRecord::new(Local::now(), &format!("/file{i}.txt"), "alice", &resolution);
                append_record(&log, &record).unwrap()
            })
        })
        .collect();
    let headers_written = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|written| *written)
        .count();

    assert_eq!(headers_written, 1);
    let rows = rows(&log);
    assert_eq!(rows.len(), 9);
    assert_eq!(rows[0], HEADER);
    assert!(rows[1..].iter().all(|r| r.split('|').count() == 7), "{rows:?}");
}

#[test]
fn directory_destination_is_audit_write_failed() {
    let td = tempdir().unwrap();
    let mut r = resolver(StubStore::with_file("/a.txt", 1), ResolverOptions::new());
    r.set_file_path("/a.txt").unwrap();
    let err = r.append_audit_record(td.path()).unwrap_err();
    assert!(matches!(err, LinkError::AuditWriteFailed { .. }), "{err:?}");
}

#[test]
fn blank_destination_is_invalid_parameter() {
    let mut r = resolver(StubStore::with_file("/a.txt", 1), ResolverOptions::new());
    r.set_file_path("/a.txt").unwrap();
    let err = r.append_audit_record(Path::new("")).unwrap_err();
    assert!(matches!(err, LinkError::InvalidParameter { name: "destination", .. }), "{err:?}");
}
