use std::fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use cloud_quicklink::path_has_symlink_ancestor;
use cloud_quicklink::platform::open_log_file_secure_append;
use tempfile::tempdir;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt as tsfmt, registry};

/// Appends written bytes into a shared Vec<u8>.
#[derive(Clone)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn structured_error_fields_reach_json_output() {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let make_writer = {
        let buf = buf.clone();
        move || BufferWriter(buf.clone())
    };
    let layer = tsfmt::layer()
        .event_format(tsfmt::format().json())
        .with_writer(make_writer);
    let subscriber = registry().with(EnvFilter::new("info")).with(layer);

    let dispatch = tracing::Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, || {
        error!(code = 21, kind = "resource_not_found", path = "/a.txt", "File not found on the server");
    });

    let contents = String::from_utf8_lossy(&buf.lock().unwrap()).to_string();
    let line: serde_json::Value = serde_json::from_str(contents.trim()).expect("one JSON line");
    assert_eq!(line["fields"]["code"], 21);
    assert_eq!(line["fields"]["kind"], "resource_not_found");
    assert_eq!(line["level"], "ERROR");
}

#[test]
fn file_logging_writes_to_custom_path() {
    let td = tempdir().expect("tempdir");
    let log_path = td.path().join("logs").join("cloud_quicklink_test.log");

    if path_has_symlink_ancestor(&log_path).unwrap() {
        eprintln!("Skipping: path has symlink ancestor: {}", log_path.display());
        return;
    }

    let file = open_log_file_secure_append(&log_path).expect("open_log_file_secure_append");
    let (writer, guard) = tracing_appender::non_blocking(file);
    let layer = tsfmt::layer().with_writer(writer).with_ansi(false).compact();
    let subscriber = registry().with(EnvFilter::new("info")).with(layer);

    let dispatch = tracing::Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, || {
        info!(url = "https://cloud.example.com/s/abc", "Share link resolved");
    });
    drop(guard); // flush

    let contents = fs::read_to_string(&log_path).expect("read log");
    assert!(contents.contains("Share link resolved"), "{contents}");
}

#[cfg(unix)]
#[test]
fn symlinked_log_directory_detected() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let real = base.join("real");
    fs::create_dir_all(&real).unwrap();
    let link = base.join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let log_path = link.join("cloud_quicklink.log");
    assert!(path_has_symlink_ancestor(&log_path).unwrap());
    assert!(!path_has_symlink_ancestor(&real.join("cloud_quicklink.log")).unwrap());
}
