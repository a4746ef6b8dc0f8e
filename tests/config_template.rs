use tempfile::tempdir;

use cloud_quicklink::config::{create_template_config, load_config_from_xml_path};

#[test]
fn template_is_loadable_and_valid() {
    let td = tempdir().unwrap();
    let base = std::fs::canonicalize(td.path()).unwrap();
    let path = base.join("nested").join("config.xml");
    create_template_config(&path).unwrap();

    let cfg = load_config_from_xml_path(&path).expect("template parses");
    assert_eq!(cfg.url, "https://cloud.example.com");
    assert_eq!(cfg.users.len(), 1);
    assert!(cfg.quicklink.is_none());
    cfg.validate().expect("template validates");
}

#[test]
fn template_never_overwrites() {
    let td = tempdir().unwrap();
    let path = std::fs::canonicalize(td.path()).unwrap().join("config.xml");
    std::fs::write(&path, "<config/>").unwrap();
    assert!(create_template_config(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "<config/>");
}

#[cfg(unix)]
#[test]
fn template_is_private() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempdir().unwrap();
    let path = std::fs::canonicalize(td.path()).unwrap().join("config.xml");
    create_template_config(&path).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[cfg(unix)]
#[test]
fn symlinked_parent_refused() {
    let td = tempdir().unwrap();
    let real = td.path().join("real");
    std::fs::create_dir_all(&real).unwrap();
    let link = td.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let err = create_template_config(&link.join("config.xml")).unwrap_err();
    assert!(format!("{err}").contains("symlink"), "{err}");
}
