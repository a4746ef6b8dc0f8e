use cloud_quicklink::{LinkError, SHARED_SECRET_KEY, StoredCredential};

#[test]
fn single_field_is_plain_text() {
    let c = StoredCredential::parse("letmein").unwrap();
    assert!(!c.is_encrypted());
    assert_eq!(c.reveal().unwrap(), "letmein");
    assert_eq!(c.to_token(), "letmein");
}

#[test]
fn two_fields_are_ciphertext_and_iv() {
    let c: StoredCredential = "5RYJGQDtJUEn,poy8R^Sj#)4LAvvR".parse().unwrap();
    assert!(c.is_encrypted());
    assert_eq!(
        c.reveal_with("iliketoflylittleaeroplaneswithorwithoutengines").unwrap(),
        "Cessna172"
    );
}

#[test]
fn three_fields_rejected() {
    let err = StoredCredential::parse("a,b,c").unwrap_err();
    assert!(matches!(err, LinkError::InvalidParameter { name: "password", .. }), "{err:?}");
}

#[test]
fn sealed_token_reveals_with_shared_key() {
    let sealed = StoredCredential::seal("Grate4848Piezzo##", "oSHUR#j/cKhN@eLH").unwrap();
    let token = sealed.to_token();
    assert!(token.ends_with(",oSHUR#j/cKhN@eLH"), "{token}");
    let parsed = StoredCredential::parse(&token).unwrap();
    assert_eq!(parsed.reveal().unwrap(), "Grate4848Piezzo##");
    assert_eq!(parsed.reveal_with(SHARED_SECRET_KEY).unwrap(), "Grate4848Piezzo##");
}

#[test]
fn iv_with_comma_cannot_be_sealed() {
    let err = StoredCredential::seal("pw", "0123456789,abcdef").unwrap_err();
    assert!(matches!(err, LinkError::InvalidParameter { .. }));
}

#[test]
fn debug_hides_ciphertext() {
    let c = StoredCredential::parse("5RYJGQDtJUEn,poy8R^Sj#)4LAvvR").unwrap();
    let shown = format!("{c:?}");
    assert!(!shown.contains("5RYJGQDtJUEn"), "{shown}");
}
