// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use appx_signature::signed_data::parse_signer_certificates;
use appx_signature::SignedContainer;
use appx_signature_test_utils::{build_signed_data, TestPki};
use std::io::Cursor;

#[test]
fn container_yields_embedded_certificates() {
    let pki = TestPki::store_signed();

    let container = SignedContainer::read_from(&mut Cursor::new(pki.p7x())).unwrap();
    let chain = container.signer_certificates().unwrap();

    let subjects: Vec<&str> = chain.iter().map(|c| c.subject()).collect();
    assert_eq!(subjects, ["CN=Test Store Publisher", "CN=Test Intermediate CA"]);
}

#[test]
fn embedded_order_is_kept() {
    let pki = TestPki::store_signed();

    let blob = build_signed_data(&[pki.intermediate.der(), pki.leaf.der(), pki.root.der()]);
    let chain = parse_signer_certificates(&blob).unwrap();

    let subjects: Vec<&str> = chain.iter().map(|c| c.subject()).collect();
    assert_eq!(
        subjects,
        ["CN=Test Intermediate CA", "CN=Test Store Publisher", "CN=Test Root CA"]
    );
}

#[test]
fn repeated_certificates_are_kept() {
    let pki = TestPki::store_signed();

    let blob = build_signed_data(&[pki.leaf.der(), pki.leaf.der(), pki.intermediate.der()]);
    let chain = parse_signer_certificates(&blob).unwrap();

    assert_eq!(chain.len(), 3);
    assert_eq!(chain.as_slice()[0], chain.as_slice()[1]);
}

#[test]
fn embedded_certificates_keep_their_der() {
    let pki = TestPki::store_signed();

    let chain = parse_signer_certificates(&build_signed_data(&[pki.leaf.der()])).unwrap();

    assert_eq!(chain.len(), 1);
    assert_eq!(chain.as_slice()[0].der(), pki.leaf.der().as_slice());
}

#[test]
fn trailing_garbage_after_content_info_is_rejected() {
    let pki = TestPki::store_signed();
    let mut blob = build_signed_data(&pki.signer_certificates());
    blob.extend_from_slice(&[0, 0, 0]);

    assert!(parse_signer_certificates(&blob).unwrap_err().is_signature_invalid());
}
