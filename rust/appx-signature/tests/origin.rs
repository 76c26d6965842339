// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use appx_signature::origin::{classify, describe_extensions, is_store_origin};
use appx_signature::{SignatureOrigin, SignerCertificateChain, WINDOWS_STORE_OID};
use appx_signature_test_utils::{CertSpec, Issued, TestPki, MARKER_EXTENSION_OID};

fn chain_of(certs: &[&Issued]) -> SignerCertificateChain {
    SignerCertificateChain::new(certs.iter().map(|c| c.parsed()).collect())
}

#[test]
fn store_eku_classifies_as_store() {
    let pki = TestPki::store_signed();

    let chain = chain_of(&[&pki.leaf, &pki.intermediate]);

    assert!(is_store_origin(&chain).unwrap());
    assert_eq!(classify(&chain).unwrap(), SignatureOrigin::Store);
}

#[test]
fn marker_on_any_certificate_counts() {
    let root = Issued::self_signed(&CertSpec::ca("Root"));
    let intermediate =
        Issued::signed_by(&CertSpec::ca("Store Intermediate").with_store_eku(), &root);
    let leaf = Issued::signed_by(&CertSpec::leaf("Plain Leaf"), &intermediate);

    assert_eq!(
        classify(&chain_of(&[&leaf, &intermediate])).unwrap(),
        SignatureOrigin::Store
    );
}

#[test]
fn marker_text_in_unrecognized_extension_is_found() {
    // DER UTF8String holding the marker OID in dotted form.
    let mut content = vec![0x0c, WINDOWS_STORE_OID.len() as u8];
    content.extend_from_slice(WINDOWS_STORE_OID.as_bytes());
    let pki = TestPki::with_leaf(
        CertSpec::leaf("Custom Marker").with_custom_extension(MARKER_EXTENSION_OID, content),
    );

    assert_eq!(
        classify(&chain_of(&[&pki.leaf, &pki.intermediate])).unwrap(),
        SignatureOrigin::Store
    );
}

#[test]
fn no_marker_is_unknown() {
    let pki = TestPki::unmarked();

    let chain = chain_of(&[&pki.leaf, &pki.intermediate]);

    assert!(!is_store_origin(&chain).unwrap());
    assert_eq!(classify(&chain).unwrap(), SignatureOrigin::Unknown);
}

#[test]
fn describe_extensions_renders_eku_and_basic_constraints() {
    let pki = TestPki::store_signed();

    let leaf = describe_extensions(&pki.leaf.parsed()).unwrap();
    let eku = leaf
        .iter()
        .find(|e| e.oid == "2.5.29.37")
        .expect("leaf carries an EKU extension");
    assert_eq!(eku.name, "X509v3 Extended Key Usage");
    assert!(eku.value.contains("Code Signing"));
    assert!(eku.value.contains(WINDOWS_STORE_OID));

    let ca = describe_extensions(&pki.intermediate.parsed()).unwrap();
    let bc = ca.iter().find(|e| e.oid == "2.5.29.19").expect("CA carries basic constraints");
    assert!(bc.critical);
    assert_eq!(bc.value, "CA:TRUE");
}

#[test]
fn unknown_extension_is_named_by_oid() {
    let pki = TestPki::with_leaf(
        CertSpec::leaf("Custom").with_custom_extension(MARKER_EXTENSION_OID, vec![0x05, 0x00]),
    );

    let extensions = describe_extensions(&pki.leaf.parsed()).unwrap();
    let custom = extensions
        .iter()
        .find(|e| e.oid == "1.3.6.1.4.1.311.99.1")
        .expect("custom extension present");

    assert_eq!(custom.name, custom.oid);
    assert_eq!(custom.value, "..");
}
