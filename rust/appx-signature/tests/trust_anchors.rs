// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use appx_signature::{
    decode_base64_certificate, encode_pem_certificate, TrustAnchorConfig, TrustAnchorSet,
};
use appx_signature_test_utils::{CertSpec, Issued};

#[test]
fn generated_pem_decodes_to_the_certificate_der() {
    let root = Issued::self_signed(&CertSpec::ca("Pem Root"));

    assert_eq!(decode_base64_certificate(&root.pem()).unwrap(), root.der());
}

#[test]
fn encoded_pem_is_wrapped_and_decodes_back() {
    let root = Issued::self_signed(&CertSpec::ca("Pem Root"));
    let pem = encode_pem_certificate(&root.der());

    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
    assert!(pem.lines().all(|line| line.len() <= 64));
    assert_eq!(decode_base64_certificate(&pem).unwrap(), root.der());
}

#[test]
fn builds_store_and_ordered_chain() {
    let a = Issued::self_signed(&CertSpec::ca("Root A"));
    let b = Issued::self_signed(&CertSpec::ca("Root B"));

    let set = TrustAnchorSet::build(&TrustAnchorConfig::new([a.pem(), b.pem()])).unwrap();

    assert_eq!(set.len(), 2);
    assert_eq!(set.ordered_chain()[0].subject(), "CN=Root A");
    assert_eq!(set.ordered_chain()[1].subject(), "CN=Root B");
    assert!(set.contains(&a.parsed()));
}

#[test]
fn duplicate_roots_are_stored_once() {
    let a = Issued::self_signed(&CertSpec::ca("Root A"));

    let set = TrustAnchorSet::build(&TrustAnchorConfig::new([a.pem(), a.pem()])).unwrap();

    assert_eq!(set.len(), 1);
}

#[test]
fn malformed_root_aborts_the_build() {
    let a = Issued::self_signed(&CertSpec::ca("Root A"));
    let malformed = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----".to_string();
    let config = TrustAnchorConfig::new([a.pem(), malformed]);

    let err = TrustAnchorSet::build(&config).unwrap_err();

    assert!(err.is_signature_invalid());
    assert!(err.to_string().contains("could not add cert to keychain"));
}

#[test]
fn empty_config_is_rejected() {
    assert!(TrustAnchorSet::build(&TrustAnchorConfig::default())
        .unwrap_err()
        .is_signature_invalid());
}

#[test]
fn pem_bundle_splits_per_certificate() {
    let a = Issued::self_signed(&CertSpec::ca("Root A"));
    let b = Issued::self_signed(&CertSpec::ca("Root B"));
    let bundle = format!("{}\n{}\n# trailing comment\n", a.pem(), b.pem());

    let config = TrustAnchorConfig::from_pem_bundle(&bundle);

    assert_eq!(config.len(), 2);
    let set = TrustAnchorSet::build(&config).unwrap();
    assert!(set.contains(&a.parsed()));
    assert!(set.contains(&b.parsed()));
}
