// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test-only utilities for composing signature validation scenarios.
//!
//! Certificates are generated at test time with `rcgen`, written into a PKCS#7 `SignedData`
//! with `cms` and `der`, and framed as P7X containers.

use appx_signature::signed_data::ID_SIGNED_DATA;
use appx_signature::{ParsedCertificate, TrustAnchorConfig, P7X_FILE_ID, WINDOWS_STORE_OID};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{DigestAlgorithmIdentifiers, EncapsulatedContentInfo, SignerInfos};
use const_oid::ObjectIdentifier;
use der::asn1::SetOfVec;
use der::{Any, Encode, EncodeValue, Tag, TagNumber, Tagged};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CustomExtension, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose,
};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// `id-data` content type.
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

/// Private OID used for an extension that carries the store marker as raw text.
pub const MARKER_EXTENSION_OID: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 99, 1];

/// `WINDOWS_STORE_OID` as rcgen arcs.
pub fn store_oid_arcs() -> Vec<u64> {
    WINDOWS_STORE_OID
        .split('.')
        .map(|arc| arc.parse().expect("static OID"))
        .collect()
}

/// How a generated certificate should look.
#[derive(Debug, Clone)]
pub struct CertSpec {
    pub common_name: String,
    pub is_ca: IsCa,
    pub store_eku: bool,
    /// Emitted only when non-empty.
    pub key_usages: Vec<KeyUsagePurpose>,
    /// `(oid, content, critical)`.
    pub custom_extension: Option<(Vec<u64>, Vec<u8>, bool)>,
    /// `(year, month, day)`; rcgen defaults apply when `None`.
    pub not_before: Option<(i32, u8, u8)>,
    pub not_after: Option<(i32, u8, u8)>,
}

impl CertSpec {
    pub fn ca(common_name: &str) -> Self {
        Self::leaf(common_name).with_ca(IsCa::Ca(BasicConstraints::Unconstrained))
    }

    pub fn leaf(common_name: &str) -> Self {
        Self {
            common_name: common_name.to_string(),
            is_ca: IsCa::NoCa,
            store_eku: false,
            key_usages: Vec::new(),
            custom_extension: None,
            not_before: None,
            not_after: None,
        }
    }

    pub fn with_ca(mut self, is_ca: IsCa) -> Self {
        self.is_ca = is_ca;
        self
    }

    pub fn with_store_eku(mut self) -> Self {
        self.store_eku = true;
        self
    }

    pub fn with_key_usages(mut self, key_usages: Vec<KeyUsagePurpose>) -> Self {
        self.key_usages = key_usages;
        self
    }

    pub fn with_custom_extension(mut self, oid: &[u64], content: Vec<u8>) -> Self {
        self.custom_extension = Some((oid.to_vec(), content, false));
        self
    }

    pub fn with_critical_extension(mut self, oid: &[u64], content: Vec<u8>) -> Self {
        self.custom_extension = Some((oid.to_vec(), content, true));
        self
    }

    pub fn valid_between(mut self, not_before: (i32, u8, u8), not_after: (i32, u8, u8)) -> Self {
        self.not_before = Some(not_before);
        self.not_after = Some(not_after);
        self
    }

    fn params(&self) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("empty SAN list");
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, self.common_name.as_str());
        params.distinguished_name = dn;
        params.is_ca = self.is_ca.clone();
        if self.store_eku {
            params.extended_key_usages = vec![
                ExtendedKeyUsagePurpose::CodeSigning,
                ExtendedKeyUsagePurpose::Other(store_oid_arcs()),
            ];
        }
        params.key_usages = self.key_usages.clone();
        if let Some((oid, content, critical)) = &self.custom_extension {
            let mut extension = CustomExtension::from_oid_content(oid, content.clone());
            extension.set_criticality(*critical);
            params.custom_extensions = vec![extension];
        }
        if let Some((y, m, d)) = self.not_before {
            params.not_before = rcgen::date_time_ymd(y, m, d);
        }
        if let Some((y, m, d)) = self.not_after {
            params.not_after = rcgen::date_time_ymd(y, m, d);
        }
        params
    }
}

/// A generated certificate and its private key.
pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn self_signed(spec: &CertSpec) -> Self {
        let key = KeyPair::generate().expect("generate key");
        let cert = spec.params().self_signed(&key).expect("self sign");
        Self { cert, key }
    }

    pub fn signed_by(spec: &CertSpec, issuer: &Issued) -> Self {
        let key = KeyPair::generate().expect("generate key");
        let cert = spec
            .params()
            .signed_by(&key, &issuer.cert, &issuer.key)
            .expect("sign certificate");
        Self { cert, key }
    }

    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    pub fn pem(&self) -> String {
        self.cert.pem()
    }

    pub fn parsed(&self) -> ParsedCertificate {
        ParsedCertificate::from_der(&self.der()).expect("parse generated certificate")
    }
}

/// A root, an intermediate issued by it, and a leaf issued by the intermediate.
pub struct TestPki {
    pub root: Issued,
    pub intermediate: Issued,
    pub leaf: Issued,
}

impl TestPki {
    /// Leaf carries the store EKU.
    pub fn store_signed() -> Self {
        Self::with_leaf(CertSpec::leaf("Test Store Publisher").with_store_eku())
    }

    /// Leaf has no origin marker.
    pub fn unmarked() -> Self {
        Self::with_leaf(CertSpec::leaf("Test Sideload Publisher"))
    }

    pub fn with_leaf(leaf: CertSpec) -> Self {
        let root = Issued::self_signed(&CertSpec::ca("Test Root CA"));
        let intermediate = Issued::signed_by(&CertSpec::ca("Test Intermediate CA"), &root);
        let leaf = Issued::signed_by(&leaf, &intermediate);
        Self {
            root,
            intermediate,
            leaf,
        }
    }

    /// Trusts only the root.
    pub fn trust_config(&self) -> TrustAnchorConfig {
        TrustAnchorConfig::new([self.root.pem()])
    }

    /// Leaf and intermediate, without the root.
    pub fn signer_certificates(&self) -> Vec<Vec<u8>> {
        vec![self.leaf.der(), self.intermediate.der()]
    }

    pub fn p7x(&self) -> Vec<u8> {
        build_p7x(&build_signed_data(&self.signer_certificates()))
    }
}

/// DER `ContentInfo(SignedData)` carrying `certificates` in the given order, and no signer
/// infos.
///
/// The certificate set is written element by element, so callers can produce unsorted or
/// repeated entries the way real signers do.
pub fn build_signed_data(certificates: &[Vec<u8>]) -> Vec<u8> {
    let mut body = CmsVersion::V1.to_der().expect("encode version");
    body.extend(
        DigestAlgorithmIdentifiers::new()
            .to_der()
            .expect("encode digest algorithms"),
    );
    body.extend(
        EncapsulatedContentInfo {
            econtent_type: ID_DATA,
            econtent: None,
        }
        .to_der()
        .expect("encode encapsulated content info"),
    );
    if !certificates.is_empty() {
        let certificate_set = Tag::ContextSpecific {
            constructed: true,
            number: TagNumber::N0,
        };
        body.extend(
            Any::new(certificate_set, certificates.concat())
                .and_then(|any| any.to_der())
                .expect("encode certificate set"),
        );
    }
    body.extend(SignerInfos(SetOfVec::new()).to_der().expect("encode signer infos"));

    let signed_data = Any::new(Tag::Sequence, body).expect("encode signed data");
    wrap_content_info(ID_SIGNED_DATA, &signed_data)
}

/// Wrap any DER value in a `ContentInfo` with the given content type.
pub fn wrap_content_info<T>(content_type: ObjectIdentifier, content: &T) -> Vec<u8>
where
    T: Tagged + EncodeValue,
{
    ContentInfo {
        content_type,
        content: Any::encode_from(content).expect("encode content"),
    }
    .to_der()
    .expect("encode content info")
}

/// Frame a signed-data blob with the P7X magic.
pub fn build_p7x(signed_data: &[u8]) -> Vec<u8> {
    with_magic(P7X_FILE_ID, signed_data)
}

pub fn with_magic(magic: u32, body: &[u8]) -> Vec<u8> {
    let mut out = magic.to_le_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

/// An in-memory stream that counts bytes handed out by `read`.
#[derive(Debug, Default)]
pub struct CountingStream {
    inner: Cursor<Vec<u8>>,
    bytes_read: u64,
}

impl CountingStream {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(bytes),
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl Read for CountingStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl Seek for CountingStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// A stream whose reads always fail with a non-EOF error.
#[derive(Debug)]
pub struct FailingStream {
    len: u64,
    position: u64,
}

impl FailingStream {
    pub fn with_len(len: u64) -> Self {
        Self { len, position: 0 }
    }
}

impl Read for FailingStream {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "device error"))
    }
}

impl Seek for FailingStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.position = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::End(n) => (self.len as i64 + n) as u64,
            SeekFrom::Current(n) => (self.position as i64 + n) as u64,
        };
        Ok(self.position)
    }
}
