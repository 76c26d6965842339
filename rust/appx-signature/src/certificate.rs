// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::SignatureError;
use x509_parser::prelude::*;

/// Owned view of the certificate fields used for path construction.
///
/// `x509-parser` certificates borrow from their DER input; this type keeps the DER alongside
/// the extracted fields so certificates can be stored and passed around without lifetimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    der: Vec<u8>,
    pub(crate) subject: String,
    pub(crate) subject_raw: Vec<u8>,
    pub(crate) issuer_raw: Vec<u8>,
    pub(crate) version: u32,
    pub(crate) spki_der: Vec<u8>,
    pub(crate) tbs_der: Vec<u8>,
    pub(crate) signature_oid: String,
    pub(crate) signature: Vec<u8>,
    pub(crate) not_before_unix_seconds: i64,
    pub(crate) not_after_unix_seconds: i64,
    pub(crate) basic_constraints: Option<(bool, Option<u32>)>,
    /// keyCertSign bit of the Key Usage extension; `None` when the extension is absent.
    pub(crate) key_cert_sign: Option<bool>,
    /// Dotted OID of the first critical extension `x509-parser` does not understand.
    pub(crate) unhandled_critical_extension: Option<String>,
}

impl ParsedCertificate {
    /// Parse a DER certificate. Trailing bytes after the certificate are rejected.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        let (rest, cert) = X509Certificate::from_der(der)
            .map_err(|e| SignatureError::invalid_with("invalid certificate DER", e))?;
        if !rest.is_empty() {
            return Err(SignatureError::invalid("invalid certificate DER: trailing data"));
        }

        let mut basic_constraints = None;
        let mut key_cert_sign = None;
        let mut unhandled_critical_extension = None;
        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::BasicConstraints(bc) => {
                    basic_constraints = Some((bc.ca, bc.path_len_constraint));
                }
                ParsedExtension::KeyUsage(ku) => key_cert_sign = Some(ku.key_cert_sign()),
                ParsedExtension::UnsupportedExtension { .. } | ParsedExtension::ParseError { .. }
                    if ext.critical =>
                {
                    unhandled_critical_extension.get_or_insert_with(|| ext.oid.to_id_string());
                }
                _ => {}
            }
        }

        Ok(Self {
            der: der.to_vec(),
            subject: cert.subject().to_string(),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            version: cert.version().0,
            spki_der: cert.tbs_certificate.subject_pki.raw.to_vec(),
            // `x509-parser` keeps the raw DER for TBSCertificate; expose it via `AsRef`.
            tbs_der: cert.tbs_certificate.as_ref().to_vec(),
            signature_oid: cert.signature_algorithm.algorithm.to_id_string(),
            signature: cert.signature_value.data.to_vec(),
            not_before_unix_seconds: cert.validity().not_before.timestamp(),
            not_after_unix_seconds: cert.validity().not_after.timestamp(),
            basic_constraints,
            key_cert_sign,
            unhandled_critical_extension,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name in RFC 4514-like text form.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Subject and issuer names are byte-identical.
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    /// Re-borrow the certificate as an `x509-parser` structure, for extension inspection.
    pub(crate) fn x509(&self) -> Result<X509Certificate<'_>, SignatureError> {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| SignatureError::invalid_with("invalid certificate DER", e))
    }
}
