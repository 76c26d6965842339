// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Best-effort classification of which distribution channel produced a signature.
//!
//! Classification renders each certificate extension to text and looks for a recognition
//! marker, so it works the same whether the marker appears as an EKU, a policy OID, or inside
//! an extension with no structured renderer.

use crate::{ParsedCertificate, SignatureError, SignerCertificateChain};
use std::fmt;
use x509_parser::prelude::*;

/// Windows Store signing EKU.
pub const WINDOWS_STORE_OID: &str = "1.3.6.1.4.1.311.76.3.1";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SignatureOrigin {
    Store,
    Authenticode,
    #[default]
    Unknown,
}

impl fmt::Display for SignatureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Store => "Store",
            Self::Authenticode => "Authenticode",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A rendered certificate extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescription {
    /// Extension name when known, otherwise the dotted OID.
    pub name: String,
    pub oid: String,
    pub critical: bool,
    pub value: String,
}

/// Classify the origin of a signer chain: store, then authenticode, then unknown.
pub fn classify(chain: &SignerCertificateChain) -> Result<SignatureOrigin, SignatureError> {
    if is_store_origin(chain)? {
        return Ok(SignatureOrigin::Store);
    }
    if is_authenticode_origin(chain) {
        return Ok(SignatureOrigin::Authenticode);
    }
    Ok(SignatureOrigin::Unknown)
}

/// True when any extension of any certificate renders text containing [`WINDOWS_STORE_OID`].
pub fn is_store_origin(chain: &SignerCertificateChain) -> Result<bool, SignatureError> {
    for cert in chain {
        let x509 = cert.x509()?;
        for ext in x509.extensions() {
            if render_extension(ext).contains(WINDOWS_STORE_OID) {
                tracing::debug!(
                    subject = cert.subject(),
                    oid = %ext.oid.to_id_string(),
                    "store origin marker found"
                );
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Authenticode origin detection is not implemented; always false.
pub fn is_authenticode_origin(_chain: &SignerCertificateChain) -> bool {
    false
}

/// Render every extension of a certificate, in certificate order.
pub fn describe_extensions(
    cert: &ParsedCertificate,
) -> Result<Vec<ExtensionDescription>, SignatureError> {
    let x509 = cert.x509()?;
    Ok(x509
        .extensions()
        .iter()
        .map(|ext| {
            let oid = ext.oid.to_id_string();
            ExtensionDescription {
                name: extension_name(&oid).map(str::to_string).unwrap_or_else(|| oid.clone()),
                oid,
                critical: ext.critical,
                value: render_extension(ext),
            }
        })
        .collect())
}

fn extension_name(oid: &str) -> Option<&'static str> {
    Some(match oid {
        "2.5.29.14" => "X509v3 Subject Key Identifier",
        "2.5.29.15" => "X509v3 Key Usage",
        "2.5.29.17" => "X509v3 Subject Alternative Name",
        "2.5.29.19" => "X509v3 Basic Constraints",
        "2.5.29.31" => "X509v3 CRL Distribution Points",
        "2.5.29.32" => "X509v3 Certificate Policies",
        "2.5.29.35" => "X509v3 Authority Key Identifier",
        "2.5.29.37" => "X509v3 Extended Key Usage",
        "1.3.6.1.5.5.7.1.1" => "Authority Information Access",
        _ => return None,
    })
}

/// Structured rendering where one exists, otherwise the raw value with non-printables as `.`.
fn render_extension(ext: &X509Extension<'_>) -> String {
    match ext.parsed_extension() {
        ParsedExtension::ExtendedKeyUsage(eku) => {
            let mut parts: Vec<String> = Vec::new();
            let known = [
                (eku.any, "Any Extended Key Usage"),
                (eku.server_auth, "TLS Web Server Authentication"),
                (eku.client_auth, "TLS Web Client Authentication"),
                (eku.code_signing, "Code Signing"),
                (eku.email_protection, "E-mail Protection"),
                (eku.time_stamping, "Time Stamping"),
                (eku.ocsp_signing, "OCSP Signing"),
            ];
            parts.extend(known.iter().filter(|(set, _)| *set).map(|(_, name)| name.to_string()));
            parts.extend(eku.other.iter().map(|oid| oid.to_id_string()));
            parts.join(", ")
        }
        ParsedExtension::KeyUsage(ku) => {
            let flags = [
                (ku.digital_signature(), "Digital Signature"),
                (ku.non_repudiation(), "Non Repudiation"),
                (ku.key_encipherment(), "Key Encipherment"),
                (ku.data_encipherment(), "Data Encipherment"),
                (ku.key_agreement(), "Key Agreement"),
                (ku.key_cert_sign(), "Certificate Sign"),
                (ku.crl_sign(), "CRL Sign"),
                (ku.encipher_only(), "Encipher Only"),
                (ku.decipher_only(), "Decipher Only"),
            ];
            flags
                .iter()
                .filter(|(set, _)| *set)
                .map(|(_, name)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        }
        ParsedExtension::BasicConstraints(bc) => match bc.path_len_constraint {
            Some(len) => format!("CA:{}, pathlen:{len}", upper_bool(bc.ca)),
            None => format!("CA:{}", upper_bool(bc.ca)),
        },
        ParsedExtension::SubjectKeyIdentifier(kid) => hex_colon(kid.0),
        ParsedExtension::AuthorityKeyIdentifier(aki) => match &aki.key_identifier {
            Some(kid) => format!("keyid:{}", hex_colon(kid.0)),
            None => raw_printable(ext.value),
        },
        ParsedExtension::CertificatePolicies(policies) => policies
            .iter()
            .map(|p| format!("Policy: {}", p.policy_id.to_id_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        ParsedExtension::SubjectAlternativeName(san) => san
            .general_names
            .iter()
            .map(|name| match name {
                GeneralName::DNSName(dns) => format!("DNS:{dns}"),
                GeneralName::RFC822Name(email) => format!("email:{email}"),
                GeneralName::URI(uri) => format!("URI:{uri}"),
                other => format!("{other:?}"),
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => raw_printable(ext.value),
    }
}

fn upper_bool(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn hex_colon(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":")
}

/// Printable ASCII (plus CR/LF) is kept; everything else becomes `.`.
fn raw_printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            b'\n' | b'\r' | b' '..=b'~' => b as char,
            _ => '.',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_printable_masks_control_and_high_bytes() {
        assert_eq!(raw_printable(b"\x0c\x171.3.6\xff"), "..1.3.6.");
    }

    #[test]
    fn hex_colon_is_upper_case() {
        assert_eq!(hex_colon(&[0x0a, 0xbc]), "0A:BC");
    }

    #[test]
    fn authenticode_stub_is_false() {
        assert!(!is_authenticode_origin(&SignerCertificateChain::default()));
    }

    #[test]
    fn empty_chain_is_unknown_origin() {
        assert_eq!(classify(&SignerCertificateChain::default()).unwrap(), SignatureOrigin::Unknown);
    }

    #[test]
    fn origin_display_names() {
        assert_eq!(SignatureOrigin::Store.to_string(), "Store");
        assert_eq!(SignatureOrigin::default().to_string(), "Unknown");
    }
}
