// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Trusted root configuration and the per-validation trust anchor set.

use crate::{decode_base64_certificate, ParsedCertificate, SignatureError};
use std::collections::HashSet;

const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";

/// The PEM-encoded root certificates a validator trusts.
///
/// This is static configuration: hosts typically build it once from compiled-in PEM text and
/// hand it to [`crate::SignatureValidator::new`]. Entries are only parsed when a validation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorConfig {
    pems: Vec<String>,
}

impl TrustAnchorConfig {
    pub fn new<I, S>(pems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pems: pems.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a concatenated PEM bundle into one entry per certificate.
    ///
    /// Text after the last `END CERTIFICATE` line is ignored.
    pub fn from_pem_bundle(bundle: &str) -> Self {
        let mut pems = Vec::new();
        let mut current = String::new();
        for line in bundle.lines() {
            if current.is_empty() && line.trim().is_empty() {
                continue;
            }
            current.push_str(line);
            current.push('\n');
            if line.contains(END_CERTIFICATE) {
                pems.push(std::mem::take(&mut current));
            }
        }
        Self { pems }
    }

    pub fn push_pem(&mut self, pem: impl Into<String>) {
        self.pems.push(pem.into());
    }

    pub fn pems(&self) -> &[String] {
        &self.pems
    }

    pub fn len(&self) -> usize {
        self.pems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pems.is_empty()
    }
}

/// Trusted certificates for one validation: a lookup store plus the ordered trusted chain.
#[derive(Debug, Clone)]
pub struct TrustAnchorSet {
    store: HashSet<Vec<u8>>,
    ordered_chain: Vec<ParsedCertificate>,
}

impl TrustAnchorSet {
    /// Parse every configured root. Any malformed root aborts (fail-closed).
    pub fn build(config: &TrustAnchorConfig) -> Result<Self, SignatureError> {
        if config.is_empty() {
            return Err(SignatureError::invalid("no trusted root certificates configured"));
        }

        let mut store = HashSet::with_capacity(config.len());
        let mut ordered_chain = Vec::with_capacity(config.len());

        for (index, pem) in config.pems().iter().enumerate() {
            let cert = decode_base64_certificate(pem)
                .and_then(|der| ParsedCertificate::from_der(&der))
                .map_err(|e| {
                    tracing::error!(index, error = %e, "trusted root certificate failed to parse");
                    SignatureError::invalid(format!(
                        "could not add cert to keychain: trusted root #{index} is invalid"
                    ))
                })?;

            tracing::trace!(index, subject = cert.subject(), "added trusted root");
            if store.insert(cert.der().to_vec()) {
                ordered_chain.push(cert);
            }
        }

        Ok(Self { store, ordered_chain })
    }

    /// Exact DER match against the anchor store.
    pub fn contains(&self, cert: &ParsedCertificate) -> bool {
        self.store.contains(cert.der())
    }

    pub fn ordered_chain(&self) -> &[ParsedCertificate] {
        &self.ordered_chain
    }

    pub fn len(&self) -> usize {
        self.ordered_chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_chain.is_empty()
    }
}
