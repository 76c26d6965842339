// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certification path construction and validation for signer certificates.
//!
//! Every certificate embedded in the signature is validated on its own, not only the leaf: the
//! embedded order is not guaranteed, and an untrusted certificate anywhere in the bundle must
//! fail the whole validation.
//!
//! Path construction walks issuer links starting from the certificate under test. Candidates
//! come from the trust anchors and from the signer's own bundle (so intermediates resolve); with
//! [`VerificationFlags::trusted_first`] the anchors are searched first at every step, so a
//! same-subject untrusted certificate cannot shadow an anchor. Revocation is not checked.

use crate::cert_signature::{verify_cert_signature, CertSignatureError};
use crate::{CertificateDiagnostic, ParsedCertificate, SignatureError, TrustAnchorSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest path (in certificates, anchor included) that will be built.
const MAX_PATH_LENGTH: usize = 32;

/// Certificates embedded in the signed data, in decoded order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerCertificateChain {
    certificates: Vec<ParsedCertificate>,
}

impl SignerCertificateChain {
    pub fn new(certificates: Vec<ParsedCertificate>) -> Self {
        Self { certificates }
    }

    pub fn as_slice(&self) -> &[ParsedCertificate] {
        &self.certificates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParsedCertificate> {
        self.certificates.iter()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

impl<'a> IntoIterator for &'a SignerCertificateChain {
    type Item = &'a ParsedCertificate;
    type IntoIter = std::slice::Iter<'a, ParsedCertificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VerificationFlags {
    /// Report every issuer candidate rejected on name mismatch to the diagnostic hook.
    pub issuer_check: bool,
    /// Search trust anchors before the untrusted bundle at each path step.
    pub trusted_first: bool,
}

impl Default for VerificationFlags {
    fn default() -> Self {
        Self {
            issuer_check: true,
            trusted_first: true,
        }
    }
}

/// Path validation failures. Codes follow the numbering of the common X.509 verify error codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathValidationError {
    #[error("unable to get issuer certificate")]
    UnableToGetIssuerCert,
    #[error("unable to decode issuer public key")]
    UnableToDecodeIssuerPublicKey,
    #[error("certificate signature failure")]
    CertSignatureFailure,
    #[error("certificate is not yet valid")]
    CertNotYetValid,
    #[error("certificate has expired")]
    CertHasExpired,
    #[error("self-signed certificate")]
    DepthZeroSelfSignedCert,
    #[error("self-signed certificate in certificate chain")]
    SelfSignedCertInChain,
    #[error("unable to get local issuer certificate")]
    UnableToGetIssuerCertLocally,
    #[error("certificate chain too long")]
    CertChainTooLong,
    #[error("invalid CA certificate")]
    InvalidCa,
    #[error("path length constraint exceeded")]
    PathLengthExceeded,
    #[error("subject issuer mismatch")]
    SubjectIssuerMismatch,
    #[error("unhandled critical extension")]
    UnhandledCriticalExtension,
}

impl PathValidationError {
    pub fn code(&self) -> i32 {
        match self {
            Self::UnableToGetIssuerCert => 2,
            Self::UnableToDecodeIssuerPublicKey => 6,
            Self::CertSignatureFailure => 7,
            Self::CertNotYetValid => 9,
            Self::CertHasExpired => 10,
            Self::DepthZeroSelfSignedCert => 18,
            Self::SelfSignedCertInChain => 19,
            Self::UnableToGetIssuerCertLocally => 20,
            Self::CertChainTooLong => 22,
            Self::InvalidCa => 24,
            Self::PathLengthExceeded => 25,
            Self::SubjectIssuerMismatch => 29,
            Self::UnhandledCriticalExtension => 34,
        }
    }
}

/// A terminal path validation failure and the path depth it was detected at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PathFailure {
    pub error: PathValidationError,
    pub depth: usize,
}

/// One diagnostic reported during path construction. Diagnostics never change the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDiagnostic {
    pub depth: usize,
    pub error: PathValidationError,
    pub subject: String,
}

/// State for validating a single certificate. Created per certificate and dropped after use.
pub struct VerificationContext<'a> {
    target: &'a ParsedCertificate,
    untrusted: &'a [ParsedCertificate],
    anchors: &'a TrustAnchorSet,
    flags: VerificationFlags,
    at_unix_seconds: i64,
    diagnostics: Vec<PathDiagnostic>,
}

impl<'a> VerificationContext<'a> {
    pub fn new(
        target: &'a ParsedCertificate,
        untrusted: &'a [ParsedCertificate],
        anchors: &'a TrustAnchorSet,
        flags: VerificationFlags,
        at_unix_seconds: i64,
    ) -> Self {
        Self {
            target,
            untrusted,
            anchors,
            flags,
            at_unix_seconds,
            diagnostics: Vec::new(),
        }
    }

    /// Build a path from the target to a trust anchor and validate it.
    ///
    /// On success returns the path, target first and anchor last.
    pub fn verify(&mut self) -> Result<Vec<&'a ParsedCertificate>, PathFailure> {
        let path = self.build_path()?;
        self.check_path(&path)?;
        Ok(path)
    }

    pub fn diagnostics(&self) -> &[PathDiagnostic] {
        &self.diagnostics
    }

    fn report(&mut self, depth: usize, error: PathValidationError, cert: &ParsedCertificate) {
        if error == PathValidationError::SubjectIssuerMismatch {
            tracing::trace!(
                depth,
                code = error.code(),
                subject = cert.subject(),
                %error,
                "issuer candidate rejected"
            );
        } else {
            tracing::debug!(
                depth,
                code = error.code(),
                subject = cert.subject(),
                %error,
                "path validation error"
            );
        }
        self.diagnostics.push(PathDiagnostic {
            depth,
            error,
            subject: cert.subject().to_string(),
        });
    }

    fn fail(
        &mut self,
        depth: usize,
        error: PathValidationError,
        cert: &ParsedCertificate,
    ) -> PathFailure {
        self.report(depth, error, cert);
        PathFailure { error, depth }
    }

    fn build_path(&mut self) -> Result<Vec<&'a ParsedCertificate>, PathFailure> {
        let mut path: Vec<&'a ParsedCertificate> = vec![self.target];

        loop {
            let depth = path.len() - 1;
            let current = path[depth];

            if self.anchors.contains(current) {
                return Ok(path);
            }

            if path.len() >= MAX_PATH_LENGTH {
                return Err(self.fail(depth, PathValidationError::CertChainTooLong, current));
            }

            match self.find_issuer(current, depth, &path)? {
                Some(issuer) => path.push(issuer),
                None => {
                    let error = if current.is_self_issued() {
                        if depth == 0 {
                            PathValidationError::DepthZeroSelfSignedCert
                        } else {
                            PathValidationError::SelfSignedCertInChain
                        }
                    } else if path.len() == 1 {
                        PathValidationError::UnableToGetIssuerCertLocally
                    } else {
                        PathValidationError::UnableToGetIssuerCert
                    };
                    return Err(self.fail(depth, error, current));
                }
            }
        }
    }

    /// Find a certificate whose subject names `current`'s issuer and whose key verifies
    /// `current`'s signature. Certificates already on the path are never reused.
    fn find_issuer(
        &mut self,
        current: &'a ParsedCertificate,
        depth: usize,
        path: &[&'a ParsedCertificate],
    ) -> Result<Option<&'a ParsedCertificate>, PathFailure> {
        let trusted: &'a [ParsedCertificate] = self.anchors.ordered_chain();
        let untrusted: &'a [ParsedCertificate] = self.untrusted;
        let pools = if self.flags.trusted_first {
            [trusted, untrusted]
        } else {
            [untrusted, trusted]
        };

        let mut signature_failure = None;
        for candidate in pools.into_iter().flatten() {
            if path.iter().any(|p| p.der() == candidate.der()) {
                continue;
            }

            if candidate.subject_raw != current.issuer_raw {
                if self.flags.issuer_check {
                    self.report(depth, PathValidationError::SubjectIssuerMismatch, candidate);
                }
                continue;
            }

            match verify_cert_signature(
                &candidate.spki_der,
                &current.tbs_der,
                &current.signature_oid,
                &current.signature,
            ) {
                Ok(()) => return Ok(Some(candidate)),
                Err(CertSignatureError::IssuerKey(reason)) => {
                    tracing::debug!(issuer = candidate.subject(), %reason, "issuer key rejected");
                    let error = PathValidationError::UnableToDecodeIssuerPublicKey;
                    self.report(depth, error, current);
                    signature_failure.get_or_insert(error);
                }
                Err(CertSignatureError::Signature(reason)) => {
                    tracing::debug!(issuer = candidate.subject(), %reason, "signature rejected");
                    self.report(depth, PathValidationError::CertSignatureFailure, current);
                    signature_failure.get_or_insert(PathValidationError::CertSignatureFailure);
                }
            }
        }

        match signature_failure {
            Some(error) => Err(PathFailure { error, depth }),
            None => Ok(None),
        }
    }

    fn check_path(&mut self, path: &[&'a ParsedCertificate]) -> Result<(), PathFailure> {
        for (depth, cert) in path.iter().enumerate() {
            if let Some(oid) = &cert.unhandled_critical_extension {
                tracing::debug!(depth, subject = cert.subject(), %oid, "critical extension");
                let error = PathValidationError::UnhandledCriticalExtension;
                return Err(self.fail(depth, error, cert));
            }
            if self.at_unix_seconds < cert.not_before_unix_seconds {
                return Err(self.fail(depth, PathValidationError::CertNotYetValid, cert));
            }
            if self.at_unix_seconds > cert.not_after_unix_seconds {
                return Err(self.fail(depth, PathValidationError::CertHasExpired, cert));
            }
        }

        // Every issuer must be a CA allowed to sign certificates; path length counts
        // non-self-issued intermediates below it.
        let mut intermediates_below = 0u32;
        for (depth, cert) in path.iter().enumerate().skip(1) {
            match cert.basic_constraints {
                Some((true, Some(max_path_len))) if intermediates_below > max_path_len => {
                    return Err(self.fail(depth, PathValidationError::PathLengthExceeded, cert));
                }
                Some((true, _)) => {}
                // X.509 v1 self-signed roots predate basic constraints.
                None if cert.version == 0 && cert.is_self_issued() => {}
                _ => return Err(self.fail(depth, PathValidationError::InvalidCa, cert)),
            }
            if cert.key_cert_sign == Some(false) {
                return Err(self.fail(depth, PathValidationError::InvalidCa, cert));
            }

            if !cert.is_self_issued() {
                intermediates_below += 1;
            }
        }

        Ok(())
    }
}

/// Validates every signer certificate against a trust anchor set.
pub struct ChainVerifier<'a> {
    anchors: &'a TrustAnchorSet,
    flags: VerificationFlags,
    at_unix_seconds: Option<i64>,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(anchors: &'a TrustAnchorSet) -> Self {
        Self {
            anchors,
            flags: VerificationFlags::default(),
            at_unix_seconds: None,
        }
    }

    pub fn with_flags(mut self, flags: VerificationFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Validate validity periods at a fixed time instead of the current system time.
    pub fn at_unix_seconds(mut self, at_unix_seconds: i64) -> Self {
        self.at_unix_seconds = Some(at_unix_seconds);
        self
    }

    /// Validate each certificate independently. The first failure is fatal.
    pub fn verify_all(&self, chain: &SignerCertificateChain) -> Result<(), SignatureError> {
        if chain.is_empty() {
            return Err(SignatureError::invalid("signed data carries no signer certificates"));
        }

        let at_unix_seconds = self.at_unix_seconds.unwrap_or_else(now_unix_seconds);

        for (index, cert) in chain.iter().enumerate() {
            let mut context = VerificationContext::new(
                cert,
                chain.as_slice(),
                self.anchors,
                self.flags,
                at_unix_seconds,
            );

            match context.verify() {
                Ok(path) => {
                    tracing::debug!(
                        index,
                        subject = cert.subject(),
                        path_len = path.len(),
                        "certificate verified"
                    );
                }
                Err(failure) => {
                    tracing::warn!(
                        index,
                        subject = cert.subject(),
                        code = failure.error.code(),
                        depth = failure.depth,
                        "certificate failed path validation"
                    );
                    return Err(SignatureError::certificate(
                        "could not verify cert",
                        CertificateDiagnostic {
                            index,
                            subject: cert.subject().to_string(),
                            error: failure.error,
                            depth: failure.depth,
                        },
                    ));
                }
            }
        }

        Ok(())
    }
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
