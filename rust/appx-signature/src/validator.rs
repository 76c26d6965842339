// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::origin::{classify, describe_extensions};
use crate::{
    ChainVerifier, DigestMap, ReadSeek, SignatureError, SignatureOrigin, SignedContainer,
    SignerCertificateChain, TrustAnchorConfig, TrustAnchorSet, ValidationOptions,
    VerificationFlags,
};

/// Result of a validation that did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// False only when validation was skipped by the caller.
    pub validated: bool,
    pub origin: SignatureOrigin,
}

/// Validates `AppxSignature.p7x` containers against a fixed set of trusted roots.
///
/// The validator holds only immutable configuration. Trust anchors are parsed on every call,
/// so concurrent validations share nothing mutable.
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    trusted_roots: TrustAnchorConfig,
    flags: VerificationFlags,
    at_unix_seconds: Option<i64>,
}

impl SignatureValidator {
    pub fn new(trusted_roots: TrustAnchorConfig) -> Self {
        Self {
            trusted_roots,
            flags: VerificationFlags::default(),
            at_unix_seconds: None,
        }
    }

    pub fn with_flags(mut self, flags: VerificationFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Check certificate validity periods at a fixed time.
    pub fn at_unix_seconds(mut self, at_unix_seconds: i64) -> Self {
        self.at_unix_seconds = Some(at_unix_seconds);
        self
    }

    pub fn trusted_roots(&self) -> &TrustAnchorConfig {
        &self.trusted_roots
    }

    /// Validate the signature container read from `stream`.
    ///
    /// `digests` is accepted for callers that thread expected package digests through; it is
    /// not written.
    pub fn validate(
        &self,
        options: &ValidationOptions,
        stream: &mut dyn ReadSeek,
        digests: &mut DigestMap,
    ) -> Result<ValidationOutcome, SignatureError> {
        if options.skip_signature {
            tracing::debug!("signature validation skipped by caller");
            return Ok(ValidationOutcome {
                validated: false,
                origin: SignatureOrigin::Unknown,
            });
        }

        tracing::trace!(
            options = options.bits(),
            digests = digests.len(),
            "validating package signature"
        );

        let container = SignedContainer::read_from(stream)?;
        let chain = container.signer_certificates()?;
        dump_extensions(&chain);

        let anchors = TrustAnchorSet::build(&self.trusted_roots)?;

        let mut verifier = ChainVerifier::new(&anchors).with_flags(self.flags);
        if let Some(at) = self.at_unix_seconds {
            verifier = verifier.at_unix_seconds(at);
        }
        verifier.verify_all(&chain)?;

        let origin = classify(&chain)?;
        if origin == SignatureOrigin::Unknown && !options.allow_unknown_origin {
            tracing::warn!("signature origin could not be classified");
            return Err(SignatureError::invalid("signature origin check failed"));
        }

        tracing::debug!(%origin, certificates = chain.len(), "package signature validated");
        Ok(ValidationOutcome { validated: true, origin })
    }
}

fn dump_extensions(chain: &SignerCertificateChain) {
    if !tracing::enabled!(tracing::Level::TRACE) {
        return;
    }
    for (index, cert) in chain.iter().enumerate() {
        match describe_extensions(cert) {
            Ok(extensions) => {
                for ext in extensions {
                    tracing::trace!(
                        index,
                        subject = cert.subject(),
                        name = %ext.name,
                        critical = ext.critical,
                        value = %ext.value,
                        "certificate extension"
                    );
                }
            }
            Err(e) => tracing::trace!(index, error = %e, "could not render certificate extensions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn skip_does_not_touch_stream_or_digests() {
        let validator = SignatureValidator::new(TrustAnchorConfig::default());
        let mut stream = Cursor::new(b"not a container".to_vec());
        let mut digests = DigestMap::new();
        digests.insert(crate::DigestName::Axpc, vec![1, 2, 3]);

        let options = ValidationOptions::from_bits(ValidationOptions::SKIP_SIGNATURE);
        let outcome = validator.validate(&options, &mut stream, &mut digests).unwrap();

        assert!(!outcome.validated);
        assert_eq!(stream.position(), 0);
        assert_eq!(digests.len(), 1);
    }

    #[test]
    fn validator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SignatureValidator>();
    }
}
